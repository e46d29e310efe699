//! Hardware ends of the `bridge` seams.

use core::ptr;

use bridge::config::CPU_HZ;
use bridge::regs::{Reg, RegisterBus, Width};
use bridge::usb::InterruptLine;
use embedded_hal::blocking::delay::DelayMs;
use hal::pac::{interrupt, NVIC};

/// Volatile access to the real registers.
///
/// Only bring-up, the foreground loop and the fault path hold one, and they
/// never run at the same time as each other.
#[derive(Clone, Copy)]
pub struct Mmio;

impl RegisterBus for Mmio {
    fn read(&mut self, reg: Reg) -> u32 {
        let addr = reg.address();
        // SAFETY: every `Reg` maps to a readable register of its own width.
        unsafe {
            match reg.width() {
                Width::Byte => u32::from(ptr::read_volatile(addr as *const u8)),
                Width::Half => u32::from(ptr::read_volatile(addr as *const u16)),
                Width::Word => ptr::read_volatile(addr as *const u32),
            }
        }
    }

    fn write(&mut self, reg: Reg, value: u32) {
        let addr = reg.address();
        // SAFETY: as above, and no `Reg` aliases memory Rust owns.
        unsafe {
            match reg.width() {
                Width::Byte => ptr::write_volatile(addr as *mut u8, value as u8),
                Width::Half => ptr::write_volatile(addr as *mut u16, value as u16),
                Width::Word => ptr::write_volatile(addr as *mut u32, value),
            }
        }
    }
}

pub struct UsbLine;

impl InterruptLine for UsbLine {
    fn mask(&self) {
        NVIC::mask(interrupt::USB);
    }

    fn unmask(&self) {
        // SAFETY: the USB handler only touches the latch and this mask bit.
        unsafe { NVIC::unmask(interrupt::USB) }
    }
}

/// Busy-wait delay for places that cannot own SysTick, like the fault path.
pub struct CycleDelay;

impl DelayMs<u16> for CycleDelay {
    fn delay_ms(&mut self, ms: u16) {
        cortex_m::asm::delay(CPU_HZ / 1000 * u32::from(ms));
    }
}
