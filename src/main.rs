#![no_std]
#![no_main]

extern crate feather_m0 as hal;
extern crate panic_halt;

#[macro_use]
mod log;
mod board;
mod storage;

use bridge::boot::BringUp;
use bridge::config::{
    DEBUG, FLASH_WAIT_STATES, LED_PIN, MAX_SPEED, MCU, MSC_EP_BUFSIZE, OS, OUTBOUND,
    RAM_DISK_BLOCKS, ROOT_HUB_PORT, SPI, SPI_GENERATOR, SPI_PADS, USB_GENERATOR, USB_PINS,
};
use bridge::disk::RamDisk;
use bridge::fault::{Beacon, Fault, TraceWord};
use bridge::port::Output;
use bridge::usb::{DmaBuffer, IrqLatch};
use cortex_m_rt::{exception, ExceptionFrame};
use hal::hal::clock::GenericClockController;
use hal::entry;
use hal::pac::{interrupt, Peripherals};
use hal::hal::usb::UsbBus;
use static_cell::{ConstStaticCell, StaticCell};
use usb_device::bus::UsbBusAllocator;

use board::{CycleDelay, Mmio, UsbLine};
use storage::MassStorage;

#[cfg(all(feature = "wfi", feature = "gate-preload"))]
compile_error!("`wfi` sleeps until the next interrupt, and an empty DATA register raises none");

static USB_IRQ: IrqLatch<UsbLine> = IrqLatch::new(ROOT_HUB_PORT, UsbLine);
static USB_ALLOCATOR: StaticCell<UsbBusAllocator<UsbBus>> = StaticCell::new();
static MSC_BUFFER: ConstStaticCell<DmaBuffer<MSC_EP_BUFSIZE>> =
    ConstStaticCell::new(DmaBuffer::new());
static DISK: ConstStaticCell<RamDisk<RAM_DISK_BLOCKS>> = ConstStaticCell::new(RamDisk::new());
static FAULT_TRACE: TraceWord = TraceWord::new();

#[entry]
fn main() -> ! {
    // stays off until the stack is up and the USB line is open
    cortex_m::interrupt::disable();

    let mut peripherals = Peripherals::take().unwrap();
    log!("{}: {:?} speed, os {:?}, stack debug {}", MCU, MAX_SPEED, OS, DEBUG);

    let boot = BringUp::new(Mmio).flash(FLASH_WAIT_STATES);
    let (boot, mut clocks) = boot.board_init(|| {
        GenericClockController::with_external_32kosc(
            peripherals.gclk,
            &mut peripherals.pm,
            &mut peripherals.sysctrl,
            &mut peripherals.nvmctrl,
        )
    });
    let usb_hz = Into::<hal::hal::time::Hertz>::into(clocks.gclk0()).to_Hz();
    log!("board up, gclk0 at {} Hz", usb_hz);

    let pins = hal::Pins::new(peripherals.port);

    let boot = boot
        .spi(&SPI, &SPI_PADS, SPI_GENERATOR, OUTBOUND)
        .unwrap_or_else(|e| halt(Fault::BringUp(e)));
    log!("spi subordinate enabled, preload {:?}", OUTBOUND);

    let boot = boot
        .usb(usb_hz, USB_GENERATOR, &USB_PINS, || {
            let alloc = USB_ALLOCATOR.init(hal::usb_allocator(
                peripherals.usb,
                &mut clocks,
                &mut peripherals.pm,
                pins.usb_dm,
                pins.usb_dp,
            ));
            MassStorage::new(
                alloc,
                MSC_BUFFER.take().as_mut_slice(),
                DISK.take(),
                &USB_IRQ,
            )
        })
        .unwrap_or_else(|e| halt(Fault::BringUp(e)));
    log!("usb stack up");

    let foreground = boot.finish(&USB_IRQ, || unsafe { cortex_m::interrupt::enable() });
    foreground.run(idle)
}

/// A pending event still wakes WFI with PRIMASK set; the handler runs once
/// the critical section ends.
#[cfg(feature = "wfi")]
fn idle() {
    cortex_m::interrupt::free(|_| USB_IRQ.idle(cortex_m::asm::wfi));
}

#[cfg(not(feature = "wfi"))]
fn idle() {}

#[interrupt]
fn USB() {
    USB_IRQ.irq(ROOT_HUB_PORT);
}

#[exception]
unsafe fn HardFault(frame: &ExceptionFrame) -> ! {
    halt(Fault::HardFault { pc: frame.pc() })
}

#[exception]
unsafe fn DefaultHandler(irqn: i16) -> ! {
    halt(Fault::UnexpectedInterrupt(irqn))
}

fn halt(fault: Fault) -> ! {
    cortex_m::interrupt::disable();
    log!("fault: {:?}", fault);

    if cfg!(debug_assertions) {
        FAULT_TRACE.record(&fault);
        Beacon::new(Output::new(Mmio, LED_PIN), CycleDelay).run(fault.code())
    }

    loop {
        cortex_m::asm::nop();
    }
}
