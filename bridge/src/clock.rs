//! Flash wait states, bus clock gating and generic clock routing.

use crate::regs::{
    AhbMask, ApbbMask, ApbcMask, Reg, RegisterBus, CLKCTRL_CLKEN, CLKCTRL_GEN, CLKCTRL_ID,
    GCLK_STATUS_SYNCBUSY, NVMCTRL_RWS,
};
use crate::Error;

pub const USB_HZ: u32 = 48_000_000;

/// 0.25 % of 48 MHz.
const USB_TOLERANCE_HZ: u32 = USB_HZ / 400;

/// A GCLK generator index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generator(pub u8);

/// Peripheral clock channels, numbered as in GCLK.CLKCTRL.ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Usb = 0x06,
    Sercom0Core = 0x14,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BusClock {
    Ahb(AhbMask),
    Apbb(ApbbMask),
    Apbc(ApbcMask),
}

impl BusClock {
    fn reg_and_mask(self) -> (Reg, u32) {
        match self {
            BusClock::Ahb(mask) => (Reg::PmAhbMask, mask.bits()),
            BusClock::Apbb(mask) => (Reg::PmApbbMask, mask.bits()),
            BusClock::Apbc(mask) => (Reg::PmApbcMask, mask.bits()),
        }
    }
}

/// Sets NVMCTRL.CTRLB.RWS, keeping the rest of CTRLB as it is.
pub fn set_flash_wait_states<B: RegisterBus>(bus: &mut B, wait_states: u8) {
    bus.modify(Reg::NvmCtrlB, |v| NVMCTRL_RWS.insert(v, u32::from(wait_states)));
}

pub fn flash_wait_states<B: RegisterBus>(bus: &mut B) -> u8 {
    NVMCTRL_RWS.extract(bus.read(Reg::NvmCtrlB)) as u8
}

pub fn enable_bus_clock<B: RegisterBus>(bus: &mut B, clock: BusClock) {
    let (reg, mask) = clock.reg_and_mask();
    bus.modify(reg, |v| v | mask);
}

/// Feeds `channel` from `generator` and enables it.
pub fn route_generator<B: RegisterBus>(bus: &mut B, generator: Generator, channel: Channel) {
    let value = CLKCTRL_ID.insert(0, channel as u32)
        | CLKCTRL_GEN.insert(0, u32::from(generator.0))
        | CLKCTRL_CLKEN;
    bus.write(Reg::GclkClkCtrl, value);
    bus.wait_clear(Reg::GclkStatus, GCLK_STATUS_SYNCBUSY);
}

/// USB full speed needs its clock within 48 MHz ± 0.25 %.
pub fn check_usb_clock(hz: u32) -> Result<(), Error> {
    let deviation = if hz > USB_HZ { hz - USB_HZ } else { USB_HZ - hz };
    if deviation > USB_TOLERANCE_HZ {
        return Err(Error::UsbClockOutOfTolerance(hz));
    }
    Ok(())
}
