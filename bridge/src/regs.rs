//! SAMD21 registers touched by bring-up and the foreground loop.
//!
//! Everything else on the chip is left to the HAL and the USB stack: one
//! variant per register read or written here, plus the bit layouts inside
//! them.

use bitflags::bitflags;

const PM: usize = 0x4000_0400;
const GCLK: usize = 0x4000_0C00;
const NVMCTRL: usize = 0x4100_4000;
const PORT: usize = 0x4100_4400;
const SERCOM0: usize = 0x4200_0800;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reg {
    NvmCtrlB,
    PmAhbMask,
    PmApbbMask,
    PmApbcMask,
    GclkStatus,
    GclkClkCtrl,
    PortDir,
    PortDirClr,
    PortDirSet,
    PortOut,
    PortOutClr,
    PortOutSet,
    /// PMUXn, one register per pair of pins.
    PortPmux(u8),
    /// PINCFGn, one register per pin.
    PortPinCfg(u8),
    SpiCtrlA,
    SpiCtrlB,
    SpiIntFlag,
    SpiStatus,
    SpiSyncBusy,
    SpiData,
}

impl Reg {
    pub const fn address(self) -> usize {
        match self {
            Reg::NvmCtrlB => NVMCTRL + 0x04,
            Reg::PmAhbMask => PM + 0x14,
            Reg::PmApbbMask => PM + 0x1C,
            Reg::PmApbcMask => PM + 0x20,
            Reg::GclkStatus => GCLK + 0x01,
            Reg::GclkClkCtrl => GCLK + 0x02,
            Reg::PortDir => PORT,
            Reg::PortDirClr => PORT + 0x04,
            Reg::PortDirSet => PORT + 0x08,
            Reg::PortOut => PORT + 0x10,
            Reg::PortOutClr => PORT + 0x14,
            Reg::PortOutSet => PORT + 0x18,
            Reg::PortPmux(n) => PORT + 0x30 + n as usize,
            Reg::PortPinCfg(n) => PORT + 0x40 + n as usize,
            Reg::SpiCtrlA => SERCOM0,
            Reg::SpiCtrlB => SERCOM0 + 0x04,
            Reg::SpiIntFlag => SERCOM0 + 0x18,
            Reg::SpiStatus => SERCOM0 + 0x1A,
            Reg::SpiSyncBusy => SERCOM0 + 0x1C,
            Reg::SpiData => SERCOM0 + 0x28,
        }
    }

    pub const fn width(self) -> Width {
        match self {
            Reg::GclkStatus | Reg::PortPmux(_) | Reg::PortPinCfg(_) | Reg::SpiIntFlag => {
                Width::Byte
            }
            Reg::GclkClkCtrl | Reg::SpiStatus => Width::Half,
            _ => Width::Word,
        }
    }
}

/// Access to the register file. The firmware implements this with volatile
/// MMIO, tests with a recording model.
pub trait RegisterBus {
    fn read(&mut self, reg: Reg) -> u32;
    fn write(&mut self, reg: Reg, value: u32);

    fn modify<F>(&mut self, reg: Reg, f: F)
    where
        F: FnOnce(u32) -> u32,
    {
        let value = self.read(reg);
        self.write(reg, f(value));
    }

    /// Spins until every bit of `mask` reads back as zero.
    fn wait_clear(&mut self, reg: Reg, mask: u32) {
        while self.read(reg) & mask != 0 {}
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read(&mut self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    fn write(&mut self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }
}

/// A multi-bit field inside a register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    shift: u8,
    width: u8,
}

impl Field {
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    pub const fn mask(self) -> u32 {
        ((1u32 << self.width) - 1) << self.shift
    }

    pub const fn insert(self, reg: u32, value: u32) -> u32 {
        (reg & !self.mask()) | ((value << self.shift) & self.mask())
    }

    pub const fn extract(self, reg: u32) -> u32 {
        (reg & self.mask()) >> self.shift
    }
}

pub const NVMCTRL_RWS: Field = Field::new(1, 4);

pub const CLKCTRL_ID: Field = Field::new(0, 6);
pub const CLKCTRL_GEN: Field = Field::new(8, 4);
pub const CLKCTRL_CLKEN: u32 = 1 << 14;
pub const GCLK_STATUS_SYNCBUSY: u32 = 1 << 7;

pub const PMUX_EVEN: Field = Field::new(0, 4);
pub const PMUX_ODD: Field = Field::new(4, 4);

pub const CTRLA_MODE: Field = Field::new(2, 3);
pub const CTRLA_DOPO: Field = Field::new(16, 2);
pub const CTRLA_DIPO: Field = Field::new(20, 2);

bitflags! {
    pub struct AhbMask: u32 {
        const USB = 1 << 6;
    }
}

bitflags! {
    pub struct ApbbMask: u32 {
        const USB = 1 << 5;
    }
}

bitflags! {
    pub struct ApbcMask: u32 {
        const SERCOM0 = 1 << 2;
    }
}

bitflags! {
    pub struct PinCfg: u8 {
        const PMUXEN = 1 << 0;
        const INEN = 1 << 1;
        const PULLEN = 1 << 2;
        const DRVSTR = 1 << 6;
    }
}

bitflags! {
    pub struct CtrlA: u32 {
        const SWRST = 1 << 0;
        const ENABLE = 1 << 1;
    }
}

bitflags! {
    pub struct CtrlB: u32 {
        const PLOADEN = 1 << 6;
        const RXEN = 1 << 17;
    }
}

bitflags! {
    pub struct IntFlag: u8 {
        const DRE = 1 << 0;
        const TXC = 1 << 1;
        const RXC = 1 << 2;
        const SSL = 1 << 3;
        const ERROR = 1 << 7;
    }
}

bitflags! {
    pub struct Status: u16 {
        const BUFOVF = 1 << 2;
    }
}

bitflags! {
    pub struct SyncBusy: u32 {
        const SWRST = 1 << 0;
        const ENABLE = 1 << 1;
        const CTRLB = 1 << 2;
    }
}
