#![cfg_attr(not(feature = "std"), no_std)]

//! Hardware-independent core of the USB mass storage / SPI subordinate
//! bridge: register-level bring-up, the SPI preload path, the USB interrupt
//! latch, the cooperative foreground loop and the storage backend.
//!
//! Nothing in here touches memory-mapped registers directly. The firmware
//! hands in a [`regs::RegisterBus`] that does; the tests hand in a model.

pub mod boot;
pub mod clock;
pub mod config;
pub mod disk;
pub mod fault;
pub mod foreground;
pub mod port;
pub mod regs;
pub mod scsi;
pub mod spi;
pub mod usb;

#[cfg(test)]
mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The generator feeding USB is not within 48 MHz ± 0.25 %.
    UsbClockOutOfTolerance(u32),
    /// DIPO and DOPO put two signals on the same pad.
    PadConflict,
    /// A pad or field value outside what the hardware encodes.
    InvalidPad,
    /// The USB stack refused its configuration.
    StackInit,
    BlockOutOfRange(u32),
}
