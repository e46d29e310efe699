//! What is left to do once something has gone wrong for good.

use core::sync::atomic::{AtomicU32, Ordering};

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;

use crate::Error;

const BLINK_MS: u16 = 150;
const PAUSE_MS: u16 = 600;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    HardFault { pc: u32 },
    /// An interrupt fired that has no handler; carries the IRQ number.
    UnexpectedInterrupt(i16),
    BringUp(Error),
}

impl Fault {
    /// Number of LED blinks per round.
    pub fn code(&self) -> u8 {
        match self {
            Fault::HardFault { .. } => 2,
            Fault::UnexpectedInterrupt(_) => 3,
            Fault::BringUp(_) => 4,
        }
    }

    /// Single word a debugger can read back: the faulting PC, or a tag in the
    /// top byte with the detail below it.
    pub fn trace_word(&self) -> u32 {
        match *self {
            Fault::HardFault { pc } => pc,
            Fault::UnexpectedInterrupt(irq) => 0xE100_0000 | u32::from(irq as u16),
            Fault::BringUp(e) => {
                let detail = match e {
                    Error::UsbClockOutOfTolerance(hz) => 0x10_0000 | ((hz / 1000) & 0xF_FFFF),
                    Error::PadConflict => 0x20_0000,
                    Error::InvalidPad => 0x30_0000,
                    Error::StackInit => 0x40_0000,
                    Error::BlockOutOfRange(lba) => 0x50_0000 | (lba & 0xF_FFFF),
                };
                0xEB00_0000 | (detail & 0x00FF_FFFF)
            }
        }
    }
}

/// Last fault, kept where a debugger can find it.
pub struct TraceWord(AtomicU32);

impl TraceWord {
    pub const fn new() -> Self {
        TraceWord(AtomicU32::new(0))
    }

    pub fn record(&self, fault: &Fault) {
        self.0.store(fault.trace_word(), Ordering::SeqCst);
    }

    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Blinks a fault code on an LED.
pub struct Beacon<P, D> {
    led: P,
    delay: D,
}

impl<P: OutputPin, D: DelayMs<u16>> Beacon<P, D> {
    pub fn new(led: P, delay: D) -> Self {
        Self { led, delay }
    }

    /// One round: `code` blinks, then a pause.
    pub fn flash(&mut self, code: u8) {
        for _ in 0..code {
            // nothing useful to do if the LED itself fails
            let _ = self.led.set_high();
            self.delay.delay_ms(BLINK_MS);
            let _ = self.led.set_low();
            self.delay.delay_ms(BLINK_MS);
        }
        self.delay.delay_ms(PAUSE_MS);
    }

    pub fn run(mut self, code: u8) -> ! {
        loop {
            self.flash(code);
        }
    }

    pub fn release(self) -> (P, D) {
        (self.led, self.delay)
    }
}
