//! Reset-to-running bring-up as a typestate chain.
//!
//! ```text
//! BringUp::new(bus)
//!     .flash(ws)          Reset       -> FlashReady
//!     .board_init(..)     FlashReady  -> BoardReady
//!     .spi(..)?           BoardReady  -> SpiReady
//!     .usb(..)?           SpiReady    -> UsbReady
//!     .finish(..)         UsbReady    -> Foreground
//! ```
//!
//! Each step only exists on the state the previous step returns, so a
//! sequence that skips or reorders steps does not compile.

use crate::clock::{self, Generator};
use crate::foreground::{Foreground, Preload};
use crate::regs::RegisterBus;
use crate::spi::{Outbound, SpiConfig, SpiPads, SpiSubordinate};
use crate::usb::{self, InterruptLine, IrqLatch, UsbPins, UsbStack};
use crate::Error;

pub struct Reset;
pub struct FlashReady;
pub struct BoardReady;

pub struct SpiReady<P> {
    spi: P,
}

pub struct UsbReady<P, S> {
    spi: P,
    stack: S,
}

pub struct BringUp<B, State> {
    bus: B,
    state: State,
}

impl<B: RegisterBus> BringUp<B, Reset> {
    pub fn new(bus: B) -> Self {
        Self { bus, state: Reset }
    }

    /// Flash needs at least one wait state at 48 MHz, so zero is raised to
    /// one.
    pub fn flash(mut self, wait_states: u8) -> BringUp<B, FlashReady> {
        clock::set_flash_wait_states(&mut self.bus, wait_states.max(1));
        BringUp {
            bus: self.bus,
            state: FlashReady,
        }
    }
}

impl<B> BringUp<B, FlashReady> {
    /// Runs the board's clock and power setup exactly once and hands back
    /// whatever it produced.
    pub fn board_init<R, F>(self, init: F) -> (BringUp<B, BoardReady>, R)
    where
        F: FnOnce() -> R,
    {
        let out = init();
        (
            BringUp {
                bus: self.bus,
                state: BoardReady,
            },
            out,
        )
    }
}

impl<B: RegisterBus + Clone> BringUp<B, BoardReady> {
    pub fn spi(
        self,
        config: &SpiConfig,
        pads: &SpiPads,
        generator: Generator,
        outbound: Outbound,
    ) -> Result<BringUp<B, SpiReady<SpiSubordinate<B>>>, Error> {
        let spi = SpiSubordinate::init(self.bus.clone(), config, pads, generator, outbound)?;
        Ok(BringUp {
            bus: self.bus,
            state: SpiReady { spi },
        })
    }
}

impl<B: RegisterBus, P> BringUp<B, SpiReady<P>> {
    /// Refuses to touch the controller unless `generator_hz` is a usable USB
    /// clock. `stack_init` runs after the pins are on the USB function.
    pub fn usb<S, F>(
        mut self,
        generator_hz: u32,
        generator: Generator,
        pins: &UsbPins,
        stack_init: F,
    ) -> Result<BringUp<B, UsbReady<P, S>>, Error>
    where
        F: FnOnce() -> Result<S, Error>,
    {
        clock::check_usb_clock(generator_hz)?;
        usb::bring_up(&mut self.bus, generator, pins);
        let stack = stack_init()?;
        Ok(BringUp {
            bus: self.bus,
            state: UsbReady {
                spi: self.state.spi,
                stack,
            },
        })
    }
}

impl<B, P: Preload, S: UsbStack> BringUp<B, UsbReady<P, S>> {
    /// Unmasks the USB line, then enables interrupts globally.
    pub fn finish<L, G>(self, latch: &IrqLatch<L>, enable_global: G) -> Foreground<S, P>
    where
        L: InterruptLine,
        G: FnOnce(),
    {
        latch.rearm();
        enable_global();
        Foreground::new(self.state.stack, self.state.spi)
    }
}
