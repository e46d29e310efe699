//! PORT group A pin configuration.

use core::convert::Infallible;

use embedded_hal::digital::v2::OutputPin;

use crate::regs::{PinCfg, Reg, RegisterBus, PMUX_EVEN, PMUX_ODD};

/// A pin in port group A.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pin(u8);

impl Pin {
    pub const fn pa(n: u8) -> Self {
        assert!(n < 32);
        Pin(n)
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    const fn bit(self) -> u32 {
        1 << self.0
    }
}

pub const PA04: Pin = Pin::pa(4);
pub const PA05: Pin = Pin::pa(5);
pub const PA06: Pin = Pin::pa(6);
pub const PA07: Pin = Pin::pa(7);
pub const PA17: Pin = Pin::pa(17);
pub const PA24: Pin = Pin::pa(24);
pub const PA25: Pin = Pin::pa(25);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pull {
    Off,
    Up,
    Down,
}

/// Peripheral multiplexer selection, PMUX values 0 through 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Function {
    A = 0,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinConfig {
    pub direction: Direction,
    /// Driven level, `false` for low.
    pub level: bool,
    pub pull: Pull,
}

impl PinConfig {
    /// Output, driven low, no pull. USB pads sit like this before the mux
    /// hands them to the controller.
    pub const USB_IDLE: PinConfig = PinConfig {
        direction: Direction::Output,
        level: false,
        pull: Pull::Off,
    };
}

pub fn set_direction<B: RegisterBus>(bus: &mut B, pin: Pin, direction: Direction) {
    match direction {
        Direction::Output => bus.write(Reg::PortDirSet, pin.bit()),
        Direction::Input => bus.write(Reg::PortDirClr, pin.bit()),
    }
}

pub fn set_level<B: RegisterBus>(bus: &mut B, pin: Pin, high: bool) {
    if high {
        bus.write(Reg::PortOutSet, pin.bit());
    } else {
        bus.write(Reg::PortOutClr, pin.bit());
    }
}

/// With PULLEN set the OUT bit picks the pull direction, so pulling up or
/// down also drives OUT.
pub fn set_pull<B: RegisterBus>(bus: &mut B, pin: Pin, pull: Pull) {
    let cfg = Reg::PortPinCfg(pin.number());
    match pull {
        Pull::Off => bus.modify(cfg, |v| v & !u32::from(PinCfg::PULLEN.bits())),
        Pull::Up | Pull::Down => {
            set_level(bus, pin, pull == Pull::Up);
            bus.modify(cfg, |v| v | u32::from(PinCfg::PULLEN.bits()));
        }
    }
}

/// Hands the pin to peripheral `function`.
pub fn set_function<B: RegisterBus>(bus: &mut B, pin: Pin, function: Function) {
    let n = pin.number();
    let field = if n & 1 == 0 { PMUX_EVEN } else { PMUX_ODD };
    bus.modify(Reg::PortPmux(n >> 1), |v| field.insert(v, function as u32));
    bus.modify(Reg::PortPinCfg(n), |v| v | u32::from(PinCfg::PMUXEN.bits()));
}

/// Applies direction, level and pull, in that order.
pub fn configure<B: RegisterBus>(bus: &mut B, pin: Pin, config: &PinConfig) {
    set_direction(bus, pin, config.direction);
    set_level(bus, pin, config.level);
    set_pull(bus, pin, config.pull);
}

/// A GPIO output driven through the register bus.
pub struct Output<B> {
    bus: B,
    pin: Pin,
}

impl<B: RegisterBus> Output<B> {
    pub fn new(mut bus: B, pin: Pin) -> Self {
        set_level(&mut bus, pin, false);
        set_direction(&mut bus, pin, Direction::Output);
        Self { bus, pin }
    }
}

impl<B: RegisterBus> OutputPin for Output<B> {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        set_level(&mut self.bus, self.pin, false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        set_level(&mut self.bus, self.pin, true);
        Ok(())
    }
}
