//! Register-file model used by the tests.
//!
//! Reads return whatever was last stored (zero by default, so every
//! sync-busy wait ends immediately). Writes are applied with the set/clear
//! semantics of the real register where that matters, and every access is
//! logged in order. The log is bounded so that a runaway polling loop fails
//! the test instead of hanging it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::digital::v2::OutputPin;

use crate::regs::{Reg, RegisterBus};
use crate::usb::InterruptLine;

const LOG_CAPACITY: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Read(Reg, u32),
    Write(Reg, u32),
}

#[derive(Default)]
struct Model {
    file: HashMap<Reg, u32>,
    log: heapless::Vec<Access, LOG_CAPACITY>,
}

impl Model {
    fn record(&mut self, access: Access) {
        if self.log.push(access).is_err() {
            panic!("register log overflow, last access {:?}", access);
        }
    }
}

#[derive(Clone, Default)]
pub struct Registers(Rc<RefCell<Model>>);

impl Registers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value without logging an access.
    pub fn get(&self, reg: Reg) -> u32 {
        self.0.borrow().file.get(&reg).copied().unwrap_or(0)
    }

    /// Presets a value as if the hardware had set it.
    pub fn set(&self, reg: Reg, value: u32) {
        self.0.borrow_mut().file.insert(reg, value);
    }

    pub fn log(&self) -> Vec<Access> {
        self.0.borrow().log.iter().copied().collect()
    }

    pub fn clear_log(&self) {
        self.0.borrow_mut().log.clear();
    }

    pub fn writes(&self) -> Vec<(Reg, u32)> {
        self.log()
            .into_iter()
            .filter_map(|a| match a {
                Access::Write(reg, value) => Some((reg, value)),
                Access::Read(..) => None,
            })
            .collect()
    }

    /// Index in the access log of the first write to `reg` that satisfies
    /// `pred`.
    pub fn first_write<F>(&self, reg: Reg, pred: F) -> Option<usize>
    where
        F: Fn(u32) -> bool,
    {
        self.log()
            .iter()
            .position(|a| matches!(*a, Access::Write(r, v) if r == reg && pred(v)))
    }

    pub fn data_writes(&self) -> Vec<u8> {
        self.writes()
            .into_iter()
            .filter(|(reg, _)| *reg == Reg::SpiData)
            .map(|(_, value)| value as u8)
            .collect()
    }
}

impl RegisterBus for Registers {
    fn read(&mut self, reg: Reg) -> u32 {
        let value = self.get(reg);
        self.0.borrow_mut().record(Access::Read(reg, value));
        value
    }

    fn write(&mut self, reg: Reg, value: u32) {
        let mut model = self.0.borrow_mut();
        model.record(Access::Write(reg, value));
        let file = &mut model.file;
        match reg {
            Reg::PortDirSet => *file.entry(Reg::PortDir).or_insert(0) |= value,
            Reg::PortDirClr => *file.entry(Reg::PortDir).or_insert(0) &= !value,
            Reg::PortOutSet => *file.entry(Reg::PortOut).or_insert(0) |= value,
            Reg::PortOutClr => *file.entry(Reg::PortOut).or_insert(0) &= !value,
            // write-one-to-clear
            Reg::SpiIntFlag | Reg::SpiStatus => *file.entry(reg).or_insert(0) &= !value,
            _ => {
                file.insert(reg, value);
            }
        }
    }
}

#[derive(Default)]
pub struct Line {
    pub masked: Cell<bool>,
    pub masks: Cell<u32>,
    pub unmasks: Cell<u32>,
}

impl InterruptLine for Line {
    fn mask(&self) {
        self.masked.set(true);
        self.masks.set(self.masks.get() + 1);
    }

    fn unmask(&self) {
        self.masked.set(false);
        self.unmasks.set(self.unmasks.get() + 1);
    }
}

/// Output pin that remembers every level it was driven to.
#[derive(Default)]
pub struct Pin {
    pub levels: Vec<bool>,
}

impl OutputPin for Pin {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.levels.push(true);
        Ok(())
    }
}

#[derive(Default)]
pub struct Delay {
    pub total_ms: u32,
}

impl DelayMs<u16> for Delay {
    fn delay_ms(&mut self, ms: u16) {
        self.total_ms += u32::from(ms);
    }
}
