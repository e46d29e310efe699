//! SERCOM0 in SPI subordinate mode.
//!
//! The external controller owns the clock and chip select. All this side
//! does is keep a byte sitting in DATA so that whatever gets clocked out next
//! is defined.

use core::convert::Infallible;

use crate::clock::{self, BusClock, Channel, Generator};
use crate::foreground::Preload;
use crate::port::{self, Function, Pin};
use crate::regs::{
    ApbcMask, CtrlA, CtrlB, IntFlag, Reg, RegisterBus, Status, SyncBusy, CTRLA_DIPO, CTRLA_DOPO,
    CTRLA_MODE,
};
use crate::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Subordinate = 2,
}

/// Which pad carries which signal for a given DIPO/DOPO pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PadRoles {
    pub data_in: u8,
    pub data_out: u8,
    pub clock: u8,
    pub chip_select: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiConfig {
    pub mode: Mode,
    pub dipo: u8,
    pub dopo: u8,
    pub preload: bool,
    pub receive: bool,
}

impl SpiConfig {
    /// Data in on pad 0, chip select on pad 1, data out on pad 2, clock on
    /// pad 3.
    pub const SUBORDINATE: SpiConfig = SpiConfig {
        mode: Mode::Subordinate,
        dipo: 0,
        dopo: 1,
        preload: true,
        receive: true,
    };

    /// Resolves the pad of every signal, rejecting pairs where data in
    /// lands on a pad DOPO already uses.
    pub const fn roles(&self) -> Result<PadRoles, Error> {
        if self.dipo > 3 || self.dopo > 3 {
            return Err(Error::InvalidPad);
        }
        // (data out, clock, chip select) for subordinate DOPO 0..=3
        let (data_out, clock, chip_select) = match self.dopo {
            0 => (0, 1, 2),
            1 => (2, 3, 1),
            2 => (3, 1, 2),
            _ => (0, 3, 1),
        };
        let data_in = self.dipo;
        if data_in == data_out || data_in == clock || data_in == chip_select {
            return Err(Error::PadConflict);
        }
        Ok(PadRoles {
            data_in,
            data_out,
            clock,
            chip_select,
        })
    }
}

/// Pins wired to SERCOM pads 0 through 3.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiPads {
    pub pads: [Pin; 4],
    pub function: Function,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadPolicy {
    /// Write DATA every pass; the latest write wins.
    Unchecked,
    /// Write DATA only while INTFLAG.DRE is set.
    GateOnDre,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Leave BUFOVF latched.
    Ignore,
    /// Write latched status and error flags back to clear them.
    Clear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Outbound {
    pub byte: u8,
    pub policy: PreloadPolicy,
    pub errors: ErrorPolicy,
}

pub struct SpiSubordinate<B> {
    bus: B,
    outbound: Outbound,
    error_count: u32,
}

impl<B: RegisterBus> SpiSubordinate<B> {
    pub fn init(
        mut bus: B,
        config: &SpiConfig,
        pads: &SpiPads,
        generator: Generator,
        outbound: Outbound,
    ) -> Result<Self, Error> {
        config.roles()?;

        clock::enable_bus_clock(&mut bus, BusClock::Apbc(ApbcMask::SERCOM0));
        clock::route_generator(&mut bus, generator, Channel::Sercom0Core);
        for pin in pads.pads.iter() {
            port::set_function(&mut bus, *pin, pads.function);
        }

        bus.modify(Reg::SpiCtrlA, |v| CTRLA_MODE.insert(v, config.mode as u32));
        bus.modify(Reg::SpiCtrlA, |v| CTRLA_DIPO.insert(v, u32::from(config.dipo)));
        bus.modify(Reg::SpiCtrlA, |v| CTRLA_DOPO.insert(v, u32::from(config.dopo)));

        if config.preload {
            bus.modify(Reg::SpiCtrlB, |v| v | CtrlB::PLOADEN.bits());
        }
        if config.receive {
            bus.modify(Reg::SpiCtrlB, |v| v | CtrlB::RXEN.bits());
            bus.wait_clear(Reg::SpiSyncBusy, SyncBusy::CTRLB.bits());
        }

        bus.modify(Reg::SpiCtrlA, |v| v | CtrlA::ENABLE.bits());
        bus.wait_clear(Reg::SpiSyncBusy, SyncBusy::ENABLE.bits());

        Ok(Self {
            bus,
            outbound,
            error_count: 0,
        })
    }

    pub fn preload(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.outbound.policy == PreloadPolicy::GateOnDre {
            let flags = IntFlag::from_bits_truncate(self.bus.read(Reg::SpiIntFlag) as u8);
            if !flags.contains(IntFlag::DRE) {
                return Err(nb::Error::WouldBlock);
            }
        }
        self.bus.write(Reg::SpiData, u32::from(byte));
        Ok(())
    }

    /// Returns the latched status if it was cleared under
    /// `ErrorPolicy::Clear`. `Ignore` does not touch the registers.
    pub fn check_errors(&mut self) -> Option<Status> {
        if self.outbound.errors == ErrorPolicy::Ignore {
            return None;
        }
        let status = Status::from_bits_truncate(self.bus.read(Reg::SpiStatus) as u16);
        if !status.contains(Status::BUFOVF) {
            return None;
        }
        self.bus.write(Reg::SpiStatus, u32::from(Status::BUFOVF.bits()));
        self.bus.write(Reg::SpiIntFlag, u32::from(IntFlag::ERROR.bits()));
        self.error_count = self.error_count.wrapping_add(1);
        Some(status)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }
}

impl<B: RegisterBus> Preload for SpiSubordinate<B> {
    fn refresh(&mut self) {
        self.check_errors();
        // a full data register just means the previous byte is still queued
        let _ = self.preload(self.outbound.byte);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::Registers;
    use crate::port::{PA04, PA05, PA06, PA07};
    use crate::regs::PinCfg;

    const PADS: SpiPads = SpiPads {
        pads: [PA04, PA05, PA06, PA07],
        function: Function::D,
    };

    const UNCHECKED: Outbound = Outbound {
        byte: b'b',
        policy: PreloadPolicy::Unchecked,
        errors: ErrorPolicy::Ignore,
    };

    fn init(regs: &Registers, outbound: Outbound) -> SpiSubordinate<Registers> {
        match SpiSubordinate::init(
            regs.clone(),
            &SpiConfig::SUBORDINATE,
            &PADS,
            Generator(0),
            outbound,
        ) {
            Ok(spi) => spi,
            Err(e) => panic!("failed to init spi: {:?}", e),
        }
    }

    #[test]
    fn subordinate_roles() {
        let roles = match SpiConfig::SUBORDINATE.roles() {
            Ok(roles) => roles,
            Err(e) => panic!("failed to resolve pads: {:?}", e),
        };
        assert_eq!(
            roles,
            PadRoles {
                data_in: 0,
                data_out: 2,
                clock: 3,
                chip_select: 1,
            }
        );
    }

    #[test]
    fn conflicting_pads_rejected() {
        let config = SpiConfig {
            dipo: 2,
            ..SpiConfig::SUBORDINATE
        };
        assert_eq!(config.roles(), Err(Error::PadConflict));

        let config = SpiConfig {
            dopo: 4,
            ..SpiConfig::SUBORDINATE
        };
        assert_eq!(config.roles(), Err(Error::InvalidPad));

        let regs = Registers::new();
        let result = SpiSubordinate::init(regs.clone(), &config, &PADS, Generator(0), UNCHECKED);
        assert!(result.is_err());
        assert!(regs.writes().is_empty());
    }

    #[test]
    fn init_programs_fields() {
        let regs = Registers::new();
        init(&regs, UNCHECKED);

        let ctrla = regs.get(Reg::SpiCtrlA);
        assert_eq!(CTRLA_MODE.extract(ctrla), 2);
        assert_eq!(CTRLA_DIPO.extract(ctrla), 0);
        assert_eq!(CTRLA_DOPO.extract(ctrla), 1);
        assert_ne!(ctrla & CtrlA::ENABLE.bits(), 0);

        let ctrlb = regs.get(Reg::SpiCtrlB);
        assert_ne!(ctrlb & CtrlB::PLOADEN.bits(), 0);
        assert_ne!(ctrlb & CtrlB::RXEN.bits(), 0);

        assert_eq!(regs.get(Reg::PmApbcMask), ApbcMask::SERCOM0.bits());
        assert_eq!(regs.get(Reg::GclkClkCtrl), 0x4014);
        assert_eq!(regs.get(Reg::PortPmux(2)), 0x33);
        assert_eq!(regs.get(Reg::PortPmux(3)), 0x33);
        for pin in 4..8 {
            assert_eq!(regs.get(Reg::PortPinCfg(pin)), u32::from(PinCfg::PMUXEN.bits()));
        }
    }

    #[test]
    fn init_order() {
        let regs = Registers::new();
        init(&regs, UNCHECKED);

        let clock = regs.first_write(Reg::PmApbcMask, |_| true);
        let route = regs.first_write(Reg::GclkClkCtrl, |_| true);
        let mux = regs.first_write(Reg::PortPinCfg(7), |_| true);
        let mode = regs.first_write(Reg::SpiCtrlA, |v| CTRLA_MODE.extract(v) == 2);
        let dopo = regs.first_write(Reg::SpiCtrlA, |v| CTRLA_DOPO.extract(v) == 1);
        let ploaden = regs.first_write(Reg::SpiCtrlB, |v| v & CtrlB::PLOADEN.bits() != 0);
        let rxen = regs.first_write(Reg::SpiCtrlB, |v| v & CtrlB::RXEN.bits() != 0);
        let enable = regs.first_write(Reg::SpiCtrlA, |v| v & CtrlA::ENABLE.bits() != 0);

        let order = [clock, route, mux, mode, dopo, ploaden, rxen, enable];
        for step in order.iter() {
            assert!(step.is_some());
        }
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1], "out of order: {:?}", order);
        }
    }

    #[test]
    fn unchecked_preload_always_writes() {
        let regs = Registers::new();
        let mut spi = init(&regs, UNCHECKED);
        regs.clear_log();

        for _ in 0..8 {
            spi.refresh();
        }
        assert_eq!(regs.data_writes(), vec![b'b'; 8]);
        // no status polling on the baseline path
        assert_eq!(regs.log().len(), 8);
    }

    #[test]
    fn gated_preload_waits_for_dre() {
        let regs = Registers::new();
        let mut spi = init(
            &regs,
            Outbound {
                policy: PreloadPolicy::GateOnDre,
                ..UNCHECKED
            },
        );
        regs.clear_log();

        assert_eq!(spi.preload(b'x'), Err(nb::Error::WouldBlock));
        assert!(regs.data_writes().is_empty());

        regs.set(Reg::SpiIntFlag, u32::from(IntFlag::DRE.bits()));
        assert_eq!(spi.preload(b'x'), Ok(()));
        assert_eq!(regs.data_writes(), vec![b'x']);
    }

    #[test]
    fn overflow_left_latched_when_ignored() {
        let regs = Registers::new();
        let mut spi = init(&regs, UNCHECKED);
        regs.set(Reg::SpiStatus, u32::from(Status::BUFOVF.bits()));

        assert_eq!(spi.check_errors(), None);
        assert_eq!(regs.get(Reg::SpiStatus), u32::from(Status::BUFOVF.bits()));
        assert_eq!(spi.error_count(), 0);
    }

    #[test]
    fn overflow_cleared_and_counted() {
        let regs = Registers::new();
        let mut spi = init(
            &regs,
            Outbound {
                errors: ErrorPolicy::Clear,
                ..UNCHECKED
            },
        );
        regs.set(Reg::SpiStatus, u32::from(Status::BUFOVF.bits()));
        regs.set(Reg::SpiIntFlag, u32::from(IntFlag::ERROR.bits()));

        spi.refresh();
        assert_eq!(regs.get(Reg::SpiStatus), 0);
        assert_eq!(regs.get(Reg::SpiIntFlag), 0);
        assert_eq!(spi.error_count(), 1);
        assert_eq!(regs.data_writes(), vec![b'b']);

        spi.refresh();
        assert_eq!(spi.error_count(), 1);
    }
}
