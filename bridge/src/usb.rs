//! USB controller bring-up and the glue between the USB interrupt and the
//! foreground loop.

use core::sync::atomic::{AtomicBool, Ordering};

use crate::clock::{self, BusClock, Channel, Generator};
use crate::port::{self, Function, Pin, PinConfig};
use crate::regs::{AhbMask, ApbbMask, RegisterBus};

/// Logical port index the device stack binds to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RootHubPort(pub u8);

/// The device stack as the foreground loop sees it.
pub trait UsbStack {
    /// Advances the stack: drains pending events, answers requests, moves
    /// data. Must not block.
    fn task(&mut self);
}

impl<S: UsbStack + ?Sized> UsbStack for &mut S {
    fn task(&mut self) {
        (**self).task()
    }
}

/// The NVIC line of the USB interrupt.
pub trait InterruptLine {
    fn mask(&self);
    fn unmask(&self);
}

impl<L: InterruptLine + ?Sized> InterruptLine for &L {
    fn mask(&self) {
        (**self).mask()
    }

    fn unmask(&self) {
        (**self).unmask()
    }
}

/// Set by the interrupt handler, drained by the foreground.
///
/// The handler masks its own line before setting the flag, so between
/// `irq` and `rearm` nothing else writes `pending`. That is what lets
/// `take` get by with a plain load and store on cores without atomic
/// read-modify-write.
pub struct IrqLatch<L> {
    port: RootHubPort,
    pending: AtomicBool,
    line: L,
}

impl<L: InterruptLine> IrqLatch<L> {
    pub const fn new(port: RootHubPort, line: L) -> Self {
        Self {
            port,
            pending: AtomicBool::new(false),
            line,
        }
    }

    /// Interrupt sink. Events for a port the stack is not bound to are
    /// dropped.
    pub fn irq(&self, port: RootHubPort) {
        if port != self.port {
            return;
        }
        self.line.mask();
        self.pending.store(true, Ordering::Release);
    }

    pub fn take(&self) -> bool {
        let pending = self.pending.load(Ordering::Acquire);
        if pending {
            self.pending.store(false, Ordering::Relaxed);
        }
        pending
    }

    pub fn rearm(&self) {
        self.line.unmask();
    }

    /// Drains the flag, runs `service`, then opens the line again whether or
    /// not anything was pending. An interrupt taken while `service` runs
    /// leaves the flag set for the next pass.
    pub fn service<R, F: FnOnce() -> R>(&self, service: F) -> R {
        self.take();
        let out = service();
        self.rearm();
        out
    }

    /// Calls `sleep` unless an event is waiting, since the line is masked
    /// until it is serviced. Must run with interrupts disabled so the handler
    /// cannot land between the check and the sleep.
    pub fn idle<F: FnOnce()>(&self, sleep: F) {
        if !self.pending.load(Ordering::Acquire) {
            sleep();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsbPins {
    pub dm: Pin,
    pub dp: Pin,
}

/// Clocks the controller and parks D-/D+ on the USB function. The caller
/// checks the generator frequency first.
pub fn bring_up<B: RegisterBus>(bus: &mut B, generator: Generator, pins: &UsbPins) {
    clock::enable_bus_clock(bus, BusClock::Apbb(ApbbMask::USB));
    clock::enable_bus_clock(bus, BusClock::Ahb(AhbMask::USB));
    clock::route_generator(bus, generator, Channel::Usb);

    port::configure(bus, pins.dm, &PinConfig::USB_IDLE);
    port::configure(bus, pins.dp, &PinConfig::USB_IDLE);
    port::set_function(bus, pins.dm, Function::G);
    port::set_function(bus, pins.dp, Function::G);
}

/// Buffer the USB controller reads and writes by DMA.
#[repr(C, align(4))]
pub struct DmaBuffer<const N: usize>([u8; N]);

impl<const N: usize> DmaBuffer<N> {
    pub const fn new() -> Self {
        DmaBuffer([0; N])
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mock::{Line, Registers};
    use crate::port::{PA24, PA25};
    use crate::regs::{PinCfg, Reg};

    #[test]
    fn latch_masks_then_flags() {
        let latch = IrqLatch::new(RootHubPort(0), Line::default());
        assert!(!latch.take());

        latch.irq(RootHubPort(0));
        assert!(latch.line.masked.get());
        assert!(latch.take());
        assert!(!latch.take());
        assert!(latch.line.masked.get());

        latch.rearm();
        assert!(!latch.line.masked.get());
        assert_eq!(latch.line.masks.get(), 1);
        assert_eq!(latch.line.unmasks.get(), 1);
    }

    #[test]
    fn interrupt_during_service_leaves_line_open() {
        let latch = IrqLatch::new(RootHubPort(0), Line::default());
        latch.rearm();

        latch.service(|| latch.irq(RootHubPort(0)));
        assert!(!latch.line.masked.get());
        assert!(latch.take());
    }

    #[test]
    fn idle_sleeps_only_with_line_open() {
        let latch = IrqLatch::new(RootHubPort(0), Line::default());
        let mut slept = 0;

        latch.rearm();
        latch.idle(|| slept += 1);
        assert_eq!(slept, 1);

        // handler fired again right after the line reopened
        latch.service(|| ());
        latch.irq(RootHubPort(0));
        assert!(latch.line.masked.get());
        latch.idle(|| slept += 1);
        assert_eq!(slept, 1);

        latch.service(|| ());
        latch.idle(|| slept += 1);
        assert_eq!(slept, 2);
    }

    #[test]
    fn latch_ignores_other_ports() {
        let latch = IrqLatch::new(RootHubPort(0), Line::default());
        latch.irq(RootHubPort(1));
        assert!(!latch.take());
        assert_eq!(latch.line.masks.get(), 0);
    }

    #[test]
    fn bring_up_clocks_and_pins() {
        let mut regs = Registers::new();
        let pins = UsbPins { dm: PA24, dp: PA25 };
        bring_up(&mut regs, Generator(0), &pins);

        assert_eq!(regs.get(Reg::PmApbbMask), ApbbMask::USB.bits());
        assert_eq!(regs.get(Reg::PmAhbMask), AhbMask::USB.bits());
        assert_eq!(regs.get(Reg::GclkClkCtrl), 0x4006);

        let both = (1 << 24) | (1 << 25);
        assert_eq!(regs.get(Reg::PortDir) & both, both);
        assert_eq!(regs.get(Reg::PortOut) & both, 0);
        assert_eq!(regs.get(Reg::PortPmux(12)), 0x66);
        for pin in 24..26 {
            let cfg = regs.get(Reg::PortPinCfg(pin));
            assert_eq!(cfg, u32::from(PinCfg::PMUXEN.bits()));
        }
    }

    #[test]
    fn bring_up_order() {
        let mut regs = Registers::new();
        bring_up(&mut regs, Generator(0), &UsbPins { dm: PA24, dp: PA25 });

        let apbb = regs.first_write(Reg::PmApbbMask, |_| true);
        let ahb = regs.first_write(Reg::PmAhbMask, |_| true);
        let route = regs.first_write(Reg::GclkClkCtrl, |_| true);
        let dir = regs.first_write(Reg::PortDirSet, |v| v == 1 << 24);
        let mux = regs.first_write(Reg::PortPmux(12), |_| true);

        let order = [apbb, ahb, route, dir, mux];
        assert!(order.iter().all(Option::is_some));
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1], "out of order: {:?}", order);
        }
    }

    #[test]
    fn dma_buffer_is_word_aligned() {
        assert_eq!(core::mem::align_of::<DmaBuffer<512>>(), 4);
        let mut buffer = DmaBuffer::<512>::new();
        assert_eq!(buffer.as_mut_slice().len(), 512);
        assert_eq!(buffer.as_mut_slice().as_ptr() as usize % 4, 0);
    }
}
