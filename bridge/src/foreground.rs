//! The cooperative foreground loop.

use crate::usb::UsbStack;

/// Keeps the outbound SPI byte topped up.
pub trait Preload {
    fn refresh(&mut self);
}

impl<P: Preload + ?Sized> Preload for &mut P {
    fn refresh(&mut self) {
        (**self).refresh()
    }
}

pub struct Foreground<S, P> {
    stack: S,
    preload: P,
}

impl<S: UsbStack, P: Preload> Foreground<S, P> {
    pub fn new(stack: S, preload: P) -> Self {
        Self { stack, preload }
    }

    /// One pass: pump the stack, then refresh the preload.
    pub fn poll(&mut self) {
        self.stack.task();
        self.preload.refresh();
    }

    /// Runs forever. `idle` is called between passes and must return
    /// promptly; pass `|| ()` for a plain busy loop.
    pub fn run<F: FnMut()>(mut self, mut idle: F) -> ! {
        loop {
            self.poll();
            idle();
        }
    }

    pub fn parts(self) -> (S, P) {
        (self.stack, self.preload)
    }
}
