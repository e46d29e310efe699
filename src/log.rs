//! `log!` prints over semihosting when the `semihosting` feature is on and
//! compiles to nothing otherwise. Arguments are still type-checked either way.

#[cfg(feature = "semihosting")]
macro_rules! log {
    ($($arg:tt)*) => {
        cortex_m_semihosting::hprintln!($($arg)*)
    };
}

#[cfg(not(feature = "semihosting"))]
macro_rules! log {
    ($($arg:tt)*) => {
        if false {
            let _ = core::format_args!($($arg)*);
        }
    };
}
