//! `log` wrappers that prefix each line with its source location, so a
//! serial capture points straight at the code that wrote it.
//!
//! ```text
//! [src/wifi.rs:48] Station started
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! located {
    ($level:ident, $($arg:tt)*) => {{
        const LOC: &str = concat!("[", file!(), ":", line!(), "]");
        ::log::$level!("{} {}", LOC, format_args!($($arg)*))
    }};
}

#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => { $crate::located!(info, $($arg)*) };
}

#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => { $crate::located!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => { $crate::located!(error, $($arg)*) };
}

#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => { $crate::located!(debug, $($arg)*) };
}
