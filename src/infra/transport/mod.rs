//! Transport backends.

pub mod log;

pub use log::LogTransport;
