//! Target-language backends.

pub mod java;
pub mod rust;

pub use java::JavaBackend;
pub use rust::RustBackend;
