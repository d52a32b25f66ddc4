//! Filesystem utilities for axon.

mod atomic;

pub use atomic::atomic_write;
