//! Tessera Core
//!
//! Shared building blocks for the Tessera sprite renderer: logging setup,
//! puffin profiling, generational storage and small geometry helpers.

pub mod alloc;
pub mod config;
pub mod geometry;
pub mod logging;
pub mod math;
pub mod profiling;
