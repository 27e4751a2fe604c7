//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Fixed-width bitfields for component masks
//! - Collections and data structures
//! - Time management
//! - Logging utilities

pub mod bitfield;
pub mod collections;
pub mod time;
pub mod logging;

pub use bitfield::{Bitfield, BitfieldAllocator, BITFIELD_CAPACITY};
pub use collections::IndexList;
pub use time::{FrameClock, FrameTime};
