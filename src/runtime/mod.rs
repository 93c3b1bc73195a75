//! Runtime system
//!
//! This module contains the concurrency scheduling primitives.

pub mod scheduler;
