//! Shared foundational types used across the Kestrel netlist simulator.
//!
//! This crate provides the three-state [`Logic`] value carried on every pin
//! and net, and radix conversion helpers shared by the memory-initialization
//! reader and the test-vector reader.

#![warn(missing_docs)]

pub mod logic;
pub mod radix;

pub use logic::{Logic, ParseLogicError};
pub use radix::{bits_to_u64, parse_radix_bits, Radix, RadixError};
