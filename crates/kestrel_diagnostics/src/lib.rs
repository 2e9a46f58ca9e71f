//! Structured warnings and errors reported while a netlist is simulated.
//!
//! A [`Diagnostic`] carries a severity, a code such as `W101`, the netlist
//! object it concerns, and optional notes and help. The thread-safe
//! [`DiagnosticSink`] collects them from every evaluation thread, and
//! [`TerminalRenderer`] formats them for the console.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
