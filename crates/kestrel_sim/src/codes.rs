//! Diagnostic codes emitted by the simulator.

use kestrel_diagnostics::{Category, DiagnosticCode};

/// An input pin has no net or its net has no driver.
pub const UNDRIVEN_PIN: DiagnosticCode = DiagnosticCode::new(Category::Warning, 101);
/// An output pin sits on a net driven by another pin.
pub const SHARED_NET_DRIVER: DiagnosticCode = DiagnosticCode::new(Category::Warning, 102);
/// An output vector differs from the golden file.
pub const VECTOR_MISMATCH: DiagnosticCode = DiagnosticCode::new(Category::Warning, 103);
/// An output vector matches the golden file only through don't-care bits.
pub const VECTOR_DONT_CARE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 104);
/// A monitor pattern matched no node.
pub const MONITOR_UNMATCHED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 105);
/// Some nodes were never reached by the scheduler.
pub const UNREACHED_NODES: DiagnosticCode = DiagnosticCode::new(Category::Warning, 106);
/// A memory has no initialization file.
pub const MIF_MISSING: DiagnosticCode = DiagnosticCode::new(Category::Warning, 107);
/// A clock input is driven by another node.
pub const CLOCK_DRIVEN_BY_NODE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 108);
/// The golden file has a different number of vectors or a different header.
pub const VECTOR_FILE_SHAPE: DiagnosticCode = DiagnosticCode::new(Category::Warning, 109);
/// Generated vectors ran out of batches before reaching the coverage target.
pub const COVERAGE_TARGET_MISSED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 110);
/// An input pin stopped receiving values.
pub const STALLED_INPUT: DiagnosticCode = DiagnosticCode::new(Category::Error, 201);
/// End-of-run toggle coverage.
pub const COVERAGE_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Info, 301);
