//! Verification of produced output vectors against a golden file.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use kestrel_diagnostics::{Diagnostic, DiagnosticSink};

use crate::codes;
use crate::error::SimError;
use crate::vectors::{compare_vectors, is_vector_row, Comparison, TestVector};

/// Result of a verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyOutcome {
    /// `true` if the files match, counting don't-care rows as matches.
    pub passed: bool,
    /// Rows compared, not counting the header.
    pub rows_compared: u64,
    /// Rows that differ.
    pub mismatches: u64,
    /// Rows that match only through don't-care bits.
    pub dont_care_rows: u64,
}

/// Compares `produced` against `golden`, row by row.
///
/// Differences are reported to `sink` as warnings; only failing to open or
/// read either file is an error. `rows` is the number of rows the run was
/// expected to produce.
pub fn verify_output_vectors(
    golden: &Path,
    produced: &Path,
    rows: u64,
    sink: &DiagnosticSink,
) -> Result<VerifyOutcome, SimError> {
    let mut outcome = VerifyOutcome::default();
    if same_file(golden, produced) {
        sink.emit(
            Diagnostic::warning(
                codes::VECTOR_FILE_SHAPE,
                "the golden file is the output file being produced; ignoring it",
            )
            .with_subject(golden.display().to_string()),
        );
        return Ok(outcome);
    }

    let mut expected = BufReader::new(File::open(golden)?);
    let mut actual = BufReader::new(File::open(produced)?);
    let golden_name = golden.display().to_string();

    let shape = |message: String| {
        Diagnostic::warning(codes::VECTOR_FILE_SHAPE, message).with_subject(golden_name.clone())
    };

    let golden_header = next_row(&mut expected)?.unwrap_or_default();
    let produced_header = next_row(&mut actual)?.unwrap_or_default();
    if golden_header != produced_header {
        sink.emit(
            shape("vector headers do not match".to_string())
                .with_note(format!("produced: {produced_header}"))
                .with_note(format!("expected: {golden_header}")),
        );
        return Ok(outcome);
    }

    let mut passed = true;
    for row in 0..rows {
        let Some(want) = next_row(&mut expected)? else {
            sink.emit(shape(format!("too few vectors: expected {rows}, found {row}")));
            passed = false;
            break;
        };
        let Some(got) = next_row(&mut actual)? else {
            sink.emit(shape(format!("simulation produced fewer than {rows} vectors")));
            passed = false;
            break;
        };
        outcome.rows_compared += 1;

        match compare_vectors(&TestVector::parse(&want)?, &TestVector::parse(&got)?) {
            Comparison::Equal => {}
            Comparison::EqualWithDontCare => {
                outcome.dont_care_rows += 1;
                sink.emit(
                    Diagnostic::warning(
                        codes::VECTOR_DONT_CARE,
                        format!("vector {row} has bits set where don't-care was expected"),
                    )
                    .with_note(format!("produced: {got}"))
                    .with_note(format!("expected: {want}")),
                );
            }
            Comparison::Different => {
                outcome.mismatches += 1;
                passed = false;
                sink.emit(
                    Diagnostic::warning(codes::VECTOR_MISMATCH, format!("vector {row} mismatch"))
                        .with_note(format!("produced: {got}"))
                        .with_note(format!("expected: {want}")),
                );
            }
        }
    }

    if passed && next_row(&mut expected)?.is_some() {
        sink.emit(shape(format!("golden file has more than {rows} vectors")));
        passed = false;
    }
    outcome.passed = passed;
    Ok(outcome)
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Next non-blank, non-comment row, trimmed.
fn next_row(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut row = String::new();
    loop {
        row.clear();
        if reader.read_line(&mut row)? == 0 {
            return Ok(None);
        }
        if is_vector_row(&row) {
            return Ok(Some(row.trim().to_string()));
        }
    }
}
