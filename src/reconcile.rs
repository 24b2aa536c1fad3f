use crate::validate::{FieldError, RecordErrors};

/// User-facing replacement for the backend's raw "not found in database"
/// phrasing.
pub const NOT_FOUND_MESSAGE: &str =
    "Student not found. Please check the spelling and try again.";

pub struct Reconciled {
    /// Fresh error set, index-aligned with the submitted records.
    pub per_record: Vec<RecordErrors>,
    /// Messages that could not be mapped to a record; preserved verbatim.
    pub batch_level: Vec<String>,
}

/// Parses one backend batch error of the form `"Student {n}: {message}"`.
/// `n` is 1-based over the submitted order, with the primary record as
/// Student 1. Returns the raw 1-based number; the 0-based translation happens
/// in `reconcile` and nowhere else.
fn parse_student_message(raw: &str) -> Option<(usize, &str)> {
    let rest = raw.strip_prefix("Student ")?;
    let (number, tail) = rest.split_once(':')?;
    let n = number.trim().parse::<usize>().ok()?;
    Some((n, tail.trim()))
}

/// Maps the backend's index-addressed error strings back onto per-record field
/// slots. Builds a fresh all-clean set first; callers replace their error
/// state with the result rather than merging, so stale pre-submit errors
/// cannot linger. Unparseable or out-of-range messages land in `batch_level`
/// rather than being guessed onto a record.
pub fn reconcile(messages: &[String], record_count: usize) -> Reconciled {
    let mut per_record = vec![RecordErrors::clean(); record_count];
    let mut batch_level = Vec::new();

    for raw in messages {
        let Some((n, text)) = parse_student_message(raw) else {
            batch_level.push(raw.clone());
            continue;
        };
        if n < 1 || n > record_count {
            batch_level.push(raw.clone());
            continue;
        }
        let slot = &mut per_record[n - 1];
        let lowered = text.to_lowercase();
        if lowered.contains("not found") {
            slot.name = FieldError::invalid(NOT_FOUND_MESSAGE);
        } else if lowered.contains("hour") {
            slot.hours = FieldError::Invalid(text.to_string());
        } else {
            slot.name = FieldError::Invalid(text.to_string());
        }
    }

    Reconciled {
        per_record,
        batch_level,
    }
}
