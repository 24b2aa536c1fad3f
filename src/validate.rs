use serde::{Serialize, Serializer};

use chrono::NaiveDate;

use crate::form::ServiceRecord;

/// One field's validation result. Serializes as `null` when valid and as the
/// message string when not, which is the shape the host form binds to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    Valid,
    Invalid(String),
}

impl FieldError {
    pub fn invalid(message: &str) -> FieldError {
        FieldError::Invalid(message.to_string())
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, FieldError::Invalid(_))
    }

    pub fn clear(&mut self) {
        *self = FieldError::Valid;
    }
}

impl Serialize for FieldError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldError::Valid => serializer.serialize_none(),
            FieldError::Invalid(message) => serializer.serialize_str(message),
        }
    }
}

/// Per-record error slot, index-aligned with the record list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordErrors {
    #[serde(rename = "fullName")]
    pub name: FieldError,
    pub hours: FieldError,
}

impl RecordErrors {
    pub fn clean() -> RecordErrors {
        RecordErrors {
            name: FieldError::Valid,
            hours: FieldError::Valid,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.name.is_invalid() && !self.hours.is_invalid()
    }
}

/// Errors for the batch-shared fields. Date and description belong to the
/// batch, not to individual records, and are validated exactly once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SharedErrors {
    #[serde(rename = "dateCompleted")]
    pub date: FieldError,
    pub description: FieldError,
}

impl SharedErrors {
    pub fn clean() -> SharedErrors {
        SharedErrors {
            date: FieldError::Valid,
            description: FieldError::Valid,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.date.is_invalid() && !self.description.is_invalid()
    }
}

fn name_char_allowed(c: char) -> bool {
    c.is_alphabetic() || c.is_whitespace() || matches!(c, '\'' | '.' | '-')
}

/// First failing rule wins; a field never carries more than one message.
pub fn validate_name(raw: &str) -> FieldError {
    let name = raw.trim();
    if name.is_empty() {
        return FieldError::invalid("Student full name is required");
    }
    if name.chars().count() < 3 {
        return FieldError::invalid("Must be at least 3 characters");
    }
    let parts: Vec<&str> = name.split_whitespace().collect();
    if parts.len() < 2 {
        return FieldError::invalid("Include both first and last name");
    }
    if parts[0].chars().count() < 2 {
        return FieldError::invalid("First name too short");
    }
    if parts[parts.len() - 1].chars().count() < 2 {
        return FieldError::invalid("Surname too short");
    }
    if !name.chars().all(name_char_allowed) {
        return FieldError::invalid("Contains invalid characters");
    }
    FieldError::Valid
}

fn format_max_hours(max_hours: f64) -> String {
    if max_hours.fract() == 0.0 {
        format!("{}", max_hours as i64)
    } else {
        format!("{}", max_hours)
    }
}

/// Range is checked before quantization: an out-of-range value reports the
/// range message even when it is also not a half-hour multiple.
pub fn validate_hours(raw: &str, max_hours: f64) -> FieldError {
    let text = raw.trim();
    if text.is_empty() {
        return FieldError::invalid("Hours are required");
    }
    let range_message = format!("Must be between 0.5 and {}", format_max_hours(max_hours));
    let Ok(hours) = text.parse::<f64>() else {
        return FieldError::Invalid(range_message);
    };
    if !hours.is_finite() || hours < 0.5 || hours > max_hours {
        return FieldError::Invalid(range_message);
    }
    let doubled = hours * 2.0;
    if (doubled - doubled.round()).abs() > 1e-9 {
        return FieldError::invalid("Must be in half hour increments");
    }
    FieldError::Valid
}

pub fn validate_date(raw: &str, today: NaiveDate) -> FieldError {
    let text = raw.trim();
    if text.is_empty() {
        return FieldError::invalid("Date is required");
    }
    let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") else {
        return FieldError::invalid("Date must be in YYYY-MM-DD format");
    };
    if date > today {
        return FieldError::invalid("Date cannot be in the future");
    }
    FieldError::Valid
}

pub fn validate_description(raw: &str) -> FieldError {
    if raw.trim().is_empty() {
        return FieldError::invalid("Description is required");
    }
    if raw.trim().chars().count() < 8 {
        return FieldError::invalid("Must be at least 8 characters");
    }
    if raw.chars().count() > 200 {
        return FieldError::invalid("Must be less than 200 characters");
    }
    FieldError::Valid
}

/// Runs the per-record rules. Identical for the primary record and for every
/// additional record; the shared date/description rules live on the batch.
pub fn validate_record(record: &ServiceRecord, max_hours: f64) -> RecordErrors {
    RecordErrors {
        name: validate_name(&record.full_name),
        hours: validate_hours(&record.hours, max_hours),
    }
}
