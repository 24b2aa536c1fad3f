use chrono::NaiveDate;
use serde::Serialize;

use crate::submit::{Outcome, PendingSubmit};
use crate::validate::{
    validate_date, validate_description, validate_record, RecordErrors, SharedErrors,
};

/// Hard cap on a batch: one primary record plus up to 49 additional.
/// Must match the limit the batch endpoint enforces server-side.
pub const MAX_TOTAL: usize = 50;

pub const DEFAULT_MAX_HOURS: f64 = 10.0;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    pub full_name: String,
    /// Kept as entered; parsed only at validation and payload-build time.
    pub hours: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordField {
    FullName,
    Hours,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedField {
    DateCompleted,
    Description,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Editing,
    Submitting(PendingSubmit),
}

/// Where the host should move focus after a blocked submit. Shared fields are
/// rendered on the primary section, so they report record 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FirstError {
    pub record: usize,
    pub field: &'static str,
}

/// All client-side state for one service-hour batch: the record list, the
/// index-aligned error slots, the shared fields, and the submission phase.
pub struct ServiceForm {
    pub records: Vec<ServiceRecord>,
    pub date_completed: String,
    pub description: String,
    /// Always the same length as `records`.
    pub errors: Vec<RecordErrors>,
    pub shared_errors: SharedErrors,
    /// Backend messages that could not be attributed to a record/field.
    pub batch_errors: Vec<String>,
    /// Dedicated not-found flag for the primary name (single-record path).
    pub not_found: bool,
    pub max_hours: f64,
    pub phase: Phase,
    pub outcome: Option<Outcome>,
}

impl ServiceForm {
    pub fn new(max_hours: f64) -> ServiceForm {
        ServiceForm {
            records: vec![ServiceRecord::default()],
            date_completed: String::new(),
            description: String::new(),
            errors: vec![RecordErrors::clean()],
            shared_errors: SharedErrors::clean(),
            batch_errors: Vec::new(),
            not_found: false,
            max_hours,
            phase: Phase::Editing,
            outcome: None,
        }
    }

    /// Back to one blank primary record. Keeps the org hours ceiling.
    pub fn reset(&mut self) {
        *self = ServiceForm::new(self.max_hours);
    }

    pub fn total_records(&self) -> usize {
        self.records.len()
    }

    pub fn add_record(&mut self) -> bool {
        if self.records.len() >= MAX_TOTAL {
            return false;
        }
        self.records.push(ServiceRecord::default());
        self.errors.push(RecordErrors::clean());
        self.outcome = None;
        true
    }

    /// The primary record (index 0) can never be removed. Later error slots
    /// shift down with their records.
    pub fn remove_record(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.records.len() {
            return false;
        }
        self.records.remove(index);
        self.errors.remove(index);
        self.outcome = None;
        true
    }

    /// Sets one field and optimistically clears its error slot, even when the
    /// new value is itself invalid. The error can only reappear at the next
    /// explicit validation pass.
    pub fn update_field(&mut self, index: usize, field: RecordField, value: &str) -> bool {
        let Some(record) = self.records.get_mut(index) else {
            return false;
        };
        match field {
            RecordField::FullName => {
                record.full_name = value.to_string();
                if index == 0 {
                    self.not_found = false;
                }
                if let Some(slot) = self.errors.get_mut(index) {
                    slot.name.clear();
                }
            }
            RecordField::Hours => {
                record.hours = value.to_string();
                if let Some(slot) = self.errors.get_mut(index) {
                    slot.hours.clear();
                }
            }
        }
        self.outcome = None;
        true
    }

    pub fn set_shared(&mut self, field: SharedField, value: &str) {
        match field {
            SharedField::DateCompleted => {
                self.date_completed = value.to_string();
                self.shared_errors.date.clear();
            }
            SharedField::Description => {
                self.description = value.to_string();
                self.shared_errors.description.clear();
            }
        }
        self.outcome = None;
    }

    /// Full revalidation: every record plus the shared fields, with the prior
    /// error state replaced wholesale so fixed fields never linger. Idempotent.
    pub fn validate_all(&mut self, today: NaiveDate) -> bool {
        self.errors = self
            .records
            .iter()
            .map(|r| validate_record(r, self.max_hours))
            .collect();
        self.shared_errors = SharedErrors {
            date: validate_date(&self.date_completed, today),
            description: validate_description(&self.description),
        };
        self.batch_errors.clear();
        self.has_errors()
    }

    pub fn has_errors(&self) -> bool {
        !self.shared_errors.is_clean() || self.errors.iter().any(|e| !e.is_clean())
    }

    /// Scan order mirrors the on-screen layout: the primary section (name,
    /// hours, then the shared date and description) before additional records.
    pub fn first_error(&self) -> Option<FirstError> {
        if let Some(slot) = self.errors.first() {
            if slot.name.is_invalid() {
                return Some(FirstError {
                    record: 0,
                    field: "fullName",
                });
            }
            if slot.hours.is_invalid() {
                return Some(FirstError {
                    record: 0,
                    field: "hours",
                });
            }
        }
        if self.shared_errors.date.is_invalid() {
            return Some(FirstError {
                record: 0,
                field: "dateCompleted",
            });
        }
        if self.shared_errors.description.is_invalid() {
            return Some(FirstError {
                record: 0,
                field: "description",
            });
        }
        for (index, slot) in self.errors.iter().enumerate().skip(1) {
            if slot.name.is_invalid() {
                return Some(FirstError {
                    record: index,
                    field: "fullName",
                });
            }
            if slot.hours.is_invalid() {
                return Some(FirstError {
                    record: index,
                    field: "hours",
                });
            }
        }
        None
    }
}
