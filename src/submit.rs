use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::form::{FirstError, Phase, ServiceForm};
use crate::reconcile::reconcile;
use crate::validate::{RecordErrors, SharedErrors};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Single,
    Batch,
}

impl Endpoint {
    pub fn name(self) -> &'static str {
        match self {
            Endpoint::Single => "single",
            Endpoint::Batch => "batch",
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Single => "/api/service/log",
            Endpoint::Batch => "/api/service/batch-log",
        }
    }
}

/// Captured when a submission starts so a late response is interpreted
/// against what was actually sent, not against the form as it looks now.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmit {
    pub generation: Uuid,
    pub endpoint: Endpoint,
    /// Number of records in the submitted payload.
    pub submitted: usize,
    /// Display names, for the success notification.
    pub students: Vec<String>,
}

#[derive(Debug)]
pub enum SubmitStart {
    /// A submission is already in flight; this attempt is a no-op.
    InFlight,
    /// Local validation failed; no payload was built.
    Blocked { first: FirstError },
    /// Ready to send. The host performs the HTTP call and feeds the result
    /// back through `apply_response` with the same generation token.
    Request {
        generation: Uuid,
        endpoint: Endpoint,
        payload: Value,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    Succeeded {
        count: usize,
        students: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    PartialSuccess {
        success_count: usize,
        error_count: usize,
        /// Raw backend messages, so a host notification can render them
        /// without re-deriving from the reconciled error slots.
        messages: Vec<String>,
    },
    NotFound,
    Failed {
        message: String,
    },
}

#[derive(Debug)]
pub enum Applied {
    /// Generation or phase mismatch: the batch was reset or resubmitted since
    /// this response left, so it must not touch current state.
    Stale,
    Outcome(Outcome),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    success_count: usize,
    #[serde(default)]
    error_count: usize,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    message: Option<String>,
}

fn split_full_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let surname = parts.collect::<Vec<_>>().join(" ");
    (first, surname)
}

fn build_request(form: &ServiceForm) -> (Endpoint, Value, Vec<String>) {
    if form.records.len() == 1 {
        let record = &form.records[0];
        let name = record.full_name.trim().to_string();
        let payload = json!({
            "studentName": name,
            "numberOfHours": record.hours.trim().parse::<f64>().unwrap_or(0.0),
            "dateCompleted": form.date_completed,
            "description": form.description,
        });
        return (Endpoint::Single, payload, vec![name]);
    }

    let mut students = Vec::with_capacity(form.records.len());
    let mut display = Vec::with_capacity(form.records.len());
    for record in &form.records {
        let (first_name, surname) = split_full_name(&record.full_name);
        display.push(format!("{} {}", first_name, surname));
        students.push(json!({
            "firstName": first_name,
            "surname": surname,
            "hours": record.hours.trim(),
        }));
    }
    let payload = json!({
        "students": students,
        "dateCompleted": form.date_completed,
        "description": form.description,
    });
    (Endpoint::Batch, payload, display)
}

/// Submit entry point. Validation runs synchronously here, so no payload is
/// ever produced for a batch that fails local validation.
pub fn begin_submit(form: &mut ServiceForm, today: NaiveDate) -> SubmitStart {
    if matches!(form.phase, Phase::Submitting(_)) {
        return SubmitStart::InFlight;
    }

    form.outcome = None;
    form.not_found = false;

    if form.validate_all(today) {
        let first = form.first_error().unwrap_or(FirstError {
            record: 0,
            field: "fullName",
        });
        return SubmitStart::Blocked { first };
    }

    let (endpoint, payload, students) = build_request(form);
    let generation = Uuid::new_v4();
    form.phase = Phase::Submitting(PendingSubmit {
        generation,
        endpoint,
        submitted: form.records.len(),
        students,
    });
    SubmitStart::Request {
        generation,
        endpoint,
        payload,
    }
}

/// Applies a network completion event. The generation token guards against
/// stale responses arriving after a reset or a later submission.
pub fn apply_response(
    form: &mut ServiceForm,
    generation: Uuid,
    status: u16,
    body: &Value,
) -> Applied {
    let pending = match &form.phase {
        Phase::Submitting(p) if p.generation == generation => p.clone(),
        _ => return Applied::Stale,
    };
    form.phase = Phase::Editing;

    let outcome = match pending.endpoint {
        Endpoint::Single => interpret_single(form, status, body, &pending),
        Endpoint::Batch => interpret_batch(form, status, body, &pending),
    };
    form.outcome = Some(outcome.clone());
    Applied::Outcome(outcome)
}

fn is_ok_status(status: u16) -> bool {
    (200..300).contains(&status)
}

fn interpret_single(
    form: &mut ServiceForm,
    status: u16,
    body: &Value,
    pending: &PendingSubmit,
) -> Outcome {
    let message = body
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    if is_ok_status(status) {
        form.reset();
        return Outcome::Succeeded {
            count: 1,
            students: pending.students.clone(),
        };
    }
    if status == 404 && message == "Student not found" {
        form.not_found = true;
        return Outcome::NotFound;
    }
    Outcome::Failed {
        message: if message.is_empty() {
            "Failed to log service hours".to_string()
        } else {
            message
        },
    }
}

fn parse_batch_body(body: &Value) -> anyhow::Result<BatchResponse> {
    serde_json::from_value(body.clone()).context("malformed batch response body")
}

fn interpret_batch(
    form: &mut ServiceForm,
    status: u16,
    body: &Value,
    pending: &PendingSubmit,
) -> Outcome {
    let parsed = match parse_batch_body(body) {
        Ok(p) => p,
        Err(e) => {
            return Outcome::Failed {
                message: format!("{:#}", e),
            }
        }
    };

    // The distinguished not-found condition exists only on the single-record
    // path; in a batch the missing student could be any row, so a non-ok
    // response is always a plain failure.
    if !is_ok_status(status) || !parsed.success {
        return Outcome::Failed {
            message: parsed
                .message
                .unwrap_or_else(|| "Failed to log hours".to_string()),
        };
    }

    if parsed.error_count == 0 {
        form.reset();
        return Outcome::Succeeded {
            count: parsed.success_count,
            students: pending.students.clone(),
        };
    }

    // Partial success: re-attach backend errors to the exact slots, keep every
    // record's entered values on screen for correction.
    let mut reconciled = reconcile(&parsed.errors, pending.submitted);
    reconciled
        .per_record
        .resize(form.records.len(), RecordErrors::clean());
    form.errors = reconciled.per_record;
    form.shared_errors = SharedErrors::clean();
    form.batch_errors = reconciled.batch_level;

    Outcome::PartialSuccess {
        success_count: parsed.success_count,
        error_count: parsed.error_count,
        messages: parsed.errors,
    }
}
