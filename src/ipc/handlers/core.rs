use crate::form::{Phase, ServiceForm, DEFAULT_MAX_HOURS, MAX_TOTAL};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};

/// Ceiling for the per-organization hours override.
const MAX_HOURS_CEILING: f64 = 50.0;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> Value {
        err(id, self.code, self.message, self.details)
    }
}

fn require_form(state: &mut AppState) -> Result<&mut ServiceForm, HandlerErr> {
    state.form.as_mut().ok_or_else(|| HandlerErr {
        code: "no_form",
        message: "no form open; call form.open first".to_string(),
        details: None,
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "form.open" => Some(handle_form_open(state, req)),
        "form.reset" => Some(handle_form_reset(state, req)),
        "form.get" => Some(handle_form_get(state, req)),
        _ => None,
    }
}

fn handle_health(state: &mut AppState, req: &Request) -> Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "formOpen": state.form.is_some(),
        }),
    )
}

fn parse_max_hours(params: &Value) -> Result<f64, HandlerErr> {
    let Some(raw) = params.get("maxHours") else {
        return Ok(DEFAULT_MAX_HOURS);
    };
    if raw.is_null() {
        return Ok(DEFAULT_MAX_HOURS);
    }
    let Some(max_hours) = raw.as_f64() else {
        return Err(HandlerErr {
            code: "bad_params",
            message: "maxHours must be a number".to_string(),
            details: None,
        });
    };
    if !(DEFAULT_MAX_HOURS..=MAX_HOURS_CEILING).contains(&max_hours) {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!(
                "maxHours must be between {} and {}",
                DEFAULT_MAX_HOURS, MAX_HOURS_CEILING
            ),
            details: Some(json!({ "maxHours": max_hours })),
        });
    }
    Ok(max_hours)
}

/// Opens a fresh form, replacing any existing one. `maxHours` carries the
/// organization override for the hours ceiling.
fn handle_form_open(state: &mut AppState, req: &Request) -> Value {
    let max_hours = match parse_max_hours(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    state.form = Some(ServiceForm::new(max_hours));
    ok(
        &req.id,
        json!({
            "maxHours": max_hours,
            "totalRecords": 1,
            "maxRecords": MAX_TOTAL,
        }),
    )
}

/// Abandon the batch: back to one blank primary record. Any in-flight
/// response becomes stale and will be ignored on arrival.
fn handle_form_reset(state: &mut AppState, req: &Request) -> Value {
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    form.reset();
    ok(&req.id, json!({ "totalRecords": 1 }))
}

fn handle_form_get(state: &mut AppState, req: &Request) -> Value {
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    ok(&req.id, snapshot(form))
}

fn snapshot(form: &ServiceForm) -> Value {
    let phase = match form.phase {
        Phase::Editing => "editing",
        Phase::Submitting(_) => "submitting",
    };
    json!({
        "records": serde_json::to_value(&form.records).unwrap_or(Value::Null),
        "dateCompleted": form.date_completed,
        "description": form.description,
        "errors": serde_json::to_value(&form.errors).unwrap_or(Value::Null),
        "sharedErrors": serde_json::to_value(&form.shared_errors).unwrap_or(Value::Null),
        "batchErrors": form.batch_errors,
        "notFound": form.not_found,
        "phase": phase,
        "outcome": serde_json::to_value(&form.outcome).unwrap_or(Value::Null),
        "totalRecords": form.total_records(),
        "maxRecords": MAX_TOTAL,
        "maxHours": form.max_hours,
    })
}
