use chrono::Local;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::form::ServiceForm;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::submit::{apply_response, begin_submit, Applied, SubmitStart};

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
        "form.submit" => Some(handle_submit(state, req)),
        "form.applyResponse" => Some(handle_apply_response(state, req)),
        "form.dismissOutcome" => Some(handle_dismiss_outcome(state, req)),
        _ => None,
    }
}

fn handle_submit(state: &mut AppState, req: &Request) -> Value {
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    let today = Local::now().date_naive();
    match begin_submit(form, today) {
        SubmitStart::InFlight => ok(&req.id, json!({ "status": "inFlight" })),
        SubmitStart::Blocked { first } => ok(
            &req.id,
            json!({
                "status": "blocked",
                "firstError": serde_json::to_value(first).unwrap_or(Value::Null),
            }),
        ),
        SubmitStart::Request {
            generation,
            endpoint,
            payload,
        } => ok(
            &req.id,
            json!({
                "status": "ready",
                "generation": generation.to_string(),
                "endpoint": endpoint.name(),
                "path": endpoint.path(),
                "payload": payload,
            }),
        ),
    }
}

/// Network completion event from the host. `generation` must echo the token
/// from the matching `form.submit`; anything else is reported as stale and
/// leaves the form untouched.
fn handle_apply_response(state: &mut AppState, req: &Request) -> Value {
    let generation = match req
        .params
        .get("generation")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
    {
        Some(g) => g,
        None => return err(&req.id, "bad_params", "missing or invalid params.generation", None),
    };
    let Some(status) = req.params.get("status").and_then(|v| v.as_u64()) else {
        return err(&req.id, "bad_params", "missing params.status", None);
    };
    if status > 999 {
        return err(
            &req.id,
            "bad_params",
            "status must be an HTTP status code",
            Some(json!({ "status": status })),
        );
    }
    let body = req.params.get("body").cloned().unwrap_or(Value::Null);

    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };

    match apply_response(form, generation, status as u16, &body) {
        Applied::Stale => ok(&req.id, json!({ "applied": false, "reason": "stale" })),
        Applied::Outcome(outcome) => ok(
            &req.id,
            json!({
                "applied": true,
                "outcome": serde_json::to_value(outcome).unwrap_or(Value::Null),
            }),
        ),
    }
}

fn handle_dismiss_outcome(state: &mut AppState, req: &Request) -> Value {
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    form.outcome = None;
    ok(&req.id, json!({ "dismissed": true }))
}
