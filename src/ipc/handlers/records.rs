use chrono::Local;
use serde_json::{json, Value};

use crate::form::{RecordField, ServiceForm, SharedField, MAX_TOTAL};
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

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

fn get_required_str(params: &Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: None,
        })
}

fn get_required_index(params: &Value) -> Result<usize, HandlerErr> {
    params
        .get("index")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: "missing params.index".to_string(),
            details: None,
        })
}

fn parse_record_field(raw: &str) -> Result<RecordField, HandlerErr> {
    match raw {
        "fullName" => Ok(RecordField::FullName),
        "hours" => Ok(RecordField::Hours),
        other => Err(HandlerErr {
            code: "bad_params",
            message: "field must be one of: fullName, hours".to_string(),
            details: Some(json!({ "field": other })),
        }),
    }
}

fn parse_shared_field(raw: &str) -> Result<SharedField, HandlerErr> {
    match raw {
        "dateCompleted" => Ok(SharedField::DateCompleted),
        "description" => Ok(SharedField::Description),
        other => Err(HandlerErr {
            code: "bad_params",
            message: "field must be one of: dateCompleted, description".to_string(),
            details: Some(json!({ "field": other })),
        }),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "record.add" => Some(handle_record_add(state, req)),
        "record.remove" => Some(handle_record_remove(state, req)),
        "record.update" => Some(handle_record_update(state, req)),
        "form.setShared" => Some(handle_set_shared(state, req)),
        "form.validate" => Some(handle_validate(state, req)),
        _ => None,
    }
}

fn handle_record_add(state: &mut AppState, req: &Request) -> Value {
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    let added = form.add_record();
    ok(
        &req.id,
        json!({
            "added": added,
            "totalRecords": form.total_records(),
            "maxRecords": MAX_TOTAL,
        }),
    )
}

fn handle_record_remove(state: &mut AppState, req: &Request) -> Value {
    let index = match get_required_index(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    if index == 0 {
        return err(
            &req.id,
            "bad_params",
            "the primary record cannot be removed",
            None,
        );
    }
    if !form.remove_record(index) {
        return err(
            &req.id,
            "bad_params",
            "record index out of range",
            Some(json!({ "index": index, "totalRecords": form.total_records() })),
        );
    }
    ok(
        &req.id,
        json!({
            "removed": true,
            "totalRecords": form.total_records(),
        }),
    )
}

fn handle_record_update(state: &mut AppState, req: &Request) -> Value {
    let index = match get_required_index(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let field = match get_required_str(&req.params, "field").and_then(|f| parse_record_field(&f)) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let value = match get_required_str(&req.params, "value") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    if !form.update_field(index, field, &value) {
        return err(
            &req.id,
            "bad_params",
            "record index out of range",
            Some(json!({ "index": index, "totalRecords": form.total_records() })),
        );
    }
    ok(&req.id, json!({ "updated": true }))
}

fn handle_set_shared(state: &mut AppState, req: &Request) -> Value {
    let field = match get_required_str(&req.params, "field").and_then(|f| parse_shared_field(&f)) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let value = match get_required_str(&req.params, "value") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    form.set_shared(field, &value);
    ok(&req.id, json!({ "updated": true }))
}

/// Explicit full revalidation without submitting.
fn handle_validate(state: &mut AppState, req: &Request) -> Value {
    let form = match require_form(state) {
        Ok(f) => f,
        Err(e) => return e.response(&req.id),
    };
    let today = Local::now().date_naive();
    let has_errors = form.validate_all(today);
    ok(
        &req.id,
        json!({
            "hasErrors": has_errors,
            "firstError": serde_json::to_value(form.first_error()).unwrap_or(Value::Null),
        }),
    )
}
