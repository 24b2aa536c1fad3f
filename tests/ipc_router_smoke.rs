use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_servicediaryd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn servicediaryd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

#[test]
fn health_reports_version_and_form_state() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(true));
    let result = resp.get("result").expect("result");
    assert!(result.get("version").and_then(|v| v.as_str()).is_some());
    assert_eq!(result.get("formOpen").and_then(|v| v.as_bool()), Some(false));

    let _ = request(&mut stdin, &mut reader, "2", "form.open", json!({}));
    let resp = request(&mut stdin, &mut reader, "3", "health", json!({}));
    let result = resp.get("result").expect("result");
    assert_eq!(result.get("formOpen").and_then(|v| v.as_bool()), Some(true));
}

#[test]
fn unknown_method_is_not_implemented() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(&mut stdin, &mut reader, "1", "form.fly", json!({}));
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("not_implemented")
    );
}

#[test]
fn form_methods_require_an_open_form() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    for (id, method) in [
        ("1", "form.get"),
        ("2", "record.add"),
        ("3", "form.validate"),
        ("4", "form.submit"),
    ] {
        let resp = request(&mut stdin, &mut reader, id, method, json!({}));
        assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(
            resp.pointer("/error/code").and_then(|v| v.as_str()),
            Some("no_form"),
            "{} should require an open form",
            method
        );
    }
}

#[test]
fn form_open_rejects_out_of_range_max_hours() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let resp = request(
        &mut stdin,
        &mut reader,
        "1",
        "form.open",
        json!({ "maxHours": 5 }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_params")
    );

    let resp = request(
        &mut stdin,
        &mut reader,
        "2",
        "form.open",
        json!({ "maxHours": 50 }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        resp.pointer("/result/maxHours").and_then(|v| v.as_f64()),
        Some(50.0)
    );
}
