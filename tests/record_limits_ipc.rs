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

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

#[test]
fn add_record_caps_at_fifty_total() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "open", "form.open", json!({}));

    for i in 0..49 {
        let result = request_ok(
            &mut stdin,
            &mut reader,
            &format!("add-{}", i),
            "record.add",
            json!({}),
        );
        assert_eq!(result.get("added").and_then(|v| v.as_bool()), Some(true));
    }

    let result = request_ok(&mut stdin, &mut reader, "add-cap", "record.add", json!({}));
    assert_eq!(result.get("added").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(result.get("totalRecords").and_then(|v| v.as_u64()), Some(50));
}

#[test]
fn primary_record_remove_is_rejected() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "1", "form.open", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "2", "record.add", json!({}));

    let resp = request(
        &mut stdin,
        &mut reader,
        "3",
        "record.remove",
        json!({ "index": 0 }),
    );
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        resp.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_params")
    );

    let snap = request_ok(&mut stdin, &mut reader, "4", "form.get", json!({}));
    assert_eq!(snap.get("totalRecords").and_then(|v| v.as_u64()), Some(2));
}

#[test]
fn remove_shifts_later_error_slots_down() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(&mut stdin, &mut reader, "1", "form.open", json!({}));
    // Three records: valid, bad name, bad hours.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "record.update",
        json!({ "index": 0, "field": "fullName", "value": "John Smith" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "record.update",
        json!({ "index": 0, "field": "hours", "value": "2" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "4", "record.add", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "record.update",
        json!({ "index": 1, "field": "fullName", "value": "Mary" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "record.update",
        json!({ "index": 1, "field": "hours", "value": "1.5" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "7", "record.add", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "record.update",
        json!({ "index": 2, "field": "fullName", "value": "Peta Jones" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "record.update",
        json!({ "index": 2, "field": "hours", "value": "2.25" }),
    );

    let _ = request_ok(&mut stdin, &mut reader, "10", "form.validate", json!({}));
    let snap = request_ok(&mut stdin, &mut reader, "11", "form.get", json!({}));
    assert!(snap.pointer("/errors/1/fullName").and_then(|v| v.as_str()).is_some());
    assert!(snap.pointer("/errors/2/hours").and_then(|v| v.as_str()).is_some());

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "record.remove",
        json!({ "index": 1 }),
    );
    assert_eq!(removed.get("totalRecords").and_then(|v| v.as_u64()), Some(2));

    // The error slot that was at index 2 follows its record to index 1.
    let snap = request_ok(&mut stdin, &mut reader, "13", "form.get", json!({}));
    assert_eq!(
        snap.pointer("/records/1/fullName").and_then(|v| v.as_str()),
        Some("Peta Jones")
    );
    assert_eq!(
        snap.pointer("/errors/1/hours").and_then(|v| v.as_str()),
        Some("Must be in half hour increments")
    );
    assert!(snap
        .pointer("/errors/1/fullName")
        .map(|v| v.is_null())
        .unwrap_or(false));
}
