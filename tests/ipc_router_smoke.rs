use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

const TODAY: &str = "2026-10-19";

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar(today: &str) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_attendd");
    let mut child = Command::new(exe)
        .env("ATTENDD_TODAY", today)
        .env_remove("ATTENDD_WORKSPACE")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendd");
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
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("attendd-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(TODAY);

    let early = request(
        &mut stdin,
        &mut reader,
        "0",
        "attendance.open",
        json!({ "classId": "x" }),
    );
    assert_eq!(error_code(&early), "no_workspace");

    let health = request_ok(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["today"], TODAY);
    assert!(health["workspacePath"].is_null());

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let class_id = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "classes.create",
        json!({ "name": "Smoke Class" }),
    )["classId"]
        .as_str()
        .expect("classId")
        .to_string();
    let student_id = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "students.create",
        json!({ "classId": class_id, "rollNumber": "SM01", "displayName": "Smoke" }),
    )["studentId"]
        .as_str()
        .expect("studentId")
        .to_string();

    let no_session = request(&mut stdin, &mut reader, "5", "attendance.get", json!({}));
    assert_eq!(error_code(&no_session), "no_session");

    let calls = vec![
        ("6", "classes.list", json!({})),
        ("7", "students.list", json!({ "classId": class_id })),
        ("8", "students.filter", json!({ "classId": class_id, "query": "01" })),
        ("9", "attendance.open", json!({ "classId": class_id })),
        ("10", "attendance.get", json!({})),
        (
            "11",
            "attendance.setStatus",
            json!({ "studentId": student_id, "status": "present" }),
        ),
        ("12", "attendance.markAll", json!({ "present": true })),
        (
            "13",
            "attendance.applyBulk",
            json!({ "tokens": ["01"], "status": "od" }),
        ),
        ("14", "attendance.setCoverage", json!({ "topic": "Smoke" })),
        ("15", "attendance.summary", json!({ "status": "od" })),
        ("16", "attendance.save", json!({})),
        ("17", "attendance.reassign", json!({})),
        ("18", "attendance.history", json!({ "classId": class_id })),
        ("19", "attendance.studentReport", json!({ "classId": class_id })),
    ];
    for (id, method, params) in calls {
        let _ = request_ok(&mut stdin, &mut reader, id, method, params);
    }

    let classes = request_ok(&mut stdin, &mut reader, "20", "classes.list", json!({}));
    assert_eq!(classes["classes"][0]["studentCount"], 1);
    assert_eq!(classes["classes"][0]["savedSessionCount"], 1);

    let unknown = request(&mut stdin, &mut reader, "21", "grid.get", json!({}));
    assert_eq!(error_code(&unknown), "not_implemented");

    writeln!(stdin, "{{not json").expect("write garbage");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read bad_json reply");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse");
    assert_eq!(error_code(&value), "bad_json");

    drop(stdin);
    let _ = child.wait();
}
