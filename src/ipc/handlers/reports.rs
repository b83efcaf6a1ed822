use crate::attendance::{
    self as engine, parse_date_key, AttendanceSession, LockState, SessionRecord,
};
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_optional_date, get_required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn parse_record(raw: &str) -> Option<SessionRecord> {
    serde_json::from_str(raw).ok()
}

fn attendance_history(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !db::class_exists(conn, &class_id).map_err(HandlerErr::db_query)? {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    let roster = db::list_roster(conn, &class_id).map_err(HandlerErr::db_query)?;
    let rows = db::list_saved_sessions(conn, &class_id).map_err(HandlerErr::db_query)?;

    let sessions: Vec<serde_json::Value> = rows
        .iter()
        .map(|row| {
            let parsed = parse_date_key(&row.date).zip(parse_record(&row.record));
            let Some((date, record)) = parsed else {
                return json!({
                    "date": row.date,
                    "savedAt": row.saved_at,
                    "corrupt": true,
                });
            };
            let session = AttendanceSession {
                date,
                marks: record.marks,
                coverage: record.coverage,
                lock: LockState::Frozen,
            };
            json!({
                "date": row.date,
                "savedAt": row.saved_at,
                "corrupt": false,
                "counts": engine::counts(&session, &roster),
                "coverage": session.coverage,
            })
        })
        .collect();

    Ok(json!({ "sessions": sessions }))
}

fn attendance_student_report(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let from = get_optional_date(params, "from")?;
    let to = get_optional_date(params, "to")?;
    if !db::class_exists(conn, &class_id).map_err(HandlerErr::db_query)? {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    let roster = db::list_roster(conn, &class_id).map_err(HandlerErr::db_query)?;
    let rows = db::list_saved_sessions(conn, &class_id).map_err(HandlerErr::db_query)?;

    let mut skipped = 0usize;
    let records: Vec<SessionRecord> = rows
        .iter()
        .filter(|row| {
            parse_date_key(&row.date).is_some_and(|d| engine::in_range(d, from, to))
        })
        .filter_map(|row| {
            let rec = parse_record(&row.record);
            if rec.is_none() {
                skipped += 1;
                tracing::warn!(date = %row.date, "skipping unreadable attendance record in report");
            }
            rec
        })
        .collect();

    Ok(json!({
        "sessionCount": records.len(),
        "skippedCorrupt": skipped,
        "students": engine::student_totals(&roster, &records),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.history" => Some(with_conn(state, req, attendance_history)),
        "attendance.studentReport" => Some(with_conn(state, req, attendance_student_report)),
        _ => None,
    }
}
