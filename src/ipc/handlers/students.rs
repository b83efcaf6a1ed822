use crate::attendance::{filter_mode, filter_roster, FilterMode, Student};
use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn require_class(conn: &Connection, class_id: &str) -> Result<(), HandlerErr> {
    if !db::class_exists(conn, class_id).map_err(HandlerErr::db_query)? {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    Ok(())
}

fn students_list(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    require_class(conn, &class_id)?;
    let roster = db::list_roster(conn, &class_id).map_err(HandlerErr::db_query)?;
    Ok(json!({ "students": roster }))
}

fn students_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let roll_number = get_required_str(params, "rollNumber")?.trim().to_string();
    let display_name = get_required_str(params, "displayName")?.trim().to_string();
    if roll_number.is_empty() || display_name.is_empty() {
        return Err(HandlerErr::bad_params(
            "rollNumber/displayName must not be empty",
        ));
    }
    require_class(conn, &class_id)?;
    if db::roll_number_taken(conn, &class_id, &roll_number).map_err(HandlerErr::db_query)? {
        return Err(HandlerErr {
            code: "duplicate",
            message: format!("roll number {} already exists in class", roll_number),
            details: Some(json!({ "rollNumber": roll_number })),
        });
    }

    let sort_order = db::next_sort_order(conn, &class_id).map_err(HandlerErr::db_query)?;
    let student = Student {
        id: Uuid::new_v4().to_string(),
        roll_number,
        display_name,
    };
    conn.execute(
        "INSERT INTO students(id, class_id, roll_number, display_name, sort_order)
         VALUES(?, ?, ?, ?, ?)",
        (
            &student.id,
            &class_id,
            &student.roll_number,
            &student.display_name,
            sort_order,
        ),
    )
    .map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "students" })),
    })?;

    Ok(json!({ "studentId": student.id, "student": student }))
}

fn students_filter(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let query = params
        .get("query")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    require_class(conn, &class_id)?;
    let roster = db::list_roster(conn, &class_id).map_err(HandlerErr::db_query)?;
    let mode = match filter_mode(&query) {
        FilterMode::RollSuffix => "rollSuffix",
        FilterMode::Substring => "substring",
    };
    let students = filter_roster(&roster, &query);
    Ok(json!({ "mode": mode, "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(with_conn(state, req, students_list)),
        "students.create" => Some(with_conn(state, req, students_create)),
        "students.filter" => Some(with_conn(state, req, students_filter)),
        _ => None,
    }
}
