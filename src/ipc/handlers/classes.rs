use crate::db;
use crate::ipc::error::HandlerErr;
use crate::ipc::helpers::{get_required_str, with_conn};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn classes_list(
    conn: &Connection,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let classes = db::list_classes(conn).map_err(HandlerErr::db_query)?;
    Ok(json!({ "classes": classes }))
}

fn classes_create(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::bad_params("name must not be empty"));
    }
    let class_id = Uuid::new_v4().to_string();
    db::insert_class(conn, &class_id, &name).map_err(|e| HandlerErr {
        code: "db_insert_failed",
        message: e.to_string(),
        details: Some(json!({ "table": "classes" })),
    })?;
    tracing::info!(%class_id, %name, "class created");
    Ok(json!({ "classId": class_id, "name": name }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(with_conn(state, req, classes_list)),
        "classes.create" => Some(with_conn(state, req, classes_create)),
        _ => None,
    }
}
