use chrono::NaiveDate;
use rusqlite::Connection;

use crate::attendance::{parse_date_key, AttendanceStatus};
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::types::{AppState, Request};

pub type ConnHandler =
    fn(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>;

/// Runs a handler that only needs the workspace connection.
pub fn with_conn(state: &mut AppState, req: &Request, f: ConnHandler) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn get_optional_date(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<NaiveDate>, HandlerErr> {
    let Some(raw) = get_optional_str(params, key) else {
        return Ok(None);
    };
    parse_date_key(&raw)
        .map(Some)
        .ok_or_else(|| HandlerErr::bad_params(format!("{} must be YYYY-MM-DD", key)))
}

pub fn get_status(params: &serde_json::Value, key: &str) -> Result<AttendanceStatus, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(AttendanceStatus::Unset);
    };
    if v.is_null() {
        return Ok(AttendanceStatus::Unset);
    }
    let Some(s) = v.as_str() else {
        return Err(HandlerErr::bad_params(format!("{} must be string or null", key)));
    };
    AttendanceStatus::parse(s).ok_or_else(|| {
        HandlerErr::bad_params(format!("{} must be present, absent, leave or od", key))
    })
}

/// Accepts either `["05", "18"]` or `"05, 18"`.
pub fn get_tokens(params: &serde_json::Value, key: &str) -> Result<Vec<String>, HandlerErr> {
    match params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(Vec::new()),
        Some(serde_json::Value::String(s)) => Ok(crate::attendance::parse_token_list(s)),
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| HandlerErr::bad_params(format!("{} must hold strings", key)))
            })
            .filter(|r| !matches!(r, Ok(s) if s.is_empty()))
            .collect(),
        Some(_) => Err(HandlerErr::bad_params(format!(
            "{} must be a string or an array of strings",
            key
        ))),
    }
}
