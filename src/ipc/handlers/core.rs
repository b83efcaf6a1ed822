use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::notify::{NoticeKind, NotificationSink};
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "today": state.config.today().to_string(),
        }),
    )
}

/// Opens (or creates) the workspace database and drops any open session.
/// Returns true when that session held unsaved edits.
pub fn select_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<bool> {
    let conn = db::open_db(path)?;
    let discarded = state
        .open
        .take()
        .filter(|o| o.dirty && !o.session.locked())
        .map(|o| o.session.date);
    if let Some(date) = discarded {
        tracing::warn!(%date, "unsaved attendance discarded on workspace switch");
        state.notices.notify(
            NoticeKind::Warning,
            format!("unsaved attendance for {} was discarded", date),
        );
    }
    state.workspace = Some(path.to_path_buf());
    state.db = Some(conn);
    tracing::info!(workspace = %path.display(), "workspace selected");
    Ok(discarded.is_some())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match select_workspace(state, &path) {
        Ok(discarded) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "discardedUnsavedEdits": discarded,
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
