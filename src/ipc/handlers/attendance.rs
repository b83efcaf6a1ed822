use crate::attendance::{self as engine, AttendanceStatus, Coverage};
use crate::db::{self, SqliteSessionStore};
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_optional_date, get_required_str, get_status, get_tokens};
use crate::ipc::types::{AppState, OpenSession, Request};
use crate::notify::{NoticeKind, NotificationSink};
use chrono::NaiveDate;
use serde_json::json;

fn no_workspace() -> HandlerErr {
    HandlerErr::new("no_workspace", "select a workspace first")
}

fn current_mut(open: &mut Option<OpenSession>) -> Result<&mut OpenSession, HandlerErr> {
    open.as_mut()
        .ok_or_else(|| HandlerErr::new("no_session", "open an attendance date first"))
}

fn session_view(open: &OpenSession, today: NaiveDate) -> serde_json::Value {
    let s = &open.session;
    let rows: Vec<serde_json::Value> = open
        .roster
        .iter()
        .map(|st| {
            let status = s.status_of(&st.id);
            json!({
                "studentId": st.id,
                "rollNumber": st.roll_number,
                "displayName": st.display_name,
                "status": status.is_set().then(|| status.code()),
            })
        })
        .collect();
    json!({
        "classId": open.class_id,
        "date": s.date.to_string(),
        "today": today.to_string(),
        "locked": s.locked(),
        "lockState": s.lock,
        "dirty": open.dirty,
        "coverage": s.coverage,
        "rows": rows,
        "summary": engine::summarize(s, &open.roster),
    })
}

/// Reloads the open session once the clock has passed its date, so it comes
/// back frozen like any other past day.
fn roll_over_day(state: &mut AppState, today: NaiveDate) -> Result<(), HandlerErr> {
    let Some(open) = state.open.as_mut() else {
        return Ok(());
    };
    if !open.session.lock.is_stale(open.session.date, today) {
        return Ok(());
    }
    let Some(conn) = state.db.as_ref() else {
        return Err(no_workspace());
    };
    let date = open.session.date;
    let store = SqliteSessionStore::new(conn, &open.class_id);
    let loaded = engine::load_session(&store, &open.roster, date, today)?;
    if open.dirty && !open.session.locked() {
        tracing::warn!(%date, %today, "day ended with unsaved attendance");
        state.notices.notify(
            NoticeKind::Warning,
            format!("the day ended; unsaved attendance for {} was discarded", date),
        );
    }
    if let Some(e) = loaded.recovered {
        state.notices.notify(NoticeKind::Warning, e.to_string());
    }
    tracing::info!(%date, lock = ?loaded.session.lock, "attendance frozen at day change");
    open.session = loaded.session;
    open.dirty = false;
    Ok(())
}

fn attendance_open(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = state.config.today();
    let Some(conn) = state.db.as_ref() else {
        return Err(no_workspace());
    };
    let class_id = get_required_str(params, "classId")?;
    let date = get_optional_date(params, "date")?.unwrap_or(today);
    if !db::class_exists(conn, &class_id).map_err(HandlerErr::db_query)? {
        return Err(HandlerErr::new("not_found", "class not found"));
    }
    let roster = db::list_roster(conn, &class_id).map_err(HandlerErr::db_query)?;

    let store = SqliteSessionStore::new(conn, &class_id);
    let loaded = engine::load_session(&store, &roster, date, today)?;
    if let Some(e) = loaded.recovered {
        state.notices.notify(
            NoticeKind::Warning,
            format!("{}; starting a fresh session", e),
        );
    }

    // Switching dates drops unsaved edits without asking; report it instead.
    let discarded = state
        .open
        .as_ref()
        .filter(|o| o.dirty && !o.session.locked())
        .map(|o| o.session.date);
    if let Some(prev) = discarded {
        tracing::warn!(date = %prev, "unsaved attendance discarded on navigation");
        state.notices.notify(
            NoticeKind::Warning,
            format!("unsaved attendance for {} was discarded", prev),
        );
    }

    tracing::info!(%class_id, %date, lock = ?loaded.session.lock, "attendance opened");
    let open = OpenSession {
        class_id,
        roster,
        session: loaded.session,
        dirty: false,
    };
    let view = session_view(&open, today);
    state.open = Some(open);
    Ok(json!({
        "session": view,
        "discardedUnsavedEdits": discarded.is_some(),
    }))
}

fn attendance_get(
    state: &mut AppState,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = state.config.today();
    let open = current_mut(&mut state.open)?;
    Ok(json!({ "session": session_view(open, today) }))
}

fn attendance_set_status(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let status = get_status(params, "status")?;
    let today = state.config.today();
    let open = current_mut(&mut state.open)?;
    engine::set_status(&mut open.session, &open.roster, &student_id, status, today)?;
    open.dirty = true;
    Ok(json!({ "session": session_view(open, today) }))
}

fn attendance_mark_all(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let present = params
        .get("present")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params("missing present"))?;
    let today = state.config.today();
    let open = current_mut(&mut state.open)?;
    engine::mark_all(&mut open.session, &open.roster, present, today)?;
    open.dirty = true;
    Ok(json!({ "session": session_view(open, today) }))
}

fn attendance_apply_bulk(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let tokens = get_tokens(params, "tokens")?;
    let status = get_status(params, "status")?;
    let today = state.config.today();
    let open = current_mut(&mut state.open)?;
    let outcome = engine::apply_bulk(&mut open.session, &open.roster, &tokens, status, today)?;
    open.dirty = true;
    let view = session_view(open, today);

    state.notices.notify(
        NoticeKind::Success,
        format!("{} student(s) marked {}", outcome.matched, status.code()),
    );
    if outcome.overwritten > 0 {
        state.notices.notify(
            NoticeKind::Warning,
            format!(
                "{} earlier mark(s) outside the selection were reset to present",
                outcome.overwritten
            ),
        );
    }
    Ok(json!({
        "matchedCount": outcome.matched,
        "overwrittenCount": outcome.overwritten,
        "session": view,
    }))
}

fn attendance_set_coverage(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let field = |k: &str| {
        params
            .get(k)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    };
    let coverage = Coverage {
        semester: field("semester"),
        year: field("year"),
        department: field("department"),
        topic: field("topic"),
    };
    let today = state.config.today();
    let open = current_mut(&mut state.open)?;
    engine::set_coverage(&mut open.session, coverage, today)?;
    open.dirty = true;
    Ok(json!({ "session": session_view(open, today) }))
}

fn attendance_summary(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let status = get_status(params, "status")?;
    let open = current_mut(&mut state.open)?;
    let summary = engine::summarize(&open.session, &open.roster);
    let mut out = json!({
        "date": open.session.date.to_string(),
        "locked": open.session.locked(),
        "summary": summary,
    });
    if status != AttendanceStatus::Unset {
        out["status"] = json!(status.code());
        out["rollNumbers"] = json!(engine::roll_numbers_by_status(
            &open.session,
            &open.roster,
            status
        ));
    }
    Ok(out)
}

fn attendance_save(
    state: &mut AppState,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = state.config.today();
    let Some(conn) = state.db.as_ref() else {
        return Err(no_workspace());
    };
    let open = current_mut(&mut state.open)?;
    let mut store = SqliteSessionStore::new(conn, &open.class_id);
    engine::save(&mut store, &mut open.session, today)?;
    open.dirty = false;

    let c = engine::counts(&open.session, &open.roster);
    let view = session_view(open, today);
    state.notices.notify(
        NoticeKind::Success,
        format!(
            "attendance saved for {}: {} present, {} absent, {} leave, {} on duty",
            today, c.present, c.absent, c.leave, c.on_duty
        ),
    );
    Ok(json!({ "session": view }))
}

fn attendance_reassign(
    state: &mut AppState,
    _params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let today = state.config.today();
    let open = current_mut(&mut state.open)?;
    engine::reassign(&mut open.session, today)?;
    Ok(json!({ "session": session_view(open, today) }))
}

type Handler =
    fn(&mut AppState, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>;

fn run(state: &mut AppState, req: &Request, f: Handler) -> serde_json::Value {
    let today = state.config.today();
    let result = match req.method.as_str() {
        "attendance.open" => f(state, &req.params),
        _ => roll_over_day(state, today).and_then(|()| f(state, &req.params)),
    };
    match result {
        Ok(result) => ok(&req.id, result),
        Err(error) => {
            if matches!(
                error.code,
                "session_locked" | "not_today" | "validation_failed" | "persistence_failed"
            ) {
                state
                    .notices
                    .notify(NoticeKind::Error, error.message.clone());
            }
            error.response(&req.id)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let f: Handler = match req.method.as_str() {
        "attendance.open" => attendance_open,
        "attendance.get" => attendance_get,
        "attendance.setStatus" => attendance_set_status,
        "attendance.markAll" => attendance_mark_all,
        "attendance.applyBulk" => attendance_apply_bulk,
        "attendance.setCoverage" => attendance_set_coverage,
        "attendance.summary" => attendance_summary,
        "attendance.save" => attendance_save,
        "attendance.reassign" => attendance_reassign,
        _ => return None,
    };
    if state.db.is_none() {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    }
    Some(run(state, req, f))
}
