use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

use super::error::AttendanceError;
use super::model::{AttendanceSession, SessionRecord, Student};
use super::store::SessionStore;

/// Per-date lock state. Only `OpenToday` accepts mutations.
///
/// ```text
///  no record, date != today --load--> FrozenEmpty
///  no record, date == today --load--> OpenToday
///  OpenToday  --save-->     SavedToday
///  SavedToday --reassign--> OpenToday
///  record,    date != today --load--> Frozen
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LockState {
    OpenToday,
    SavedToday,
    Frozen,
    FrozenEmpty,
}

impl LockState {
    pub fn on_load(has_record: bool, date: NaiveDate, today: NaiveDate) -> Self {
        match (has_record, date == today) {
            (true, true) => LockState::SavedToday,
            (true, false) => LockState::Frozen,
            (false, true) => LockState::OpenToday,
            (false, false) => LockState::FrozenEmpty,
        }
    }

    pub fn is_locked(self) -> bool {
        self != LockState::OpenToday
    }

    /// A today-state left behind once the clock has moved past `date`.
    pub fn is_stale(self, date: NaiveDate, today: NaiveDate) -> bool {
        date != today && matches!(self, LockState::OpenToday | LockState::SavedToday)
    }
}

#[derive(Debug)]
pub struct LoadOutcome {
    pub session: AttendanceSession,
    /// Set when a stored record existed but could not be parsed; the session
    /// was rebuilt as if no record existed.
    pub recovered: Option<AttendanceError>,
}

pub fn load_session<S: SessionStore + ?Sized>(
    store: &S,
    roster: &[Student],
    date: NaiveDate,
    today: NaiveDate,
) -> Result<LoadOutcome, AttendanceError> {
    let Some(raw) = store.get(date)? else {
        return Ok(LoadOutcome {
            session: AttendanceSession::empty(date, LockState::on_load(false, date, today)),
            recovered: None,
        });
    };

    let record: SessionRecord = match serde_json::from_str(&raw) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%date, error = %e, "discarding unreadable attendance record");
            return Ok(LoadOutcome {
                session: AttendanceSession::empty(date, LockState::on_load(false, date, today)),
                recovered: Some(AttendanceError::CorruptRecord {
                    date,
                    reason: e.to_string(),
                }),
            });
        }
    };

    let known: HashSet<&str> = roster.iter().map(|s| s.id.as_str()).collect();
    let mut marks = record.marks;
    let before = marks.len();
    marks.retain(|id, status| known.contains(id.as_str()) && status.is_set());
    if marks.len() != before {
        tracing::debug!(%date, dropped = before - marks.len(), "ignored marks outside roster");
    }

    Ok(LoadOutcome {
        session: AttendanceSession {
            date,
            marks,
            coverage: record.coverage,
            lock: LockState::on_load(true, date, today),
        },
        recovered: None,
    })
}

fn ensure_unlocked(session: &AttendanceSession) -> Result<(), AttendanceError> {
    if session.locked() {
        return Err(AttendanceError::LockedSession { date: session.date });
    }
    Ok(())
}

fn ensure_today(session: &AttendanceSession, today: NaiveDate) -> Result<(), AttendanceError> {
    if session.date != today {
        return Err(AttendanceError::NotToday {
            date: session.date,
            today,
        });
    }
    Ok(())
}

/// Marks and coverage change only on an unlocked session dated today.
pub fn ensure_editable(
    session: &AttendanceSession,
    today: NaiveDate,
) -> Result<(), AttendanceError> {
    ensure_unlocked(session)?;
    ensure_today(session, today)
}

/// Persists marks and coverage, then locks. A failed write leaves the session
/// unlocked.
pub fn save<S: SessionStore + ?Sized>(
    store: &mut S,
    session: &mut AttendanceSession,
    today: NaiveDate,
) -> Result<(), AttendanceError> {
    ensure_today(session, today)?;
    ensure_unlocked(session)?;

    let raw = serde_json::to_string(&session.to_record())
        .map_err(|e| AttendanceError::Persistence(e.to_string()))?;
    store.set(session.date, &raw)?;
    session.lock = LockState::SavedToday;
    tracing::info!(date = %session.date, marks = session.marks.len(), "attendance saved");
    Ok(())
}

/// Reopens today's session for corrections. Marks are kept.
pub fn reassign(session: &mut AttendanceSession, today: NaiveDate) -> Result<(), AttendanceError> {
    ensure_today(session, today)?;
    if session.lock != LockState::OpenToday {
        session.lock = LockState::OpenToday;
        tracing::info!(date = %session.date, "attendance reopened for reassignment");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::model::AttendanceStatus;
    use crate::attendance::store::date_key;
    use crate::attendance::store::memory::MemoryStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn roster() -> Vec<Student> {
        ["s1", "s2", "s3"]
            .iter()
            .enumerate()
            .map(|(i, id)| Student {
                id: id.to_string(),
                roll_number: format!("CSE0{:02}", i + 1),
                display_name: format!("Student {}", i + 1),
            })
            .collect()
    }

    #[test]
    fn lock_state_covers_all_four_starts() {
        let today = d(2026, 10, 19);
        assert_eq!(LockState::on_load(false, today, today), LockState::OpenToday);
        assert_eq!(LockState::on_load(true, today, today), LockState::SavedToday);
        assert_eq!(LockState::on_load(true, d(2026, 10, 1), today), LockState::Frozen);
        assert_eq!(
            LockState::on_load(false, d(2026, 10, 1), today),
            LockState::FrozenEmpty
        );
        assert!(LockState::FrozenEmpty.is_locked());
        assert!(!LockState::OpenToday.is_locked());
    }

    #[test]
    fn today_states_go_stale_after_midnight() {
        let day = d(2026, 10, 19);
        let next = d(2026, 10, 20);
        assert!(!LockState::OpenToday.is_stale(day, day));
        assert!(LockState::OpenToday.is_stale(day, next));
        assert!(LockState::SavedToday.is_stale(day, next));
        assert!(!LockState::Frozen.is_stale(day, next));
        assert!(!LockState::FrozenEmpty.is_stale(day, next));
    }

    #[test]
    fn open_session_not_editable_once_day_has_passed() {
        let day = d(2026, 10, 19);
        let s = AttendanceSession::empty(day, LockState::OpenToday);
        assert!(ensure_editable(&s, day).is_ok());
        assert!(matches!(
            ensure_editable(&s, d(2026, 10, 20)),
            Err(AttendanceError::NotToday { .. })
        ));
    }

    #[test]
    fn past_date_without_record_loads_locked_and_empty() {
        let store = MemoryStore::default();
        let today = d(2026, 10, 19);
        let out = load_session(&store, &roster(), d(2026, 10, 18), today).expect("load");
        assert!(out.session.locked());
        assert!(out.session.marks.is_empty());
        assert!(out.recovered.is_none());
    }

    #[test]
    fn future_date_without_record_is_locked() {
        let store = MemoryStore::default();
        let today = d(2026, 10, 19);
        let out = load_session(&store, &roster(), d(2026, 10, 20), today).expect("load");
        assert_eq!(out.session.lock, LockState::FrozenEmpty);
    }

    #[test]
    fn save_then_load_round_trips_marks_and_locks() {
        let mut store = MemoryStore::default();
        let today = d(2026, 10, 19);
        let roster = roster();
        let mut s = load_session(&store, &roster, today, today).expect("load").session;
        assert!(!s.locked());
        s.marks.insert("s1".into(), AttendanceStatus::Absent);
        s.marks.insert("s3".into(), AttendanceStatus::OnDuty);
        s.coverage.topic = "Graphs".into();

        save(&mut store, &mut s, today).expect("save");
        assert!(s.locked());

        let reloaded = load_session(&store, &roster, today, today).expect("reload").session;
        assert_eq!(reloaded.marks, s.marks);
        assert_eq!(reloaded.coverage.topic, "Graphs");
        assert_eq!(reloaded.lock, LockState::SavedToday);
    }

    #[test]
    fn existing_record_is_locked_even_for_today() {
        let mut store = MemoryStore::default();
        let today = d(2026, 10, 19);
        store
            .records
            .insert(date_key(today), r#"{"marks":{}}"#.to_string());
        let s = load_session(&store, &roster(), today, today).expect("load").session;
        assert!(s.locked());
    }

    #[test]
    fn save_rejected_when_locked_or_not_today() {
        let mut store = MemoryStore::default();
        let today = d(2026, 10, 19);

        let mut past = AttendanceSession::empty(d(2026, 10, 18), LockState::FrozenEmpty);
        let e = save(&mut store, &mut past, today).unwrap_err();
        assert!(matches!(e, AttendanceError::NotToday { .. }));

        let mut saved = AttendanceSession::empty(today, LockState::SavedToday);
        let e = save(&mut store, &mut saved, today).unwrap_err();
        assert!(matches!(e, AttendanceError::LockedSession { .. }));
        assert!(store.records.is_empty());
    }

    #[test]
    fn failed_write_keeps_session_unlocked() {
        let mut store = MemoryStore {
            fail_writes: true,
            ..Default::default()
        };
        let today = d(2026, 10, 19);
        let mut s = AttendanceSession::empty(today, LockState::OpenToday);
        s.marks.insert("s1".into(), AttendanceStatus::Present);
        let e = save(&mut store, &mut s, today).unwrap_err();
        assert!(matches!(e, AttendanceError::Persistence(_)));
        assert!(!s.locked());
    }

    #[test]
    fn reassign_only_for_today_and_keeps_marks() {
        let today = d(2026, 10, 19);
        let mut s = AttendanceSession::empty(today, LockState::SavedToday);
        s.marks.insert("s2".into(), AttendanceStatus::Leave);
        reassign(&mut s, today).expect("reassign");
        assert_eq!(s.lock, LockState::OpenToday);
        assert_eq!(s.status_of("s2"), AttendanceStatus::Leave);

        let mut past = AttendanceSession::empty(d(2026, 10, 1), LockState::Frozen);
        assert!(matches!(
            reassign(&mut past, today),
            Err(AttendanceError::NotToday { .. })
        ));
        assert_eq!(past.lock, LockState::Frozen);
    }

    #[test]
    fn corrupt_record_falls_back_to_fresh_session() {
        let mut store = MemoryStore::default();
        let today = d(2026, 10, 19);
        store.records.insert(date_key(today), "{not json".to_string());
        let out = load_session(&store, &roster(), today, today).expect("load");
        assert!(matches!(
            out.recovered,
            Some(AttendanceError::CorruptRecord { .. })
        ));
        assert_eq!(out.session.lock, LockState::OpenToday);
        assert!(out.session.marks.is_empty());
    }

    #[test]
    fn unknown_student_ids_dropped_on_load() {
        let mut store = MemoryStore::default();
        let today = d(2026, 10, 19);
        store.records.insert(
            date_key(today),
            r#"{"marks":{"s1":"present","ghost":"absent"}}"#.to_string(),
        );
        let s = load_session(&store, &roster(), today, today).expect("load").session;
        assert_eq!(s.marks.len(), 1);
        assert_eq!(s.status_of("ghost"), AttendanceStatus::Unset);
    }

    #[test]
    fn read_failure_propagates() {
        let store = MemoryStore {
            fail_reads: true,
            ..Default::default()
        };
        let today = d(2026, 10, 19);
        assert!(matches!(
            load_session(&store, &roster(), today, today),
            Err(AttendanceError::Persistence(_))
        ));
    }
}
