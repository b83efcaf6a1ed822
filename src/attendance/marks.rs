use chrono::NaiveDate;
use std::collections::HashSet;

use super::error::{AttendanceError, ValidationError};
use super::lock::ensure_editable;
use super::model::{AttendanceSession, AttendanceStatus, Coverage, Student};

pub fn set_status(
    session: &mut AttendanceSession,
    roster: &[Student],
    student_id: &str,
    status: AttendanceStatus,
    today: NaiveDate,
) -> Result<(), AttendanceError> {
    ensure_editable(session, today)?;
    if !roster.iter().any(|s| s.id == student_id) {
        return Err(ValidationError::UnknownStudent(student_id.to_string()).into());
    }
    if status.is_set() {
        session.marks.insert(student_id.to_string(), status);
    } else {
        session.marks.remove(student_id);
    }
    Ok(())
}

/// `true` marks the whole roster present. `false` clears every mark, including
/// ones entered before the roster was marked present.
pub fn mark_all(
    session: &mut AttendanceSession,
    roster: &[Student],
    present: bool,
    today: NaiveDate,
) -> Result<(), AttendanceError> {
    ensure_editable(session, today)?;
    session.marks.clear();
    if present {
        for s in roster {
            session.marks.insert(s.id.clone(), AttendanceStatus::Present);
        }
    }
    Ok(())
}

pub fn set_coverage(
    session: &mut AttendanceSession,
    coverage: Coverage,
    today: NaiveDate,
) -> Result<(), AttendanceError> {
    ensure_editable(session, today)?;
    session.coverage = coverage.trimmed();
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOutcome {
    pub matched: usize,
    /// Unmatched students whose absent/leave/od mark was replaced by present.
    pub overwritten: usize,
}

/// Splits free-form UI input such as `"05, 18 21"` into tokens.
pub fn parse_token_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn is_two_digit_token(token: &str) -> bool {
    token.len() == 2 && token.bytes().all(|b| b.is_ascii_digit())
}

fn roll_suffix(roll_number: &str) -> Option<&str> {
    let t = roll_number.trim_end();
    t.len().checked_sub(2).and_then(|start| t.get(start..))
}

/// Students whose roll number ends in one of `tokens` get `status`; everyone
/// else in the roster is reset to present. Validation happens before any
/// mark is touched.
pub fn apply_bulk(
    session: &mut AttendanceSession,
    roster: &[Student],
    tokens: &[String],
    status: AttendanceStatus,
    today: NaiveDate,
) -> Result<BulkOutcome, AttendanceError> {
    ensure_editable(session, today)?;
    if tokens.is_empty() {
        return Err(ValidationError::NoTokens.into());
    }
    if !status.is_set() {
        return Err(ValidationError::NoStatus.into());
    }
    if let Some(bad) = tokens.iter().find(|t| !is_two_digit_token(t)) {
        return Err(ValidationError::MalformedToken(bad.clone()).into());
    }

    let wanted: HashSet<&str> = tokens.iter().map(|t| t.as_str()).collect();
    let matched: HashSet<&str> = roster
        .iter()
        .filter(|s| roll_suffix(&s.roll_number).is_some_and(|sfx| wanted.contains(sfx)))
        .map(|s| s.id.as_str())
        .collect();
    if matched.is_empty() {
        return Err(ValidationError::NoMatchingStudents.into());
    }

    let mut overwritten = 0;
    for s in roster {
        if matched.contains(s.id.as_str()) {
            session.marks.insert(s.id.clone(), status);
            continue;
        }
        let prev = session
            .marks
            .insert(s.id.clone(), AttendanceStatus::Present)
            .unwrap_or_default();
        if prev.is_set() && prev != AttendanceStatus::Present {
            overwritten += 1;
        }
    }

    Ok(BulkOutcome {
        matched: matched.len(),
        overwritten,
    })
}
