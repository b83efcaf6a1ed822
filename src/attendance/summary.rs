use serde::Serialize;

use super::model::{AttendanceSession, AttendanceStatus, Student};

pub const EMPTY_LISTING: &str = "-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub present: usize,
    pub absent: usize,
    pub leave: usize,
    pub on_duty: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: AttendanceStatus) {
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Leave => self.leave += 1,
            AttendanceStatus::OnDuty => self.on_duty += 1,
            AttendanceStatus::Unset => {}
        }
    }

    pub fn total(&self) -> usize {
        self.present + self.absent + self.leave + self.on_duty
    }
}

pub fn counts(session: &AttendanceSession, roster: &[Student]) -> StatusCounts {
    let mut out = StatusCounts::default();
    for s in roster {
        out.add(session.status_of(&s.id));
    }
    out
}

/// Roster-ordered, comma-joined roll numbers holding `status`, or `"-"`.
pub fn roll_numbers_by_status(
    session: &AttendanceSession,
    roster: &[Student],
    status: AttendanceStatus,
) -> String {
    let rolls: Vec<&str> = roster
        .iter()
        .filter(|s| session.status_of(&s.id) == status)
        .map(|s| s.roll_number.as_str())
        .collect();
    if rolls.is_empty() {
        EMPTY_LISTING.to_string()
    } else {
        rolls.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub counts: StatusCounts,
    pub unset: usize,
    pub roster_size: usize,
    pub present_rolls: String,
    pub absent_rolls: String,
    pub leave_rolls: String,
    pub on_duty_rolls: String,
}

pub fn summarize(session: &AttendanceSession, roster: &[Student]) -> SessionSummary {
    let counts = counts(session, roster);
    SessionSummary {
        counts,
        unset: roster.len() - counts.total(),
        roster_size: roster.len(),
        present_rolls: roll_numbers_by_status(session, roster, AttendanceStatus::Present),
        absent_rolls: roll_numbers_by_status(session, roster, AttendanceStatus::Absent),
        leave_rolls: roll_numbers_by_status(session, roster, AttendanceStatus::Leave),
        on_duty_rolls: roll_numbers_by_status(session, roster, AttendanceStatus::OnDuty),
    }
}
