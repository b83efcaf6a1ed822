use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::lock::LockState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub roll_number: String,
    pub display_name: String,
}

/// Wire names follow the persisted record: `present|absent|leave|od`.
/// `Unset` is never written; a missing key means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Leave,
    #[serde(rename = "od")]
    OnDuty,
    #[default]
    Unset,
}

impl AttendanceStatus {
    pub fn code(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Leave => "leave",
            AttendanceStatus::OnDuty => "od",
            AttendanceStatus::Unset => "unset",
        }
    }

    /// Lenient parse for UI input. Blank means unset.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "present" | "p" => Some(AttendanceStatus::Present),
            "absent" | "a" => Some(AttendanceStatus::Absent),
            "leave" | "l" => Some(AttendanceStatus::Leave),
            "od" | "onduty" | "on_duty" => Some(AttendanceStatus::OnDuty),
            "" | "unset" => Some(AttendanceStatus::Unset),
            _ => None,
        }
    }

    pub fn is_set(self) -> bool {
        self != AttendanceStatus::Unset
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Coverage {
    pub semester: String,
    pub year: String,
    pub department: String,
    pub topic: String,
}

impl Coverage {
    pub fn trimmed(self) -> Self {
        Self {
            semester: self.semester.trim().to_string(),
            year: self.year.trim().to_string(),
            department: self.department.trim().to_string(),
            topic: self.topic.trim().to_string(),
        }
    }
}

/// The persisted shape of one date's session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub marks: BTreeMap<String, AttendanceStatus>,
    #[serde(default)]
    pub coverage: Coverage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceSession {
    pub date: NaiveDate,
    pub marks: BTreeMap<String, AttendanceStatus>,
    pub coverage: Coverage,
    pub lock: LockState,
}

impl AttendanceSession {
    pub fn empty(date: NaiveDate, lock: LockState) -> Self {
        Self {
            date,
            marks: BTreeMap::new(),
            coverage: Coverage::default(),
            lock,
        }
    }

    pub fn locked(&self) -> bool {
        self.lock.is_locked()
    }

    pub fn status_of(&self, student_id: &str) -> AttendanceStatus {
        self.marks.get(student_id).copied().unwrap_or_default()
    }

    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            marks: self.marks.clone(),
            coverage: self.coverage.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_wire_names_match_record_format() {
        let mut marks = BTreeMap::new();
        marks.insert("s1".to_string(), AttendanceStatus::Present);
        marks.insert("s2".to_string(), AttendanceStatus::OnDuty);
        let rec = SessionRecord {
            marks,
            coverage: Coverage::default(),
        };
        let v = serde_json::to_value(&rec).expect("serialize record");
        assert_eq!(v["marks"]["s1"], "present");
        assert_eq!(v["marks"]["s2"], "od");
        assert_eq!(v["coverage"]["topic"], "");
    }

    #[test]
    fn record_without_coverage_parses() {
        let rec: SessionRecord =
            serde_json::from_str(r#"{"marks":{"a":"leave","b":"absent"}}"#).expect("parse");
        assert_eq!(rec.marks["a"], AttendanceStatus::Leave);
        assert_eq!(rec.marks["b"], AttendanceStatus::Absent);
        assert_eq!(rec.coverage, Coverage::default());
    }

    #[test]
    fn parse_accepts_short_codes_and_blank() {
        assert_eq!(AttendanceStatus::parse("P"), Some(AttendanceStatus::Present));
        assert_eq!(AttendanceStatus::parse(" od "), Some(AttendanceStatus::OnDuty));
        assert_eq!(AttendanceStatus::parse(""), Some(AttendanceStatus::Unset));
        assert_eq!(AttendanceStatus::parse("late"), None);
    }
}
