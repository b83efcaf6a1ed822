use chrono::NaiveDate;

use super::error::AttendanceError;

/// Key/value persistence for sessions, one opaque JSON record per date.
/// Writes replace the whole record for a date or fail without effect.
pub trait SessionStore {
    fn get(&self, date: NaiveDate) -> Result<Option<String>, AttendanceError>;
    fn set(&mut self, date: NaiveDate, record: &str) -> Result<(), AttendanceError>;
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_key_is_iso_date() {
        let d = NaiveDate::from_ymd_opt(2026, 3, 7).expect("date");
        assert_eq!(date_key(d), "2026-03-07");
        assert_eq!(parse_date_key(" 2026-03-07 "), Some(d));
        assert_eq!(parse_date_key("07/03/2026"), None);
    }
}
