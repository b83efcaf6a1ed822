use super::model::Student;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Query of exactly 2 or 3 digits: match the end of the roll number.
    RollSuffix,
    /// Case-insensitive substring on name or roll number.
    Substring,
}

pub fn filter_mode(query: &str) -> FilterMode {
    let q = query.trim();
    if (2..=3).contains(&q.len()) && q.bytes().all(|b| b.is_ascii_digit()) {
        FilterMode::RollSuffix
    } else {
        FilterMode::Substring
    }
}

pub fn filter_roster<'a>(roster: &'a [Student], query: &str) -> Vec<&'a Student> {
    let q = query.trim();
    match filter_mode(q) {
        FilterMode::RollSuffix => roster
            .iter()
            .filter(|s| s.roll_number.trim_end().ends_with(q))
            .collect(),
        FilterMode::Substring => {
            let needle = q.to_lowercase();
            roster
                .iter()
                .filter(|s| {
                    s.display_name.to_lowercase().contains(&needle)
                        || s.roll_number.to_lowercase().contains(&needle)
                })
                .collect()
        }
    }
}
