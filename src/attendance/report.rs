use chrono::NaiveDate;
use serde::Serialize;

use super::model::{SessionRecord, Student};
use super::summary::StatusCounts;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTotals {
    pub student_id: String,
    pub roll_number: String,
    pub display_name: String,
    pub counts: StatusCounts,
    /// Sessions in which the student had any mark.
    pub marked: usize,
    /// Present plus on-duty over marked sessions, one decimal. `None` when
    /// the student was never marked.
    pub attended_percent: Option<f64>,
}

pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

pub fn in_range(date: NaiveDate, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    from.map_or(true, |f| date >= f) && to.map_or(true, |t| date <= t)
}

/// Per-student totals across saved sessions, in roster order.
pub fn student_totals<'a, I>(roster: &[Student], records: I) -> Vec<StudentTotals>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let mut totals: Vec<StatusCounts> = vec![StatusCounts::default(); roster.len()];
    for rec in records {
        for (i, s) in roster.iter().enumerate() {
            if let Some(status) = rec.marks.get(&s.id) {
                totals[i].add(*status);
            }
        }
    }

    roster
        .iter()
        .zip(totals)
        .map(|(s, counts)| {
            let marked = counts.total();
            let attended_percent = if marked > 0 {
                let attended = (counts.present + counts.on_duty) as f64;
                Some(round_off_1_decimal(100.0 * attended / marked as f64))
            } else {
                None
            };
            StudentTotals {
                student_id: s.id.clone(),
                roll_number: s.roll_number.clone(),
                display_name: s.display_name.clone(),
                counts,
                marked,
                attended_percent,
            }
        })
        .collect()
}
