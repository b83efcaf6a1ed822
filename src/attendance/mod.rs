//! Daily attendance capture and locking.
//!
//! Pure functions over an [`AttendanceSession`]; storage is reached only
//! through [`SessionStore`].

mod error;
mod filter;
mod lock;
mod marks;
mod model;
mod report;
mod store;
mod summary;

pub use error::AttendanceError;
pub use filter::{filter_mode, filter_roster, FilterMode};
pub use lock::{load_session, reassign, save, LockState};
pub use marks::{apply_bulk, mark_all, parse_token_list, set_coverage, set_status};
pub use model::{AttendanceSession, AttendanceStatus, Coverage, SessionRecord, Student};
pub use report::{in_range, student_totals};
pub use store::{date_key, parse_date_key, SessionStore};
pub use summary::{counts, roll_numbers_by_status, summarize};
