use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::attendance::{AttendanceSession, Student};
use crate::config::Config;
use crate::notify::Notices;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The session currently shown to the user. Replaced whenever another date or
/// class is opened.
#[derive(Debug, Clone)]
pub struct OpenSession {
    pub class_id: String,
    pub roster: Vec<Student>,
    pub session: AttendanceSession,
    /// Edited since it was loaded or last saved.
    pub dirty: bool,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub open: Option<OpenSession>,
    pub notices: Notices,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            workspace: None,
            db: None,
            open: None,
            notices: Notices::default(),
        }
    }
}
