use chrono::NaiveDate;
use std::path::PathBuf;

use crate::attendance::parse_date_key;

pub const ENV_WORKSPACE: &str = "ATTENDD_WORKSPACE";
pub const ENV_TODAY: &str = "ATTENDD_TODAY";
pub const ENV_LOG: &str = "ATTENDD_LOG";
const DEFAULT_LOG_FILTER: &str = "attendd=info";

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    /// Fixed clock, used by tests and single-day kiosks.
    pub today: Option<NaiveDate>,
    pub log_filter: String,
    /// Problems found while reading the environment; logged once logging is up.
    pub warnings: Vec<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|k| std::env::var(k).ok())
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |k: &str| get(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut warnings = Vec::new();

        let today = non_empty(ENV_TODAY).and_then(|raw| {
            let parsed = parse_date_key(&raw);
            if parsed.is_none() {
                warnings.push(format!("{ENV_TODAY}={raw:?} is not YYYY-MM-DD; using system date"));
            }
            parsed
        });

        Self {
            workspace: non_empty(ENV_WORKSPACE).map(PathBuf::from),
            today,
            log_filter: non_empty(ENV_LOG).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            warnings,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}
