use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_TITLE_LENGTH: usize = 200;
pub const MAX_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_MESSAGE_LENGTH: usize = 1000;
pub const MAX_TIMEZONE_LENGTH: usize = 64;
pub const MAX_URL_LENGTH: usize = 2048;

/// Bounds on how long an election may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectionLimits {
    pub min_duration: Duration,
    pub max_duration: Duration,
}

impl Default for ElectionLimits {
    fn default() -> Self {
        Self {
            min_duration: Duration::hours(1),
            max_duration: Duration::days(365),
        }
    }
}

/// A new election, as requested by its creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    #[serde(flatten)]
    pub info: BasicInfo,
    pub timing: Timing,
    pub settings: VotingSettings,
    #[serde(default)]
    pub messages: Messages,
    #[serde(default)]
    pub results: ResultsConfig,
}

impl ElectionSpec {
    /// Check every section, as if each were being set individually.
    pub fn validate(&self, limits: &ElectionLimits, now: DateTime<Utc>) -> Result<()> {
        self.info.validate()?;
        self.timing.validate(limits, now)?;
        self.settings.validate()?;
        self.messages.validate()?;
        Ok(())
    }
}

/// Title and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicInfo {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl BasicInfo {
    pub fn validate(&self) -> Result<()> {
        check_title(&self.title)?;
        check_length("Description", &self.description, MAX_DESCRIPTION_LENGTH)
    }
}

/// When voting opens and closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Display label only; all times are UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Timing {
    pub fn validate(&self, limits: &ElectionLimits, now: DateTime<Utc>) -> Result<()> {
        if self.start_time <= now {
            return Err(Error::invalid_input("Start time must be in the future"));
        }
        if self.end_time <= self.start_time {
            return Err(Error::invalid_input("End time must be after start time"));
        }
        let duration = self.end_time - self.start_time;
        if duration < limits.min_duration || duration > limits.max_duration {
            return Err(Error::invalid_input(format!(
                "Election must last between {} and {} minutes",
                limits.min_duration.num_minutes(),
                limits.max_duration.num_minutes()
            )));
        }
        check_length("Timezone", &self.timezone, MAX_TIMEZONE_LENGTH)
    }
}

/// How voting behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingSettings {
    #[serde(default)]
    pub receipt_enabled: bool,
    #[serde(default)]
    pub submit_confirmation: bool,
    pub max_voters: u32,
    #[serde(default)]
    pub allow_late_registration: bool,
}

impl VotingSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_voters == 0 {
            return Err(Error::invalid_input("Maximum voter count must be positive"));
        }
        Ok(())
    }
}

/// Text shown to voters at various points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Messages {
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub confirmation: String,
    #[serde(default)]
    pub closing: String,
}

impl Messages {
    pub fn validate(&self) -> Result<()> {
        check_length("Login message", &self.login, MAX_MESSAGE_LENGTH)?;
        check_length("Confirmation message", &self.confirmation, MAX_MESSAGE_LENGTH)?;
        check_length("Closing message", &self.closing, MAX_MESSAGE_LENGTH)
    }
}

/// Who may see results, and when.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsConfig {
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub real_time: bool,
    #[serde(default)]
    pub release_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub download_allowed: bool,
}

/// A title must be present and not too long.
pub fn check_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::invalid_input("Title must not be empty"));
    }
    check_length("Title", title, MAX_TITLE_LENGTH)
}

pub fn check_length(what: &str, value: &str, max: usize) -> Result<()> {
    if value.chars().count() > max {
        return Err(Error::invalid_input(format!(
            "{what} exceeds {max} characters"
        )));
    }
    Ok(())
}
