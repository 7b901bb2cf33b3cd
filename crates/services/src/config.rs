use std::env;
use std::time::Duration;

use exam_core::band::ZeroScorePolicy;
use exam_core::catalog;
use exam_core::model::{ParseTimingModeError, TestDefinition, TimingMode};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CANDIDATE: &str = "Abduraxmatov Abdulaziz";
pub const DEFAULT_DEFINITION: &str = "ielts";
pub const DEFAULT_GRACE: Duration = Duration::from_secs(3);

/// Runtime settings for one exam run.
///
/// Every field has an environment variable; the binary lets CLI flags
/// override whatever the environment provided.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamConfig {
    /// `EXAM_MODE`
    pub mode: TimingMode,
    /// `EXAM_CANDIDATE`
    pub candidate: String,
    /// `EXAM_DEFINITION`
    pub definition: String,
    /// `EXAM_DB_URL`; results are kept in memory when unset.
    pub db_url: Option<String>,
    /// `EXAM_RELAY_URL`; the message is only logged when unset.
    pub relay_url: Option<Url>,
    /// `EXAM_GRACE_SECS`
    pub grace: Duration,
    /// `EXAM_ZERO_BAND`; overrides the definition's policy when set.
    pub zero_score: Option<ZeroScorePolicy>,
    /// `EXAM_WRITING_IN_OVERALL`; overrides the definition's policy when set.
    pub writing_in_overall: Option<bool>,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            mode: TimingMode::Production,
            candidate: DEFAULT_CANDIDATE.to_string(),
            definition: DEFAULT_DEFINITION.to_string(),
            db_url: None,
            relay_url: None,
            grace: DEFAULT_GRACE,
            zero_score: None,
            writing_in_overall: None,
        }
    }
}

impl ExamConfig {
    /// Read the `EXAM_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a value is set but unparseable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = get("EXAM_MODE") {
            config.mode = value
                .parse()
                .map_err(|e: ParseTimingModeError| invalid("EXAM_MODE", &value, e.to_string()))?;
        }
        if let Some(value) = get("EXAM_CANDIDATE") {
            config.candidate = value;
        }
        if let Some(value) = get("EXAM_DEFINITION") {
            config.definition = value.to_ascii_lowercase();
        }
        config.db_url = get("EXAM_DB_URL");
        if let Some(value) = get("EXAM_RELAY_URL") {
            config.relay_url = Some(parse_relay_url(&value)?);
        }
        if let Some(value) = get("EXAM_GRACE_SECS") {
            let secs: u64 = value
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid("EXAM_GRACE_SECS", &value, e.to_string()))?;
            config.grace = Duration::from_secs(secs);
        }
        if let Some(value) = get("EXAM_ZERO_BAND") {
            config.zero_score = Some(parse_zero_band(&value)?);
        }
        if let Some(value) = get("EXAM_WRITING_IN_OVERALL") {
            config.writing_in_overall = Some(parse_flag("EXAM_WRITING_IN_OVERALL", &value)?);
        }

        Ok(config)
    }

    /// Resolve the named built-in definition and apply policy overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownDefinition` for an unknown name.
    pub fn test_definition(&self) -> Result<TestDefinition, ConfigError> {
        let definition = catalog::by_name(&self.definition)?
            .ok_or_else(|| ConfigError::UnknownDefinition(self.definition.clone()))?;

        let mut policy = definition.policy().clone();
        if let Some(zero_score) = self.zero_score {
            policy.zero_score = zero_score;
        }
        if let Some(writing_in_overall) = self.writing_in_overall {
            policy.writing_in_overall = writing_in_overall;
        }
        Ok(definition.with_policy(policy))
    }
}

/// Parse and check a relay endpoint.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` unless the value is an absolute http(s) URL.
pub fn parse_relay_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| invalid("EXAM_RELAY_URL", value, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(
            "EXAM_RELAY_URL",
            value,
            format!("unsupported scheme {other}"),
        )),
    }
}

/// # Errors
///
/// Returns `ConfigError::Invalid` unless the value is `floor` or `zero`.
pub fn parse_zero_band(value: &str) -> Result<ZeroScorePolicy, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "floor" => Ok(ZeroScorePolicy::Floor),
        "zero" => Ok(ZeroScorePolicy::Zero),
        _ => Err(invalid("EXAM_ZERO_BAND", value, "expected floor or zero")),
    }
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected true or false")),
    }
}

fn invalid(var: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.into(),
    }
}
