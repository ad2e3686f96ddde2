use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

pub const SOURCE_URL_VAR: &str = "LEGACY_SOURCE_URL";
pub const SOURCE_KEY_VAR: &str = "LEGACY_SOURCE_SERVICE_KEY";
pub const TARGET_URL_VAR: &str = "TARGET_STORE_URL";
pub const PAGE_SIZE_VAR: &str = "MIGRATE_PAGE_SIZE";
pub const REQUEST_TIMEOUT_VAR: &str = "MIGRATE_REQUEST_TIMEOUT_SECS";
pub const JOB_DEADLINE_VAR: &str = "MIGRATE_JOB_DEADLINE_SECS";
pub const VERIFY_CONCURRENCY_VAR: &str = "VERIFY_CONCURRENCY";
pub const VERIFY_SAMPLE_VAR: &str = "VERIFY_SAMPLE_SIZE";
pub const REPORTS_DIR_VAR: &str = "MIGRATE_REPORTS_DIR";

pub const DEFAULT_PAGE_SIZE: usize = 1000;
pub const MAX_PAGE_SIZE: usize = 10_000;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_JOB_DEADLINE_SECS: u64 = 3600;
pub const DEFAULT_VERIFY_CONCURRENCY: usize = 4;
pub const MAX_VERIFY_CONCURRENCY: usize = 32;
pub const DEFAULT_SAMPLE_SIZE: usize = 5;

/// Runtime settings for both operator jobs.
#[derive(Clone)]
pub struct Config {
    pub source_url: String,
    pub source_key: String,
    pub target_url: String,
    pub page_size: usize,
    pub request_timeout: Duration,
    pub job_deadline: Duration,
    pub verify_concurrency: usize,
    pub sample_size: usize,
    pub reports_dir: Option<PathBuf>,
}

// The service key must never end up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("source_url", &self.source_url)
            .field("source_key", &"<redacted>")
            .field("target_url", &self.target_url)
            .field("page_size", &self.page_size)
            .field("request_timeout", &self.request_timeout)
            .field("job_deadline", &self.job_deadline)
            .field("verify_concurrency", &self.verify_concurrency)
            .field("sample_size", &self.sample_size)
            .field("reports_dir", &self.reports_dir)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable source. Blank values are
    /// treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let source_url = get(SOURCE_URL_VAR);
        let source_key = get(SOURCE_KEY_VAR);
        let target_url = get(TARGET_URL_VAR);

        let missing: Vec<&'static str> = [
            (SOURCE_URL_VAR, source_url.is_none()),
            (SOURCE_KEY_VAR, source_key.is_none()),
            (TARGET_URL_VAR, target_url.is_none()),
        ]
        .into_iter()
        .filter_map(|(var, absent)| absent.then_some(var))
        .collect();

        let (Some(source_url), Some(source_key), Some(target_url)) =
            (source_url, source_key, target_url)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let page_size = parse_bounded(
            PAGE_SIZE_VAR,
            get(PAGE_SIZE_VAR),
            DEFAULT_PAGE_SIZE,
            1,
            MAX_PAGE_SIZE,
        )?;
        let request_timeout = parse_bounded(
            REQUEST_TIMEOUT_VAR,
            get(REQUEST_TIMEOUT_VAR),
            DEFAULT_REQUEST_TIMEOUT_SECS,
            1,
            u64::MAX,
        )?;
        let job_deadline = parse_bounded(
            JOB_DEADLINE_VAR,
            get(JOB_DEADLINE_VAR),
            DEFAULT_JOB_DEADLINE_SECS,
            1,
            u64::MAX,
        )?;
        let verify_concurrency = parse_bounded(
            VERIFY_CONCURRENCY_VAR,
            get(VERIFY_CONCURRENCY_VAR),
            DEFAULT_VERIFY_CONCURRENCY,
            1,
            MAX_VERIFY_CONCURRENCY,
        )?;
        let sample_size = parse_bounded(
            VERIFY_SAMPLE_VAR,
            get(VERIFY_SAMPLE_VAR),
            DEFAULT_SAMPLE_SIZE,
            0,
            MAX_PAGE_SIZE,
        )?;

        Ok(Config {
            source_url: source_url.trim_end_matches('/').to_string(),
            source_key,
            target_url,
            page_size,
            request_timeout: Duration::from_secs(request_timeout),
            job_deadline: Duration::from_secs(job_deadline),
            verify_concurrency,
            sample_size,
            reports_dir: get(REPORTS_DIR_VAR).map(PathBuf::from),
        })
    }
}

fn parse_bounded<T>(
    var: &'static str,
    raw: Option<String>,
    default: T,
    min: T,
    max: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return Ok(default);
    };
    let value: T = raw.parse().map_err(|err: T::Err| ConfigError::Invalid {
        var,
        value: raw.clone(),
        reason: err.to_string(),
    })?;
    if value < min || value > max {
        return Err(ConfigError::Invalid {
            var,
            value: raw,
            reason: format!("must be between {min} and {max}"),
        });
    }
    Ok(value)
}
