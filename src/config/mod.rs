//! Configuration management.
//!
//! Settings come from `XIV_*` environment variables, read once at start-up
//! through the `config` crate. Each value is validated on its own; an
//! invalid value is reported as a [`ConfigWarning`] and replaced by its
//! default, so a typo never stops a search.

use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::models::SortKey;
use crate::utils::RetryConfig;

/// Prefix shared by all environment variables
pub const ENV_PREFIX: &str = "XIV";

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_CATEGORY: &str = "cs.RO";
pub const DEFAULT_PDF_DIR: &str = "papers";
pub const DEFAULT_DOWNLOAD_DELAY_SECS: f64 = 3.0;
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_MAX_AUTHORS: usize = 3;

/// Max results used with a day filter unless `-n` is given
pub const MAX_TIME_RESULTS: usize = 1000;

const MAX_RESULTS_RANGE: (usize, usize) = (1, 2000);
const DOWNLOAD_DELAY_RANGE: (f64, f64) = (0.0, 60.0);
const RETRY_ATTEMPTS_RANGE: (u32, u32) = (1, 10);
const MAX_AUTHORS_RANGE: (usize, usize) = (1, 100);

/// An environment value that was rejected in favour of the default
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{var}={value:?} is not {expected}, using default {default}")]
pub struct ConfigWarning {
    /// Environment variable name
    pub var: &'static str,
    /// Rejected value
    pub value: String,
    /// What a valid value looks like
    pub expected: String,
    /// Default used instead
    pub default: String,
}

/// Environment values as found, before validation
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    max_results: Option<String>,
    category: Option<String>,
    sort: Option<String>,
    pdf_dir: Option<String>,
    download_delay: Option<String>,
    retry_attempts: Option<String>,
    max_authors: Option<String>,
    color: Option<String>,
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Results requested when `-n` is not given
    pub max_results: usize,
    /// Category searched when `-c` is not given
    pub category: String,
    /// Sort order when `-s` is not given
    pub sort: SortKey,
    /// Download directory when `-d` names none
    pub pdf_dir: PathBuf,
    /// Pause between two downloads
    pub download_delay: Duration,
    /// Attempts per request, including the first
    pub retry_attempts: u32,
    /// Authors listed before `et al.`
    pub max_authors: usize,
    /// Colour output on terminals
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            category: DEFAULT_CATEGORY.to_string(),
            sort: SortKey::default(),
            pdf_dir: PathBuf::from(DEFAULT_PDF_DIR),
            download_delay: Duration::from_secs_f64(DEFAULT_DOWNLOAD_DELAY_SECS),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            max_authors: DEFAULT_MAX_AUTHORS,
            color: false,
        }
    }
}

/// One line of the `--config` display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRow {
    pub var: &'static str,
    pub value: String,
    pub default: String,
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<(Self, Vec<ConfigWarning>), config::ConfigError> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load from explicit `XIV_*` variables instead of the process
    /// environment
    pub fn from_vars<I, K, V>(vars: I) -> Result<(Self, Vec<ConfigWarning>), config::ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX).source(Some(map)))
    }

    fn from_environment(
        env: config::Environment,
    ) -> Result<(Self, Vec<ConfigWarning>), config::ConfigError> {
        let raw: RawConfig = config::Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()?;

        Ok(Self::validate(raw))
    }

    fn validate(raw: RawConfig) -> (Self, Vec<ConfigWarning>) {
        let defaults = Self::default();
        let mut warnings = Vec::new();

        let max_results = check(
            &mut warnings,
            "XIV_MAX_RESULTS",
            raw.max_results,
            defaults.max_results,
            range_expectation(MAX_RESULTS_RANGE),
            |v| parse_in_range(v, MAX_RESULTS_RANGE),
        );
        let category = check(
            &mut warnings,
            "XIV_CATEGORY",
            raw.category,
            defaults.category.clone(),
            "an arXiv category such as cs.RO".to_string(),
            |v| is_category(v.trim()).then(|| v.trim().to_string()),
        );
        let sort = check(
            &mut warnings,
            "XIV_SORT",
            raw.sort,
            defaults.sort,
            "one of date, updated, relevance".to_string(),
            |v| v.parse().ok(),
        );
        let pdf_dir = check(
            &mut warnings,
            "XIV_PDF_DIR",
            raw.pdf_dir,
            defaults.pdf_dir.clone(),
            "a non-empty path".to_string(),
            |v| (!v.trim().is_empty()).then(|| PathBuf::from(v.trim())),
        );
        let download_delay = check(
            &mut warnings,
            "XIV_DOWNLOAD_DELAY",
            raw.download_delay,
            defaults.download_delay,
            format!(
                "a number of seconds between {} and {}",
                DOWNLOAD_DELAY_RANGE.0, DOWNLOAD_DELAY_RANGE.1
            ),
            parse_delay,
        );
        let retry_attempts = check(
            &mut warnings,
            "XIV_RETRY_ATTEMPTS",
            raw.retry_attempts,
            defaults.retry_attempts,
            range_expectation(RETRY_ATTEMPTS_RANGE),
            |v| parse_in_range(v, RETRY_ATTEMPTS_RANGE),
        );
        let max_authors = check(
            &mut warnings,
            "XIV_MAX_AUTHORS",
            raw.max_authors,
            defaults.max_authors,
            range_expectation(MAX_AUTHORS_RANGE),
            |v| parse_in_range(v, MAX_AUTHORS_RANGE),
        );
        let color = check(
            &mut warnings,
            "XIV_COLOR",
            raw.color,
            defaults.color,
            "a boolean (1/0, true/false, yes/no, on/off)".to_string(),
            parse_bool,
        );

        let shown_defaults = defaults.describe();
        for warning in &mut warnings {
            if let Some(row) = shown_defaults.iter().find(|row| row.var == warning.var) {
                warning.default = row.default.clone();
            }
            tracing::debug!("Config fallback: {}", warning);
        }

        let config = Self {
            max_results,
            category,
            sort,
            pdf_dir,
            download_delay,
            retry_attempts,
            max_authors,
            color,
        };
        (config, warnings)
    }

    /// Retry policy for search and download requests
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::with_attempts(self.retry_attempts)
    }

    /// Effective settings next to their defaults, for `--config`
    pub fn describe(&self) -> Vec<ConfigRow> {
        let defaults = Self::default();
        let row = |var, value: String, default: String| ConfigRow {
            var,
            value,
            default,
        };

        vec![
            row(
                "XIV_MAX_RESULTS",
                self.max_results.to_string(),
                defaults.max_results.to_string(),
            ),
            row("XIV_CATEGORY", self.category.clone(), defaults.category),
            row("XIV_SORT", self.sort.to_string(), defaults.sort.to_string()),
            row(
                "XIV_PDF_DIR",
                self.pdf_dir.display().to_string(),
                defaults.pdf_dir.display().to_string(),
            ),
            row(
                "XIV_DOWNLOAD_DELAY",
                format!("{:.1}", self.download_delay.as_secs_f64()),
                format!("{:.1}", defaults.download_delay.as_secs_f64()),
            ),
            row(
                "XIV_RETRY_ATTEMPTS",
                self.retry_attempts.to_string(),
                defaults.retry_attempts.to_string(),
            ),
            row(
                "XIV_MAX_AUTHORS",
                self.max_authors.to_string(),
                defaults.max_authors.to_string(),
            ),
            row("XIV_COLOR", self.color.to_string(), defaults.color.to_string()),
        ]
    }
}

/// Validate one raw value, recording a warning and falling back to
/// `default` when `parse` rejects it
fn check<T>(
    warnings: &mut Vec<ConfigWarning>,
    var: &'static str,
    raw: Option<String>,
    default: T,
    expected: String,
    parse: impl Fn(&str) -> Option<T>,
) -> T {
    let Some(value) = raw else {
        return default;
    };

    match parse(&value) {
        Some(parsed) => parsed,
        None => {
            warnings.push(ConfigWarning {
                var,
                value,
                expected,
                default: String::new(),
            });
            default
        }
    }
}

fn range_expectation<T: std::fmt::Display>(range: (T, T)) -> String {
    format!("an integer between {} and {}", range.0, range.1)
}

fn parse_in_range<T>(value: &str, (min, max): (T, T)) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let parsed: T = value.trim().parse().ok()?;
    (parsed >= min && parsed <= max).then_some(parsed)
}

fn parse_delay(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    let (min, max) = DOWNLOAD_DELAY_RANGE;
    (secs.is_finite() && (min..=max).contains(&secs)).then(|| Duration::from_secs_f64(secs))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// arXiv category shape: `cs.RO`, `hep-th`, `q-bio.NC`, `physics.acc-ph`
pub fn is_category(value: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[a-z]+(-[a-z]+)*(\.[A-Za-z]+(-[a-z]+)*)?$").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(value))
}
