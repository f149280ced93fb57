use std::path::PathBuf;
use std::time::Duration;

use crate::AvailableYears;
use crate::Error;
use crate::Result;

/// Where the State Department of Education publishes enrollment workbooks.
pub const DEFAULT_BASE_URL: &str =
    "https://www.sde.idaho.gov/finance/files/attendance-enrollment/historical";

pub const ENV_BASE_URL: &str = "IDSCHOOLDATA_BASE_URL";
pub const ENV_CACHE_DIR: &str = "IDSCHOOLDATA_CACHE_DIR";
pub const ENV_TIMEOUT_SECS: &str = "IDSCHOOLDATA_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings shared by the transport and the cache.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL; the workbook file name is appended to it.
    pub base_url: String,
    /// Directory holding downloaded workbooks.
    pub cache_dir: PathBuf,
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Years that may be requested.
    pub years: AvailableYears,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: default_cache_dir(|key| std::env::var(key).ok()),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("idschooldata/{}", env!("CARGO_PKG_VERSION")),
            years: AvailableYears::default(),
        }
    }
}

impl Config {
    /// Defaults, overridden by `IDSCHOOLDATA_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an override cannot be interpreted.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Config::from_env`] but reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config {
            cache_dir: default_cache_dir(&lookup),
            ..Config::default()
        };

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(dir) = lookup(ENV_CACHE_DIR).filter(|v| !v.trim().is_empty()) {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number, got {secs:?}"))
            })?;
            if secs == 0 {
                return Err(Error::Config(format!("{ENV_TIMEOUT_SECS} must be non-zero")));
            }
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Location of the workbook for `end_year`.
    pub fn url_for(&self, end_year: u16) -> String {
        format!(
            "{}/Enrollment-by-Building-{end_year}.xlsx",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn default_cache_dir<F>(lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    let base = lookup("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| lookup("HOME").map(|home| PathBuf::from(home).join(".cache")))
        .unwrap_or_else(std::env::temp_dir);
    base.join("idschooldata")
}
