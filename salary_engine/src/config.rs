//! Runtime configuration.
//!
//! Everything is read from environment variables once at start-up:
//!
//! | Variable                    | Default                | Feeds                          |
//! |-----------------------------|------------------------|--------------------------------|
//! | `SALARY_BIND_ADDR`          | `127.0.0.1:3000`       | HTTP server                    |
//! | `SALARY_PREVIEW_URL`        | unset (local only)     | [`EngineConfig::resolver`]     |
//! | `SALARY_PREVIEW_TIMEOUT_MS` | `10000`                | resolver and salary store      |
//! | `SALARY_RULES_FILE`         | unset (built-in rules) | [`EngineConfig::load_rules`]   |
//! | `SALARY_API_URL`            | unset                  | [`EngineConfig::salary_store`] |
//! | `SALARY_DEBOUNCE_MS`        | `400`                  | [`EngineConfig::preview_pipeline`] |
//!
//! The server uses the first four.  The salary store and preview
//! pipeline are for editors embedding [`crate::reconcile::SalaryDraft`].

use crate::error::{SalaryError, SalaryResult};
use crate::persistence::HttpSalaryStore;
use crate::preview::HttpPreviewClient;
use crate::reconcile::{PreviewPipeline, DEFAULT_DEBOUNCE};
use crate::resolver::{Resolver, DEFAULT_PREVIEW_TIMEOUT};
use crate::statutory::StatutoryRules;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub bind_addr: String,
    /// Base URL of the remote preview calculator.
    pub preview_url: Option<String>,
    /// Base URL of the salary persistence service.
    pub api_url: Option<String>,
    pub preview_timeout: Duration,
    pub debounce: Duration,
    pub rules_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            preview_url: None,
            api_url: None,
            preview_timeout: DEFAULT_PREVIEW_TIMEOUT,
            debounce: DEFAULT_DEBOUNCE,
            rules_file: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> SalaryResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.  Empty
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> SalaryResult<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let millis = |key: &str, default: Duration| -> SalaryResult<Duration> {
            match get(key) {
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_millis)
                    .map_err(|err| SalaryError::Config(format!("{key}={raw}: {err}"))),
                None => Ok(default),
            }
        };

        Ok(EngineConfig {
            bind_addr: get("SALARY_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            preview_url: get("SALARY_PREVIEW_URL"),
            api_url: get("SALARY_API_URL"),
            preview_timeout: millis("SALARY_PREVIEW_TIMEOUT_MS", DEFAULT_PREVIEW_TIMEOUT)?,
            debounce: millis("SALARY_DEBOUNCE_MS", DEFAULT_DEBOUNCE)?,
            rules_file: get("SALARY_RULES_FILE").map(PathBuf::from),
        })
    }

    pub fn load_rules(&self) -> SalaryResult<StatutoryRules> {
        match &self.rules_file {
            Some(path) => StatutoryRules::load_from_file(path),
            None => Ok(StatutoryRules::default()),
        }
    }

    /// A resolver using the remote preview calculator when one is
    /// configured.
    pub fn resolver(&self, rules: StatutoryRules) -> SalaryResult<Resolver> {
        let resolver = Resolver::local(rules);
        match &self.preview_url {
            Some(url) => {
                let client = HttpPreviewClient::new(url, self.preview_timeout)
                    .map_err(|err| SalaryError::Config(format!("preview client: {err}")))?;
                Ok(resolver.with_preview(Arc::new(client), self.preview_timeout))
            }
            None => Ok(resolver),
        }
    }

    pub fn preview_pipeline(&self, resolver: Arc<Resolver>) -> PreviewPipeline {
        PreviewPipeline::new(resolver, self.debounce)
    }

    pub fn salary_store(&self) -> SalaryResult<Option<HttpSalaryStore>> {
        self.api_url
            .as_deref()
            .map(|url| HttpSalaryStore::new(url, self.preview_timeout))
            .transpose()
    }
}
