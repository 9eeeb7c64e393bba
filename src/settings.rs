use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

/// Configuration for one run.
///
/// Every field has a default, so a partial serialized form deserializes:
///
/// ```rust
/// use verdict::settings::RunSettings;
/// let settings: RunSettings = serde_json::from_str(r#"{ "workers": 4 }"#).unwrap();
/// assert_eq!(settings.workers, 4);
/// assert!(!settings.teardown_after_failed_setup);
/// assert!(settings.platforms.iter().any(|p| p == "rust"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Upper bound on concurrently running fixtures or tests.
    pub workers: usize,
    /// Seed for random parameters.
    pub seed: u64,
    /// Selection filter expression; `None` runs everything not explicit.
    pub filter: Option<String>,
    /// Runs per-test teardown even when setup failed.
    pub teardown_after_failed_setup: bool,
    /// Platform names conditions are evaluated against.
    pub platforms: Vec<String>,
    /// Named parameters visible to tests.
    pub parameters: BTreeMap<String, String>,
    pub use_colors: bool,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            workers: 1,
            seed: rand::random(),
            filter: None,
            teardown_after_failed_setup: false,
            platforms: current_platforms(),
            parameters: BTreeMap::new(),
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

/// The operating system, its family and `rust`.
pub fn current_platforms() -> Vec<String> {
    let mut platforms = vec![
        std::env::consts::OS.to_string(),
        std::env::consts::FAMILY.to_string(),
        "rust".to_string(),
    ];
    platforms.dedup();
    platforms
}

impl RunSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.workers == 0 {
            return Err(SettingsError::ZeroWorkers);
        }
        Ok(())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Adds a parameter written `KEY=VALUE`.
    pub fn parameter(&mut self, raw: &str) -> Result<(), SettingsError> {
        let (key, value) = raw
            .split_once('=')
            .filter(|(key, _)| !key.trim().is_empty())
            .ok_or_else(|| SettingsError::InvalidParameter {
                raw: raw.to_string(),
            })?;
        self.parameters
            .insert(key.trim().to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_rejected() {
        let settings = RunSettings::default().with_workers(0);
        assert_eq!(settings.validate(), Err(SettingsError::ZeroWorkers));
    }

    #[test]
    fn parameters_parse_key_value() {
        let mut settings = RunSettings::default();
        settings.parameter("env=staging").unwrap();
        settings.parameter("url=http://x?a=b").unwrap();
        assert_eq!(settings.parameters["env"], "staging");
        assert_eq!(settings.parameters["url"], "http://x?a=b");
        assert!(settings.parameter("novalue").is_err());
        assert!(settings.parameter("=value").is_err());
    }
}
