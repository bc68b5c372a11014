use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::calendar::ClockMode;
use crate::engine::DwellPolicy;
use crate::{Result, SignageError};

/// Backend URL variables, first match wins. The `VITE_` names are the
/// ones the hosted frontend is deployed with.
pub const BACKEND_URL_VARS: [&str; 2] = ["SUPABASE_URL", "VITE_SUPABASE_URL"];
pub const ANON_KEY_VARS: [&str; 2] =
    ["SUPABASE_ANON_KEY", "VITE_SUPABASE_ANON_KEY"];

/// Settings for a display. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignageConfig {
    pub backend_url: Option<Url>,
    pub anon_key: Option<String>,
    pub dwell: DwellPolicy,
    pub clock: ClockMode,
}

impl Default for SignageConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            anon_key: None,
            dwell: DwellPolicy::default(),
            clock: ClockMode::Local,
        }
    }
}

impl SignageConfig {
    /// Read the JSON file if given, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&bytes).map_err(|e| {
            SignageError::Config(format!(
                "{}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        log::debug!("Configuration read from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|value| !value.trim().is_empty())
        };

        if let Some(url) = first(&BACKEND_URL_VARS[..]) {
            self.backend_url = Some(Url::parse(url.trim())?);
        }
        if let Some(key) = first(&ANON_KEY_VARS[..]) {
            self.anon_key = Some(key.trim().to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.dwell.validate()?;
        if let Some(url) = &self.backend_url {
            if !matches!(url.scheme(), "http" | "https") {
                return Err(SignageError::Config(format!(
                    "backend URL must be http(s), got {}",
                    url
                )));
            }
        }
        if matches!(&self.anon_key, Some(key) if key.trim().is_empty()) {
            return Err(SignageError::Config("anon key is empty".to_owned()));
        }
        Ok(())
    }

    /// Backend URL and key, both required to reach the REST endpoint.
    pub fn backend(&self) -> Result<(&Url, &str)> {
        match (&self.backend_url, &self.anon_key) {
            (Some(url), Some(key)) => Ok((url, key.as_str())),
            (None, _) => Err(SignageError::Config(format!(
                "backend URL not configured, set one of {:?}",
                BACKEND_URL_VARS
            ))),
            (_, None) => Err(SignageError::Config(format!(
                "anon key not configured, set one of {:?}",
                ANON_KEY_VARS
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempdir::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn reads_file_with_partial_fields() {
        let dir = TempDir::new("signage_config").unwrap();
        let path = dir.path().join("signage.json");
        std::fs::write(
            &path,
            r#"{
                "backend_url": "https://abc.supabase.co",
                "dwell": { "spotlight_ms": 5000, "monthly_ms": 10000 },
                "clock": "utc"
            }"#,
        )
        .unwrap();

        let config = SignageConfig::from_file(&path).unwrap();
        assert_eq!(config.clock, ClockMode::Utc);
        assert_eq!(config.dwell.spotlight, Duration::from_secs(5));
        assert_eq!(config.dwell.monthly, Duration::from_secs(10));
        assert!(config.anon_key.is_none());
        assert!(config.backend().is_err());
    }

    #[test]
    fn defaults_without_file() {
        let config = SignageConfig::default();
        assert_eq!(config.dwell, DwellPolicy::default());
        assert_eq!(config.clock, ClockMode::Local);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = SignageConfig {
            backend_url: Some(Url::parse("https://old.example.com").unwrap()),
            ..Default::default()
        };
        config
            .apply_env(env(&[
                ("SUPABASE_URL", ""),
                ("VITE_SUPABASE_URL", "https://new.supabase.co"),
                ("SUPABASE_ANON_KEY", " secret "),
            ]))
            .unwrap();

        let (url, key) = config.backend().unwrap();
        assert_eq!(url.as_str(), "https://new.supabase.co/");
        assert_eq!(key, "secret");
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = SignageConfig::default();
        assert!(config
            .apply_env(env(&[("SUPABASE_URL", "not a url")]))
            .is_err());

        let config = SignageConfig {
            backend_url: Some(Url::parse("ftp://abc.example.com").unwrap()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = SignageConfig {
            dwell: DwellPolicy {
                spotlight: Duration::ZERO,
                monthly: Duration::from_secs(5),
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new("signage_config").unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            SignageConfig::from_file(&path),
            Err(SignageError::Config(_))
        ));
    }
}
