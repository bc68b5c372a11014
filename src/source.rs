use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;
use uuid::Uuid;

use crate::config::SignageConfig;
use crate::roster::{DisplaySnapshot, RosterEntry};
use crate::{Result, SignageError};

const TEAM_MEMBERS_PATH: [&str; 3] = ["rest", "v1", "team_members"];

/// Point-in-time read of an organization's roster.
///
/// Passed explicitly to whatever mounts a display; there is no global
/// backend client.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Human-readable source name for logging.
    fn name(&self) -> &'static str;

    async fn fetch_roster(&self, organization: &Uuid) -> Result<DisplaySnapshot>;
}

/// Reads `team_members` from the hosted backend's REST endpoint.
pub struct RestRosterSource {
    base_url: Url,
    client: reqwest::Client,
}

impl RestRosterSource {
    pub fn new(base_url: Url, anon_key: &str) -> Result<Self> {
        if base_url.cannot_be_a_base() {
            return Err(SignageError::Config(format!(
                "{} cannot be used as a backend URL",
                base_url
            )));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(anon_key).map_err(|_| {
            SignageError::Config("anon key is not a valid header value".into())
        })?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", anon_key))
            .map_err(|_| {
                SignageError::Config(
                    "anon key is not a valid header value".into(),
                )
            })?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        Ok(Self { base_url, client })
    }

    pub fn from_config(config: &SignageConfig) -> Result<Self> {
        let (url, key) = config.backend()?;
        Self::new(url.clone(), key)
    }

    /// `{base}/rest/v1/team_members` filtered to one organization.
    pub fn roster_url(&self, organization: &Uuid) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(TEAM_MEMBERS_PATH);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("select", "*")
            .append_pair("user_id", &format!("eq.{}", organization))
            .append_pair("order", "birthday_month.asc,birthday_day.asc");
        url
    }
}

#[async_trait]
impl RosterSource for RestRosterSource {
    fn name(&self) -> &'static str {
        "rest"
    }

    async fn fetch_roster(&self, organization: &Uuid) -> Result<DisplaySnapshot> {
        let url = self.roster_url(organization);
        log::debug!("Fetching roster from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SignageError::Backend(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        DisplaySnapshot::from_json(&bytes)
    }
}

/// A fixed roster served for every organization.
#[derive(Debug, Clone, Default)]
pub struct StaticRosterSource {
    snapshot: DisplaySnapshot,
}

impl StaticRosterSource {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        Self {
            snapshot: DisplaySnapshot::new(entries),
        }
    }

    /// Load a JSON array in the backend's row format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        let snapshot = DisplaySnapshot::from_json(&bytes)?;
        log::info!(
            "Loaded {} roster entries from {}",
            snapshot.len(),
            path.as_ref().display()
        );
        Ok(Self { snapshot })
    }
}

#[async_trait]
impl RosterSource for StaticRosterSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch_roster(&self, _organization: &Uuid) -> Result<DisplaySnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Fetch the roster for a display session.
///
/// A failed fetch is logged and yields an empty roster, which the
/// engine shows as an empty monthly display.
pub async fn load_snapshot(
    source: &dyn RosterSource,
    organization: &Uuid,
) -> DisplaySnapshot {
    match source.fetch_roster(organization).await {
        Ok(snapshot) => {
            log::info!(
                "Loaded {} roster entries for {} from {} source",
                snapshot.len(),
                organization,
                source.name()
            );
            snapshot
        }
        Err(e) => {
            log::error!(
                "Error loading roster for {} from {} source: {}",
                organization,
                source.name(),
                e
            );
            DisplaySnapshot::empty()
        }
    }
}
