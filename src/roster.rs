use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use uuid::Uuid;

use crate::calendar::CalendarDate;
use crate::{Result, SignageError};

/// One team member as stored in the backend's `team_members` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "birthday_month")]
    pub birth_month: u8,
    #[serde(rename = "birthday_day")]
    pub birth_day: u8,
    /// The dashboard stores an empty string when no photo was uploaded.
    #[serde(
        rename = "photo_url",
        default,
        deserialize_with = "deserialize_photo_ref"
    )]
    pub photo_ref: Option<Url>,
}

fn deserialize_photo_ref<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Url>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Url::parse(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl RosterEntry {
    pub fn new(name: impl Into<String>, birth_month: u8, birth_day: u8) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            birth_month,
            birth_day,
            photo_ref: None,
        }
    }

    pub fn with_photo(mut self, photo_ref: Url) -> Self {
        self.photo_ref = Some(photo_ref);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SignageError::InvalidEntry(
                self.id.to_string(),
                "name is empty".to_owned(),
            ));
        }
        CalendarDate::new(self.birth_month, self.birth_day)
            .map(|_| ())
            .map_err(|e| {
                SignageError::InvalidEntry(self.id.to_string(), e.to_string())
            })
    }

    pub fn is_born_on(&self, date: CalendarDate) -> bool {
        self.birth_month == date.month && self.birth_day == date.day
    }

    pub fn is_born_in(&self, month: u8) -> bool {
        self.birth_month == month
    }

    pub fn birthday(&self) -> CalendarDate {
        CalendarDate {
            month: self.birth_month,
            day: self.birth_day,
        }
    }
}

/// The roster of one organization, as loaded at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySnapshot {
    entries: Vec<RosterEntry>,
}

impl DisplaySnapshot {
    /// Invalid entries are dropped, the order of the rest is kept.
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        let total = entries.len();
        let entries: Vec<RosterEntry> = entries
            .into_iter()
            .filter(|entry| match entry.validate() {
                Ok(()) => true,
                Err(e) => {
                    log::warn!("Skipping roster entry: {}", e);
                    false
                }
            })
            .collect();
        if entries.len() != total {
            log::info!(
                "{} of {} roster entries were skipped",
                total - entries.len(),
                total
            );
        }
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse the JSON array returned by the backend's REST endpoint.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let rows: Vec<serde_json::Value> = serde_json::from_slice(bytes)?;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<RosterEntry>(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!("Skipping malformed roster row: {}", e),
            }
        }
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn todays_honorees(&self, date: CalendarDate) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.is_born_on(date))
            .cloned()
            .collect()
    }

    pub fn monthly_honorees(&self, month: u8) -> Vec<RosterEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.is_born_in(month))
            .cloned()
            .collect()
    }
}
