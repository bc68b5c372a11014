use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calendar::CalendarDate;
use crate::presentation::{Mode, MonthlyView, SpotlightView, View};
use crate::roster::{DisplaySnapshot, RosterEntry};
use crate::{Result, SignageError};

const DEFAULT_SPOTLIGHT_DWELL_MS: u64 = 10_000;
const DEFAULT_MONTHLY_DWELL_MS: u64 = 5_000;

/// How long each mode stays on screen before the next transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellPolicy {
    #[serde(rename = "spotlight_ms", with = "millis")]
    pub spotlight: Duration,
    #[serde(rename = "monthly_ms", with = "millis")]
    pub monthly: Duration,
}

impl Default for DwellPolicy {
    fn default() -> Self {
        Self {
            spotlight: Duration::from_millis(DEFAULT_SPOTLIGHT_DWELL_MS),
            monthly: Duration::from_millis(DEFAULT_MONTHLY_DWELL_MS),
        }
    }
}

impl DwellPolicy {
    pub fn new(spotlight: Duration, monthly: Duration) -> Result<Self> {
        let policy = Self { spotlight, monthly };
        policy.validate()?;
        Ok(policy)
    }

    pub fn symmetric(dwell: Duration) -> Result<Self> {
        Self::new(dwell, dwell)
    }

    pub fn validate(&self) -> Result<()> {
        if self.spotlight.is_zero() || self.monthly.is_zero() {
            return Err(SignageError::Config(
                "dwell durations must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn dwell(&self, mode: Mode) -> Duration {
        match mode {
            Mode::Spotlight => self.spotlight,
            Mode::Monthly => self.monthly,
        }
    }
}

mod millis {
    use std::time::Duration;

    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).map_err(|_| {
            S::Error::custom(format!("dwell of {:?} is too long", value))
        })?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationState {
    pub mode: Mode,
    pub spotlight_index: usize,
    pub todays: Vec<RosterEntry>,
    pub monthly: Vec<RosterEntry>,
}

/// The display rotation state machine.
///
/// Pure and clock-free: the caller decides when a dwell has elapsed and
/// calls [`RotationEngine::advance`]. When nobody celebrates today the
/// engine stays in [`Mode::Monthly`] and `advance` does nothing.
#[derive(Debug, Clone)]
pub struct RotationEngine {
    date: CalendarDate,
    state: PresentationState,
}

impl RotationEngine {
    pub fn new(snapshot: &DisplaySnapshot, date: CalendarDate) -> Self {
        let todays = snapshot.todays_honorees(date);
        let monthly = snapshot.monthly_honorees(date.month);
        let mode = if todays.is_empty() {
            Mode::Monthly
        } else {
            Mode::Spotlight
        };
        log::debug!(
            "Rotation engine for {}: {} today, {} this month, starting in {:?}",
            date,
            todays.len(),
            monthly.len(),
            mode
        );

        Self {
            date,
            state: PresentationState {
                mode,
                spotlight_index: 0,
                todays,
                monthly,
            },
        }
    }

    pub fn date(&self) -> CalendarDate {
        self.date
    }

    pub fn mode(&self) -> Mode {
        self.state.mode
    }

    pub fn spotlight_index(&self) -> usize {
        self.state.spotlight_index
    }

    pub fn state(&self) -> &PresentationState {
        &self.state
    }

    pub fn is_rotating(&self) -> bool {
        !self.state.todays.is_empty()
    }

    /// Dwell of the mode currently shown, `None` when no timer is needed.
    pub fn next_dwell(&self, policy: &DwellPolicy) -> Option<Duration> {
        if self.is_rotating() {
            Some(policy.dwell(self.state.mode))
        } else {
            None
        }
    }

    /// Apply one timed transition and return the new mode.
    pub fn advance(&mut self) -> Mode {
        if !self.is_rotating() {
            return self.state.mode;
        }

        match self.state.mode {
            Mode::Spotlight => {
                self.state.mode = Mode::Monthly;
            }
            Mode::Monthly => {
                let total = self.state.todays.len();
                if total > 1 {
                    self.state.spotlight_index =
                        (self.state.spotlight_index + 1) % total;
                }
                self.state.mode = Mode::Spotlight;
            }
        }

        log::trace!(
            "Transition to {:?} (spotlight {}/{})",
            self.state.mode,
            self.state.spotlight_index + 1,
            self.state.todays.len()
        );
        self.state.mode
    }

    pub fn view(&self) -> View {
        match self.state.mode {
            Mode::Spotlight => {
                let position = self.state.spotlight_index;
                View::Spotlight(SpotlightView {
                    honoree: self.state.todays[position].clone(),
                    position,
                    total: self.state.todays.len(),
                })
            }
            Mode::Monthly => View::Monthly(MonthlyView::new(
                self.date.month,
                self.state.monthly.clone(),
            )),
        }
    }
}
