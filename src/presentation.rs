//! Read-only views handed to a renderer.
//!
//! At any instant a session exposes exactly one [`View`]: either the
//! spotlight on a single person celebrating today, or the list of
//! everybody celebrating this month together with sizing hints that let
//! a fixed-size screen fit the whole list.

use serde::Serialize;

use crate::roster::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Monthly,
    Spotlight,
}

/// Name size for the monthly list, from largest to smallest.
///
/// Derived from the number of names only. Ordering follows the
/// declaration, so `Large > Compact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Compact,
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=2 => SizeClass::Large,
            3..=4 => SizeClass::Medium,
            5..=8 => SizeClass::Small,
            _ => SizeClass::Compact,
        }
    }
}

/// Size of the date line under each name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSize {
    Reduced,
    Regular,
}

impl DateSize {
    pub fn for_count(count: usize) -> Self {
        if count <= 4 {
            DateSize::Regular
        } else {
            DateSize::Reduced
        }
    }
}

/// Vertical padding between rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacing {
    Tight,
    Normal,
    Loose,
}

impl Spacing {
    pub fn for_count(count: usize) -> Self {
        match count {
            0..=2 => Spacing::Loose,
            3..=4 => Spacing::Normal,
            _ => Spacing::Tight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotlightView {
    pub honoree: RosterEntry,
    /// Zero-based position of `honoree` among today's honorees.
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyView {
    pub month: u8,
    pub honorees: Vec<RosterEntry>,
    pub size_class: SizeClass,
    pub date_size: DateSize,
    pub spacing: Spacing,
}

impl MonthlyView {
    pub fn new(month: u8, honorees: Vec<RosterEntry>) -> Self {
        let count = honorees.len();
        Self {
            month,
            honorees,
            size_class: SizeClass::for_count(count),
            date_size: DateSize::for_count(count),
            spacing: Spacing::for_count(count),
        }
    }

    /// The "nothing this month" case.
    pub fn is_empty(&self) -> bool {
        self.honorees.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum View {
    Monthly(MonthlyView),
    Spotlight(SpotlightView),
}

impl View {
    pub fn mode(&self) -> Mode {
        match self {
            View::Monthly(_) => Mode::Monthly,
            View::Spotlight(_) => Mode::Spotlight,
        }
    }
}
