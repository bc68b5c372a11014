use std::sync::Once;

pub mod calendar;
pub mod config;
pub mod console;
pub mod engine;
mod errors;
pub mod presentation;
pub mod roster;
pub mod session;
pub mod source;

pub use calendar::{CalendarDate, Clock, ClockMode, FixedClock, SystemClock};
pub use config::SignageConfig;
pub use engine::{DwellPolicy, PresentationState, RotationEngine};
pub use errors::{Result, SignageError};
pub use presentation::{Mode, MonthlyView, SizeClass, SpotlightView, View};
pub use roster::{DisplaySnapshot, RosterEntry};
pub use session::{DisplaySession, DisplaySubscriber};
pub use source::{
    load_snapshot, RestRosterSource, RosterSource, StaticRosterSource,
};

pub static INIT: Once = Once::new();

/// Set up logging once per process. Binaries call `env_logger::init`
/// themselves; this is for tests and embedders.
pub fn initialize() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
        log::info!("Initializing signage");
    });
}
