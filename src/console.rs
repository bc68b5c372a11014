//! Plain-text renderer for terminals and logs.

use std::io::Write;
use std::sync::Mutex;

use crate::calendar::month_name;
use crate::presentation::{MonthlyView, SizeClass, SpotlightView, View};
use crate::session::DisplaySubscriber;

pub struct SeasonalTheme {
    pub name: &'static str,
    pub emoji: &'static str,
}

static THEMES: [SeasonalTheme; 12] = [
    SeasonalTheme { name: "Winter Wonderland", emoji: "❄️" },
    SeasonalTheme { name: "Love & Hearts", emoji: "💝" },
    SeasonalTheme { name: "Spring Awakening", emoji: "🌷" },
    SeasonalTheme { name: "Spring Blossoms", emoji: "🌸" },
    SeasonalTheme { name: "Sunshine Days", emoji: "🌻" },
    SeasonalTheme { name: "Summer Vibes", emoji: "☀️" },
    SeasonalTheme { name: "Summer Fun", emoji: "🎆" },
    SeasonalTheme { name: "Beach Days", emoji: "🏖️" },
    SeasonalTheme { name: "Autumn Begins", emoji: "🍂" },
    SeasonalTheme { name: "Fall Harvest", emoji: "🎃" },
    SeasonalTheme { name: "Cozy Season", emoji: "🍁" },
    SeasonalTheme { name: "Winter Holidays", emoji: "🎄" },
];

pub fn seasonal_theme(month: u8) -> Option<&'static SeasonalTheme> {
    match month {
        1..=12 => THEMES.get(usize::from(month - 1)),
        _ => None,
    }
}

pub fn render(view: &View) -> String {
    match view {
        View::Spotlight(spotlight) => render_spotlight(spotlight),
        View::Monthly(monthly) => render_monthly(monthly),
    }
}

fn render_spotlight(view: &SpotlightView) -> String {
    let honoree = &view.honoree;
    let mut out = String::new();
    out.push_str("🎂 🎉 Happy Birthday! 🎉 🎂\n\n");
    out.push_str(&format!("  {}\n", honoree.name));
    out.push_str(&format!("  {}\n", honoree.birthday()));
    if let Some(photo) = &honoree.photo_ref {
        out.push_str(&format!("  [{}]\n", photo));
    }
    if view.total > 1 {
        let dots: Vec<&str> = (0..view.total)
            .map(|i| if i == view.position { "●" } else { "○" })
            .collect();
        out.push_str(&format!("\n  {}\n", dots.join(" ")));
    }
    out
}

fn render_monthly(view: &MonthlyView) -> String {
    let mut out = String::new();
    match seasonal_theme(view.month) {
        Some(theme) => out.push_str(&format!(
            "{} {} Birthdays · {}\n\n",
            theme.emoji,
            month_name(view.month),
            theme.name
        )),
        None => out.push_str("Birthdays\n\n"),
    }

    if view.is_empty() {
        out.push_str("  No birthdays this month! 🎈\n");
        return out;
    }

    for honoree in &view.honorees {
        let name = match view.size_class {
            SizeClass::Large | SizeClass::Medium => honoree.name.to_uppercase(),
            SizeClass::Small | SizeClass::Compact => honoree.name.clone(),
        };
        out.push_str(&format!("  {:<32} {}\n", name, honoree.birthday()));
    }
    out
}

/// Prints every view it receives, separated by a rule.
pub struct ConsoleRenderer<W: Write + Send> {
    id: String,
    out: Mutex<W>,
}

impl<W: Write + Send> ConsoleRenderer<W> {
    pub fn new(id: impl Into<String>, out: W) -> Self {
        Self {
            id: id.into(),
            out: Mutex::new(out),
        }
    }

    pub fn show(&self, view: &View) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        let frame = render(view);
        if let Err(e) = writeln!(out, "{}\n{}", "─".repeat(48), frame)
            .and_then(|_| out.flush())
        {
            log::warn!("Failed to render view: {}", e);
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> DisplaySubscriber for ConsoleRenderer<W> {
    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn notify_view(&self, view: View) {
        self.show(&view);
    }
}
