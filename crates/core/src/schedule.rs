//! Weekly work schedules
//!
//! Staff records arrive from the store in whatever shape they were saved in:
//! a per-day map, the older single window plus active weekdays, or nothing at
//! all. Everything is normalized once at load time into [`WeeklySchedule`] so
//! slot logic never has to re-check for missing fields.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Opening time used when a day has none (09:00)
pub const DEFAULT_START: NaiveTime = match NaiveTime::from_hms_opt(9, 0, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// Closing time used when a day has none (20:00)
pub const DEFAULT_END: NaiveTime = match NaiveTime::from_hms_opt(20, 0, 0) {
    Some(t) => t,
    None => NaiveTime::MIN,
};

/// Weekdays in storage order, Sunday first
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// Working hours for one weekday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySchedule {
    pub enabled: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl DaySchedule {
    pub fn new(enabled: bool, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            enabled,
            start,
            end,
        }
    }

    /// Default hours: Monday to Saturday 09:00-20:00, Sunday off
    pub fn default_for(weekday: Weekday) -> Self {
        Self {
            enabled: weekday != Weekday::Sun,
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }

    pub fn off() -> Self {
        Self {
            enabled: false,
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }
}

/// A staff member's recurring weekly availability.
///
/// Always fully populated with `start < end` on every day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RawSchedule", from = "RawSchedule")]
pub struct WeeklySchedule {
    days: [DaySchedule; 7],
}

impl Default for WeeklySchedule {
    fn default() -> Self {
        Self {
            days: WEEK.map(DaySchedule::default_for),
        }
    }
}

impl WeeklySchedule {
    /// Same hours on every listed weekday, every other day off
    pub fn uniform(start: NaiveTime, end: NaiveTime, working: &[Weekday]) -> Self {
        let mut schedule = Self::default();
        for weekday in WEEK {
            let day = if working.contains(&weekday) {
                DaySchedule::new(true, start, end)
            } else {
                DaySchedule::off()
            };
            schedule.set_day(weekday, day);
        }
        schedule
    }

    pub fn day(&self, weekday: Weekday) -> DaySchedule {
        self.days[weekday.num_days_from_sunday() as usize]
    }

    /// Replace one day. An inverted or empty window falls back to the default
    /// hours so the `start < end` invariant holds.
    pub fn set_day(&mut self, weekday: Weekday, mut day: DaySchedule) {
        if day.start >= day.end {
            day.start = DEFAULT_START;
            day.end = DEFAULT_END;
        }
        self.days[weekday.num_days_from_sunday() as usize] = day;
    }

    pub fn with_day(mut self, weekday: Weekday, day: DaySchedule) -> Self {
        self.set_day(weekday, day);
        self
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.day(date.weekday()).enabled
    }

    /// Working window for `date`, or `None` on a day off
    pub fn working_window(&self, date: NaiveDate) -> Option<(NaiveTime, NaiveTime)> {
        let day = self.day(date.weekday());
        day.enabled.then_some((day.start, day.end))
    }
}

/// Schedule as found in stored records, before normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSchedule {
    /// Older shape: one window plus the set of active weekdays
    Window {
        start: String,
        end: String,
        #[serde(default)]
        days: Vec<RawWeekday>,
    },
    /// Per-day entries keyed by weekday name or JS weekday index ("0" = Sunday)
    PerDay(BTreeMap<String, RawDay>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDay {
    #[serde(default, alias = "active")]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawWeekday {
    Index(u8),
    Name(String),
}

impl RawWeekday {
    fn weekday(&self) -> Option<Weekday> {
        match self {
            RawWeekday::Index(i) => weekday_from_index(*i),
            RawWeekday::Name(name) => parse_weekday(name),
        }
    }
}

/// Build a complete schedule from a raw record. Never fails.
pub fn normalize(raw: &RawSchedule) -> WeeklySchedule {
    let mut schedule = WeeklySchedule::default();

    match raw {
        RawSchedule::Window { start, end, days } => {
            let (start, end) = window_or_default(parse_time(start), parse_time(end));
            let active: Vec<Weekday> = days.iter().filter_map(RawWeekday::weekday).collect();
            for weekday in WEEK {
                let enabled = if active.is_empty() {
                    DaySchedule::default_for(weekday).enabled
                } else {
                    active.contains(&weekday)
                };
                schedule.set_day(weekday, DaySchedule::new(enabled, start, end));
            }
        }
        RawSchedule::PerDay(entries) => {
            let mut by_day: BTreeMap<u32, &RawDay> = BTreeMap::new();
            for (key, entry) in entries {
                if let Some(weekday) = parse_weekday(key) {
                    by_day.insert(weekday.num_days_from_sunday(), entry);
                }
            }
            for weekday in WEEK {
                let Some(entry) = by_day.get(&weekday.num_days_from_sunday()) else {
                    continue;
                };
                let fallback = DaySchedule::default_for(weekday);
                let (start, end) = window_or_default(
                    entry.start.as_deref().and_then(parse_time),
                    entry.end.as_deref().and_then(parse_time),
                );
                schedule.set_day(
                    weekday,
                    DaySchedule::new(entry.enabled.unwrap_or(fallback.enabled), start, end),
                );
            }
        }
    }

    schedule
}

/// Normalize a stored JSON value; absent or unreadable input yields the default
pub fn normalize_json(value: Option<&serde_json::Value>) -> WeeklySchedule {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return WeeklySchedule::default();
    };

    match serde_json::from_value::<RawSchedule>(value.clone()) {
        Ok(raw) => normalize(&raw),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable schedule, using defaults");
            WeeklySchedule::default()
        }
    }
}

impl From<RawSchedule> for WeeklySchedule {
    fn from(raw: RawSchedule) -> Self {
        normalize(&raw)
    }
}

impl From<WeeklySchedule> for RawSchedule {
    fn from(schedule: WeeklySchedule) -> Self {
        let entries = WEEK
            .iter()
            .map(|&weekday| {
                let day = schedule.day(weekday);
                (
                    weekday_name(weekday).to_string(),
                    RawDay {
                        enabled: Some(day.enabled),
                        start: Some(day.start.format("%H:%M").to_string()),
                        end: Some(day.end.format("%H:%M").to_string()),
                    },
                )
            })
            .collect();
        RawSchedule::PerDay(entries)
    }
}

fn window_or_default(
    start: Option<NaiveTime>,
    end: Option<NaiveTime>,
) -> (NaiveTime, NaiveTime) {
    match (start, end) {
        (Some(start), Some(end)) if start < end => (start, end),
        (Some(start), None) if start < DEFAULT_END => (start, DEFAULT_END),
        (None, Some(end)) if DEFAULT_START < end => (DEFAULT_START, end),
        _ => (DEFAULT_START, DEFAULT_END),
    }
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

pub fn parse_weekday(value: &str) -> Option<Weekday> {
    let value = value.trim().to_lowercase();
    if let Ok(index) = value.parse::<u8>() {
        return weekday_from_index(index);
    }
    match value.as_str() {
        "sunday" | "sun" | "domingo" | "dom" => Some(Weekday::Sun),
        "monday" | "mon" | "lunes" | "lun" => Some(Weekday::Mon),
        "tuesday" | "tue" | "martes" | "mar" => Some(Weekday::Tue),
        "wednesday" | "wed" | "miercoles" | "miércoles" | "mie" | "mié" => Some(Weekday::Wed),
        "thursday" | "thu" | "jueves" | "jue" => Some(Weekday::Thu),
        "friday" | "fri" | "viernes" | "vie" => Some(Weekday::Fri),
        "saturday" | "sat" | "sabado" | "sábado" | "sab" | "sáb" => Some(Weekday::Sat),
        _ => None,
    }
}

/// JS convention: 0 = Sunday
fn weekday_from_index(index: u8) -> Option<Weekday> {
    WEEK.get(index as usize).copied()
}

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    // 2030-01-06 is a Sunday
    fn sunday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 6).unwrap()
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 7).unwrap()
    }

    #[test]
    fn default_schedule_is_mon_to_sat() {
        let schedule = WeeklySchedule::default();
        assert!(!schedule.is_working_day(sunday()));
        assert!(schedule.is_working_day(monday()));
        assert_eq!(schedule.working_window(monday()), Some((t(9, 0), t(20, 0))));
        assert_eq!(schedule.working_window(sunday()), None);
    }

    #[test]
    fn missing_schedule_normalizes_to_default() {
        assert_eq!(normalize_json(None), WeeklySchedule::default());
        assert_eq!(
            normalize_json(Some(&serde_json::Value::Null)),
            WeeklySchedule::default()
        );
        assert_eq!(
            normalize_json(Some(&json!("garbage"))),
            WeeklySchedule::default()
        );
    }

    #[test]
    fn per_day_map_fills_missing_days() {
        let value = json!({
            "monday": { "enabled": true, "start": "10:00", "end": "14:00" },
            "0": { "enabled": true, "start": "11:00", "end": "13:00" }
        });
        let schedule = normalize_json(Some(&value));

        assert_eq!(schedule.working_window(monday()), Some((t(10, 0), t(14, 0))));
        assert_eq!(schedule.working_window(sunday()), Some((t(11, 0), t(13, 0))));
        assert_eq!(schedule.day(Weekday::Tue), DaySchedule::default_for(Weekday::Tue));
    }

    #[test]
    fn inverted_window_falls_back_to_default_hours() {
        let value = json!({
            "monday": { "enabled": true, "start": "18:00", "end": "09:00" },
            "tuesday": { "enabled": true, "start": "nope" }
        });
        let schedule = normalize_json(Some(&value));

        let monday = schedule.day(Weekday::Mon);
        assert!(monday.enabled);
        assert_eq!((monday.start, monday.end), (DEFAULT_START, DEFAULT_END));
        assert_eq!(schedule.day(Weekday::Tue).start, DEFAULT_START);
    }

    #[test]
    fn legacy_window_with_active_days() {
        let value = json!({ "start": "08:30", "end": "17:00", "days": [1, 2, "wednesday"] });
        let schedule = normalize_json(Some(&value));

        assert_eq!(schedule.working_window(monday()), Some((t(8, 30), t(17, 0))));
        assert!(schedule.day(Weekday::Wed).enabled);
        assert!(!schedule.day(Weekday::Thu).enabled);
        assert!(!schedule.day(Weekday::Sun).enabled);
    }

    #[test]
    fn serde_round_trip_keeps_schedule() {
        let schedule = WeeklySchedule::uniform(t(9, 0), t(18, 0), &[Weekday::Mon, Weekday::Sat])
            .with_day(Weekday::Sun, DaySchedule::new(true, t(10, 0), t(12, 0)));

        let text = serde_json::to_string(&schedule).unwrap();
        let back: WeeklySchedule = serde_json::from_str(&text).unwrap();
        assert_eq!(back, schedule);
    }

    #[test]
    fn parses_short_and_long_times() {
        assert_eq!(parse_time("9:00"), Some(t(9, 0)));
        assert_eq!(parse_time("09:30:00"), Some(t(9, 30)));
        assert_eq!(parse_time("25:00"), None);
    }
}
