use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

pub const ALL_DAY_START: &str = "00:00";
pub const ALL_DAY_END: &str = "23:59";
pub const ALL_DAY_LABEL: &str = "All Day";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEvent {
    pub id: String,
    pub title: String,
    pub date_start: String,
    pub date_end: String,
    pub time_start: String,
    pub time_end: String,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventPhase {
    Upcoming,
    Ongoing,
    Completed,
}

impl ScheduleEvent {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "Event id")?;
        validate_non_empty(&self.title, "Title")?;
        let date_start = parse_date_field(&self.date_start, "Start date")?;
        let date_end = parse_date_field(&self.date_end, "End date")?;
        let time_start = parse_time_field(&self.time_start, "Start time")?;
        let time_end = parse_time_field(&self.time_end, "End time")?;

        if date_end < date_start {
            return Err("End date must be on or after start date".to_string());
        }
        if self.is_all_day() {
            return Ok(());
        }
        // Multi-day events end on a later date, so only same-day times are compared.
        if date_start == date_end && time_end <= time_start {
            return Err("End time must be after start time".to_string());
        }
        Ok(())
    }

    pub fn is_all_day(&self) -> bool {
        self.time_start == ALL_DAY_START && self.time_end == ALL_DAY_END
    }

    pub fn time_label(&self) -> String {
        if self.is_all_day() {
            ALL_DAY_LABEL.to_string()
        } else {
            format!("{} - {}", self.time_start, self.time_end)
        }
    }

    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        Some(parse_date(&self.date_start)?.and_time(parse_hhmm(&self.time_start)?))
    }

    pub fn ends_at(&self) -> Option<NaiveDateTime> {
        Some(parse_date(&self.date_end)?.and_time(parse_hhmm(&self.time_end)?))
    }

    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        match (parse_date(&self.date_start), parse_date(&self.date_end)) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }

    pub fn phase_at(&self, now: NaiveDateTime) -> EventPhase {
        let (Some(start), Some(end)) = (self.starts_at(), self.ends_at()) else {
            return EventPhase::Upcoming;
        };
        if now < start {
            EventPhase::Upcoming
        } else if now < end {
            EventPhase::Ongoing
        } else {
            EventPhase::Completed
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusKind {
    #[serde(rename = "CTO")]
    Cto,
    #[serde(rename = "FL")]
    Fl,
    #[serde(rename = "WFH")]
    Wfh,
    #[serde(rename = "TRAVEL")]
    Travel,
}

impl StatusKind {
    pub const ALL: [StatusKind; 4] = [Self::Cto, Self::Fl, Self::Wfh, Self::Travel];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cto => "CTO",
            Self::Fl => "FL",
            Self::Wfh => "WFH",
            Self::Travel => "TRAVEL",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelStatus {
    pub id: String,
    pub name: String,
    pub status: StatusKind,
    pub date_start: String,
    pub date_end: String,
    #[serde(default)]
    pub location: Option<String>,
}

impl PersonnelStatus {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "Personnel id")?;
        validate_non_empty(&self.name, "Name")?;
        let date_start = parse_date_field(&self.date_start, "Start date")?;
        let date_end = parse_date_field(&self.date_end, "End date")?;
        if date_end < date_start {
            return Err("End date must be on or after start date".to_string());
        }
        if self.status == StatusKind::Travel {
            let has_location = self
                .location
                .as_deref()
                .map(str::trim)
                .is_some_and(|value| !value.is_empty());
            if !has_location {
                return Err("Location is required for travel".to_string());
            }
        }
        Ok(())
    }

    /// Inclusive day-granularity containment of `date` in the status range.
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        match (parse_date(&self.date_start), parse_date(&self.date_end)) {
            (Some(start), Some(end)) => start <= date && date <= end,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub count: u32,
}

impl Project {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.id, "Project id")?;
        validate_non_empty(&self.name, "Project name")
    }

    pub fn increment(&mut self) {
        self.count = self.count.saturating_add(1);
    }

    pub fn decrement(&mut self) {
        self.count = self.count.saturating_sub(1);
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransitionStyle {
    Static,
    #[default]
    Fade,
    SlideUp,
    SlideLeft,
    VerticalAutoScroll,
    GentleContinuousScroll,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransitionSpeed {
    VerySlow,
    Slow,
    #[default]
    Normal,
    Fast,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusColors {
    pub upcoming: String,
    pub ongoing: String,
    pub completed: String,
}

impl Default for StatusColors {
    fn default() -> Self {
        Self {
            upcoming: "#3b82f6".to_string(),
            ongoing: "#22c55e".to_string(),
            completed: "#9ca3af".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub theme: String,
    pub transition_style: TransitionStyle,
    pub transition_speed: TransitionSpeed,
    pub custom_transition_seconds: f64,
    pub smooth_scroll_enabled: bool,
    pub status_colors: StatusColors,
    pub pin_enabled: bool,
    pub pin: String,
    pub password_enabled: bool,
    pub password: String,
    pub password_hint: Option<String>,
    pub recovery_email: Option<String>,
    pub failed_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            transition_style: TransitionStyle::default(),
            transition_speed: TransitionSpeed::default(),
            custom_transition_seconds: 1.0,
            smooth_scroll_enabled: true,
            status_colors: StatusColors::default(),
            pin_enabled: false,
            pin: String::new(),
            password_enabled: false,
            password: String::new(),
            password_hint: None,
            recovery_email: None,
            failed_attempts: 0,
            lockout_until: None,
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.theme, "Theme")?;
        if !self.custom_transition_seconds.is_finite() || self.custom_transition_seconds <= 0.0 {
            return Err("Custom transition seconds must be a positive number".to_string());
        }
        if self.pin_enabled
            && (self.pin.is_empty() || !self.pin.chars().all(|c| c.is_ascii_digit()))
        {
            return Err("PIN must contain digits only".to_string());
        }
        if self.password_enabled && self.password.trim().is_empty() {
            return Err("Password must not be empty".to_string());
        }
        if let Some(email) = self.recovery_email.as_deref().map(str::trim) {
            if !email.is_empty() && !email.contains('@') {
                return Err("Recovery email must contain '@'".to_string());
            }
        }
        Ok(())
    }

    pub fn gate_enabled(&self) -> bool {
        self.pin_enabled || self.password_enabled
    }

    pub fn status_color(&self, phase: EventPhase) -> &str {
        match phase {
            EventPhase::Upcoming => &self.status_colors.upcoming,
            EventPhase::Ongoing => &self.status_colors.ongoing,
            EventPhase::Completed => &self.status_colors.completed,
        }
    }

    pub fn recovery_address(&self) -> Option<&str> {
        self.recovery_email
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// The whole persisted state; stored and transmitted as one JSON blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Document {
    pub events: Vec<ScheduleEvent>,
    pub personnel: Vec<PersonnelStatus>,
    pub projects: Vec<Project>,
    pub settings: Settings,
}

impl Document {
    pub fn canonical_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn events_on(&self, date: NaiveDate) -> Vec<&ScheduleEvent> {
        self.events.iter().filter(|event| event.occurs_on(date)).collect()
    }

    pub fn active_personnel(&self, today: NaiveDate) -> Vec<&PersonnelStatus> {
        self.personnel
            .iter()
            .filter(|person| person.is_active_on(today))
            .collect()
    }

    pub fn group_by_status(&self, today: NaiveDate) -> Vec<(StatusKind, Vec<&PersonnelStatus>)> {
        let active = self.active_personnel(today);
        StatusKind::ALL
            .iter()
            .map(|kind| {
                (
                    *kind,
                    active
                        .iter()
                        .copied()
                        .filter(|person| person.status == *kind)
                        .collect(),
                )
            })
            .collect()
    }
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} is required"));
    }
    Ok(())
}

fn parse_date_field(value: &str, field_name: &str) -> Result<NaiveDate, String> {
    parse_date(value).ok_or_else(|| format!("{field_name} must be YYYY-MM-DD"))
}

fn parse_time_field(value: &str, field_name: &str) -> Result<NaiveTime, String> {
    parse_hhmm(value).ok_or_else(|| format!("{field_name} must be HH:MM"))
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

pub fn parse_hhmm(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    if value.len() != 5 {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}
