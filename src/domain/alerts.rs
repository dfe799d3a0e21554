use crate::domain::models::ScheduleEvent;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::HashSet;

pub const DEFAULT_LEAD_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f64,
    pub duration_ms: u64,
}

/// C5, E5, G5.
pub const CHIME: [Tone; 3] = [
    Tone {
        frequency_hz: 523.25,
        duration_ms: 150,
    },
    Tone {
        frequency_hz: 659.25,
        duration_ms: 150,
    },
    Tone {
        frequency_hz: 783.99,
        duration_ms: 150,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpcomingAlert {
    pub event_id: String,
    pub title: String,
    pub minutes_until: i64,
    pub time_label: String,
}

/// Today's timed events starting between 1 and `lead_minutes` minutes after `now`.
///
/// Minutes are rounded up, so an event 30 seconds away reports 1 minute.
pub fn upcoming_alerts(
    events: &[ScheduleEvent],
    now: NaiveDateTime,
    lead_minutes: i64,
    dismissed: &HashSet<String>,
) -> Vec<UpcomingAlert> {
    let today = now.date();
    let mut alerts: Vec<UpcomingAlert> = events
        .iter()
        .filter(|event| !event.is_all_day())
        .filter(|event| !dismissed.contains(&event.id))
        .filter_map(|event| {
            let starts_at = event.starts_at()?;
            if starts_at.date() != today {
                return None;
            }
            let seconds = (starts_at - now).num_seconds();
            if seconds <= 0 {
                return None;
            }
            let minutes_until = (seconds + 59) / 60;
            if !(1..=lead_minutes).contains(&minutes_until) {
                return None;
            }
            Some(UpcomingAlert {
                event_id: event.id.clone(),
                title: event.title.clone(),
                minutes_until,
                time_label: event.time_label(),
            })
        })
        .collect();

    alerts.sort_by(|a, b| {
        a.minutes_until
            .cmp(&b.minutes_until)
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
    alerts
}
