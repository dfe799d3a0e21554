use crate::domain::models::Settings;
use chrono::{DateTime, Duration, Utc};

pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCKOUT_MINUTES: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Pin,
    Password,
}

impl SecretKind {
    fn label(self) -> &'static str {
        match self {
            Self::Pin => "PIN",
            Self::Password => "password",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Granted,
    Rejected { remaining_attempts: u32 },
    /// This attempt crossed the threshold.
    LockedOut { until: DateTime<Utc> },
    /// A previous lockout has not expired yet.
    StillLocked { until: DateTime<Utc> },
}

impl AttemptOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    pub fn message(&self, kind: SecretKind) -> String {
        match self {
            Self::Granted => "Access granted".to_string(),
            Self::Rejected { remaining_attempts } => format!(
                "Incorrect {}. {remaining_attempts} attempt(s) remaining.",
                kind.label()
            ),
            Self::LockedOut { .. } => format!(
                "Too many failed attempts. Locked for {LOCKOUT_MINUTES} minutes."
            ),
            Self::StillLocked { until } => format!(
                "Locked until {}.",
                until.format("%H:%M:%S UTC")
            ),
        }
    }
}

pub fn active_lockout(settings: &Settings, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    settings.lockout_until.filter(|until| *until > now)
}

/// Clears an expired lockout and its failed-attempt counter. Returns whether anything changed.
pub fn clear_expired_lockout(settings: &mut Settings, now: DateTime<Utc>) -> bool {
    match settings.lockout_until {
        Some(until) if until <= now => {
            settings.lockout_until = None;
            settings.failed_attempts = 0;
            true
        }
        _ => false,
    }
}

pub fn evaluate_attempt(
    settings: &mut Settings,
    kind: SecretKind,
    attempt: &str,
    now: DateTime<Utc>,
) -> AttemptOutcome {
    clear_expired_lockout(settings, now);
    if let Some(until) = active_lockout(settings, now) {
        return AttemptOutcome::StillLocked { until };
    }
    if !settings.gate_enabled() {
        return AttemptOutcome::Granted;
    }

    let (enabled, secret) = match kind {
        SecretKind::Pin => (settings.pin_enabled, settings.pin.as_str()),
        SecretKind::Password => (settings.password_enabled, settings.password.as_str()),
    };
    if !enabled {
        return AttemptOutcome::Rejected {
            remaining_attempts: MAX_FAILED_ATTEMPTS.saturating_sub(settings.failed_attempts),
        };
    }

    if attempt == secret {
        settings.failed_attempts = 0;
        settings.lockout_until = None;
        return AttemptOutcome::Granted;
    }

    settings.failed_attempts = settings.failed_attempts.saturating_add(1);
    if settings.failed_attempts >= MAX_FAILED_ATTEMPTS {
        let until = now + Duration::minutes(LOCKOUT_MINUTES);
        settings.lockout_until = Some(until);
        AttemptOutcome::LockedOut { until }
    } else {
        AttemptOutcome::Rejected {
            remaining_attempts: MAX_FAILED_ATTEMPTS - settings.failed_attempts,
        }
    }
}
