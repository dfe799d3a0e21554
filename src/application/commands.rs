use crate::application::document_sync::SyncClient;
use crate::domain::access::{clear_expired_lockout, evaluate_attempt, AttemptOutcome, SecretKind};
use crate::domain::models::{
    Document, EventPhase, PersonnelStatus, Project, ScheduleEvent, Settings, StatusColors,
    StatusKind, TransitionSpeed, TransitionStyle, ALL_DAY_END, ALL_DAY_START,
};
use crate::infrastructure::dashboard_client::{EmailKind, EmailRequest};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

const LOCKOUT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    let sequence = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{sequence}", Utc::now().timestamp_micros())
}

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Session-scoped flag set once the PIN/password gate has been passed.
#[derive(Debug, Default)]
pub struct SessionMarker {
    unlocked: AtomicBool,
}

impl SessionMarker {
    pub fn is_unlocked(&self) -> bool {
        self.unlocked.load(Ordering::SeqCst)
    }

    pub fn unlock(&self) {
        self.unlocked.store(true, Ordering::SeqCst);
    }

    pub fn lock(&self) {
        self.unlocked.store(false, Ordering::SeqCst);
    }
}

pub struct Dashboard {
    sync: SyncClient,
    session: SessionMarker,
    timezone: Tz,
    now_provider: NowProvider,
}

impl Dashboard {
    pub fn new(sync: SyncClient, timezone: Tz) -> Self {
        Self {
            sync,
            session: SessionMarker::default(),
            timezone,
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn sync(&self) -> &SyncClient {
        &self.sync
    }

    pub fn session(&self) -> &SessionMarker {
        &self.session
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn local_now(&self) -> NaiveDateTime {
        self.now().with_timezone(&self.timezone).naive_local()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        tracing::info!(command, "{message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        tracing::error!(command, "{message}");
    }

    /// Clears an expired lockout once a second until the handle is dropped.
    pub fn start_lockout_watcher(&self) -> LockoutWatcher {
        let sync = self.sync.clone();
        let now_provider = Arc::clone(&self.now_provider);
        let task = tokio::spawn(async move {
            let mut ticker = interval(LOCKOUT_CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let now = now_provider();
                let expired = sync
                    .snapshot()
                    .settings
                    .lockout_until
                    .is_some_and(|until| until <= now);
                if !expired {
                    continue;
                }
                let cleared = sync.mutate(|document| {
                    Ok(clear_expired_lockout(&mut document.settings, now))
                });
                match cleared {
                    Ok(true) => tracing::info!("lockout expired; failed attempts reset"),
                    Ok(false) => {}
                    Err(error) => tracing::warn!(error = %error, "could not clear expired lockout"),
                }
            }
        });
        LockoutWatcher { task }
    }

    /// Applies a gated change: with PIN or password enabled, the session must
    /// have been unlocked first.
    fn mutate_protected<T, F>(&self, change: F) -> Result<T, InfraError>
    where
        F: FnOnce(&mut Document) -> Result<T, InfraError>,
    {
        let unlocked = self.session.is_unlocked();
        self.sync.mutate(|document| {
            if document.settings.gate_enabled() && !unlocked {
                return Err(InfraError::AccessDenied(
                    "unlock with PIN or password first".to_string(),
                ));
            }
            change(document)
        })
    }
}

#[derive(Debug)]
pub struct LockoutWatcher {
    task: JoinHandle<()>,
}

impl Drop for LockoutWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventInput {
    pub title: String,
    pub date_start: String,
    #[serde(default)]
    pub date_end: Option<String>,
    #[serde(default)]
    pub time_start: String,
    #[serde(default)]
    pub time_end: String,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub details: Option<String>,
}

impl EventInput {
    fn into_event(self, id: String) -> Result<ScheduleEvent, InfraError> {
        let date_start = self.date_start.trim().to_string();
        let date_end = self
            .date_end
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| date_start.clone());
        let (time_start, time_end) = if self.all_day {
            (ALL_DAY_START.to_string(), ALL_DAY_END.to_string())
        } else {
            (
                self.time_start.trim().to_string(),
                self.time_end.trim().to_string(),
            )
        };

        let event = ScheduleEvent {
            id,
            title: self.title.trim().to_string(),
            date_start,
            date_end,
            time_start,
            time_end,
            details: trimmed_option(self.details),
        };
        event.validate().map_err(InfraError::Validation)?;
        Ok(event)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonnelInput {
    pub name: String,
    pub status: StatusKind,
    pub date_start: String,
    #[serde(default)]
    pub date_end: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl PersonnelInput {
    fn into_personnel(self, id: String) -> Result<PersonnelStatus, InfraError> {
        let date_start = self.date_start.trim().to_string();
        let date_end = self
            .date_end
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| date_start.clone());
        let person = PersonnelStatus {
            id,
            name: self.name.trim().to_string(),
            status: self.status,
            date_start,
            date_end,
            location: trimmed_option(self.location),
        };
        person.validate().map_err(InfraError::Validation)?;
        Ok(person)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub theme: Option<String>,
    pub transition_style: Option<TransitionStyle>,
    pub transition_speed: Option<TransitionSpeed>,
    pub custom_transition_seconds: Option<f64>,
    pub smooth_scroll_enabled: Option<bool>,
    pub status_colors: Option<StatusColors>,
    pub pin_enabled: Option<bool>,
    pub pin: Option<String>,
    pub password_enabled: Option<bool>,
    pub password: Option<String>,
    pub password_hint: Option<String>,
    pub recovery_email: Option<String>,
}

impl SettingsUpdate {
    fn apply(self, settings: &mut Settings) {
        if let Some(theme) = self.theme {
            settings.theme = theme.trim().to_string();
        }
        if let Some(style) = self.transition_style {
            settings.transition_style = style;
        }
        if let Some(speed) = self.transition_speed {
            settings.transition_speed = speed;
        }
        if let Some(seconds) = self.custom_transition_seconds {
            settings.custom_transition_seconds = seconds;
        }
        if let Some(smooth) = self.smooth_scroll_enabled {
            settings.smooth_scroll_enabled = smooth;
        }
        if let Some(colors) = self.status_colors {
            settings.status_colors = colors;
        }
        if let Some(enabled) = self.pin_enabled {
            settings.pin_enabled = enabled;
        }
        if let Some(pin) = self.pin {
            settings.pin = pin.trim().to_string();
        }
        if let Some(enabled) = self.password_enabled {
            settings.password_enabled = enabled;
        }
        if let Some(password) = self.password {
            settings.password = password;
        }
        if let Some(hint) = self.password_hint {
            settings.password_hint = trimmed_option(Some(hint));
        }
        if let Some(email) = self.recovery_email {
            settings.recovery_email = trimmed_option(Some(email));
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockResponse {
    pub granted: bool,
    pub message: String,
    pub remaining_attempts: Option<u32>,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailDispatch {
    pub sent: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCard {
    pub id: String,
    pub title: String,
    pub time_label: String,
    pub phase: EventPhase,
    pub color: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonnelColumn {
    pub status: StatusKind,
    pub people: Vec<PersonnelStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayOverview {
    pub loading: bool,
    pub date: NaiveDate,
    pub events: Vec<EventCard>,
    pub personnel: Vec<PersonnelColumn>,
    pub projects: Vec<Project>,
}

/// What the board shows for the current local day. While the initial load is
/// outstanding the lists stay empty instead of showing default data.
pub fn today_overview_impl(dashboard: &Dashboard) -> TodayOverview {
    let now = dashboard.local_now();
    let today = now.date();
    if dashboard.sync.is_loading() {
        return TodayOverview {
            loading: true,
            date: today,
            events: Vec::new(),
            personnel: Vec::new(),
            projects: Vec::new(),
        };
    }

    let document = dashboard.sync.snapshot();
    let mut events = document.events_on(today);
    events.sort_by(|left, right| {
        (left.date_start.as_str(), left.time_start.as_str())
            .cmp(&(right.date_start.as_str(), right.time_start.as_str()))
    });
    let events = events
        .into_iter()
        .map(|event| {
            let phase = event.phase_at(now);
            EventCard {
                id: event.id.clone(),
                title: event.title.clone(),
                time_label: event.time_label(),
                phase,
                color: document.settings.status_color(phase).to_string(),
                details: event.details.clone(),
            }
        })
        .collect();

    let personnel = document
        .group_by_status(today)
        .into_iter()
        .map(|(status, people)| PersonnelColumn {
            status,
            people: people.into_iter().cloned().collect(),
        })
        .collect();

    TodayOverview {
        loading: false,
        date: today,
        events,
        personnel,
        projects: document.projects.clone(),
    }
}

pub fn add_event_impl(dashboard: &Dashboard, input: EventInput) -> Result<ScheduleEvent, InfraError> {
    let event = input.into_event(next_id("evt"))?;
    let created = event.clone();
    dashboard.mutate_protected(move |document| {
        document.events.push(event);
        Ok(())
    })?;
    dashboard.log_info("add_event", &format!("created event_id={}", created.id));
    Ok(created)
}

pub fn update_event_impl(
    dashboard: &Dashboard,
    event_id: String,
    input: EventInput,
) -> Result<ScheduleEvent, InfraError> {
    let event_id = required_id(&event_id, "event_id")?;
    let updated = input.into_event(event_id.to_string())?;
    let stored = updated.clone();
    dashboard.mutate_protected(move |document| {
        let Some(slot) = document.events.iter_mut().find(|event| event.id == stored.id) else {
            return Err(InfraError::NotFound(format!("event not found: {}", stored.id)));
        };
        *slot = stored;
        Ok(())
    })?;
    dashboard.log_info("update_event", &format!("updated event_id={event_id}"));
    Ok(updated)
}

pub fn delete_event_impl(dashboard: &Dashboard, event_id: String) -> Result<bool, InfraError> {
    let event_id = required_id(&event_id, "event_id")?;
    let removed = dashboard.mutate_protected(|document| {
        let before = document.events.len();
        document.events.retain(|event| event.id != event_id);
        Ok(document.events.len() != before)
    })?;
    if removed {
        dashboard.log_info("delete_event", &format!("deleted event_id={event_id}"));
    }
    Ok(removed)
}

pub fn add_personnel_impl(
    dashboard: &Dashboard,
    input: PersonnelInput,
) -> Result<PersonnelStatus, InfraError> {
    let person = input.into_personnel(next_id("per"))?;
    let created = person.clone();
    dashboard.mutate_protected(move |document| {
        document.personnel.push(person);
        Ok(())
    })?;
    dashboard.log_info("add_personnel", &format!("created personnel_id={}", created.id));
    Ok(created)
}

pub fn update_personnel_impl(
    dashboard: &Dashboard,
    personnel_id: String,
    input: PersonnelInput,
) -> Result<PersonnelStatus, InfraError> {
    let personnel_id = required_id(&personnel_id, "personnel_id")?;
    let updated = input.into_personnel(personnel_id.to_string())?;
    let stored = updated.clone();
    dashboard.mutate_protected(move |document| {
        let Some(slot) = document
            .personnel
            .iter_mut()
            .find(|person| person.id == stored.id)
        else {
            return Err(InfraError::NotFound(format!(
                "personnel not found: {}",
                stored.id
            )));
        };
        *slot = stored;
        Ok(())
    })?;
    dashboard.log_info(
        "update_personnel",
        &format!("updated personnel_id={personnel_id}"),
    );
    Ok(updated)
}

pub fn delete_personnel_impl(dashboard: &Dashboard, personnel_id: String) -> Result<bool, InfraError> {
    let personnel_id = required_id(&personnel_id, "personnel_id")?;
    let removed = dashboard.mutate_protected(|document| {
        let before = document.personnel.len();
        document.personnel.retain(|person| person.id != personnel_id);
        Ok(document.personnel.len() != before)
    })?;
    if removed {
        dashboard.log_info(
            "delete_personnel",
            &format!("deleted personnel_id={personnel_id}"),
        );
    }
    Ok(removed)
}

pub fn add_project_impl(dashboard: &Dashboard, name: String) -> Result<Project, InfraError> {
    let project = Project {
        id: next_id("prj"),
        name: name.trim().to_string(),
        count: 0,
    };
    project.validate().map_err(InfraError::Validation)?;
    let created = project.clone();
    dashboard.mutate_protected(move |document| {
        document.projects.push(project);
        Ok(())
    })?;
    dashboard.log_info("add_project", &format!("created project_id={}", created.id));
    Ok(created)
}

pub fn update_project_impl(
    dashboard: &Dashboard,
    project_id: String,
    name: String,
    count: i64,
) -> Result<Project, InfraError> {
    let project_id = required_id(&project_id, "project_id")?;
    let count = u32::try_from(count).map_err(|_| {
        InfraError::Validation("Count must be a non-negative whole number".to_string())
    })?;
    let updated = Project {
        id: project_id.to_string(),
        name: name.trim().to_string(),
        count,
    };
    updated.validate().map_err(InfraError::Validation)?;
    let stored = updated.clone();
    dashboard.mutate_protected(move |document| {
        let Some(slot) = document
            .projects
            .iter_mut()
            .find(|project| project.id == stored.id)
        else {
            return Err(InfraError::NotFound(format!("project not found: {}", stored.id)));
        };
        *slot = stored;
        Ok(())
    })?;
    dashboard.log_info("update_project", &format!("updated project_id={project_id}"));
    Ok(updated)
}

pub fn delete_project_impl(dashboard: &Dashboard, project_id: String) -> Result<bool, InfraError> {
    let project_id = required_id(&project_id, "project_id")?;
    let removed = dashboard.mutate_protected(|document| {
        let before = document.projects.len();
        document.projects.retain(|project| project.id != project_id);
        Ok(document.projects.len() != before)
    })?;
    if removed {
        dashboard.log_info("delete_project", &format!("deleted project_id={project_id}"));
    }
    Ok(removed)
}

pub fn increment_project_impl(dashboard: &Dashboard, project_id: String) -> Result<Project, InfraError> {
    adjust_project(dashboard, &project_id, Project::increment)
}

pub fn decrement_project_impl(dashboard: &Dashboard, project_id: String) -> Result<Project, InfraError> {
    adjust_project(dashboard, &project_id, Project::decrement)
}

fn adjust_project(
    dashboard: &Dashboard,
    project_id: &str,
    adjust: fn(&mut Project),
) -> Result<Project, InfraError> {
    let project_id = required_id(project_id, "project_id")?;
    dashboard.mutate_protected(|document| {
        let Some(project) = document
            .projects
            .iter_mut()
            .find(|project| project.id == project_id)
        else {
            return Err(InfraError::NotFound(format!("project not found: {project_id}")));
        };
        adjust(project);
        Ok(project.clone())
    })
}

pub fn update_settings_impl(
    dashboard: &Dashboard,
    update: SettingsUpdate,
) -> Result<Settings, InfraError> {
    let settings = dashboard.mutate_protected(|document| {
        let mut next = document.settings.clone();
        update.apply(&mut next);
        next.validate().map_err(InfraError::Validation)?;
        document.settings = next.clone();
        Ok(next)
    })?;
    // Whoever just configured the gate has already passed it.
    if settings.gate_enabled() {
        dashboard.session.unlock();
    }
    dashboard.log_info("update_settings", "settings updated");
    Ok(settings)
}

pub async fn unlock_impl(
    dashboard: &Dashboard,
    kind: SecretKind,
    attempt: String,
) -> Result<UnlockResponse, InfraError> {
    let now = dashboard.now();
    let (outcome, recovery_address) = dashboard.sync.mutate(|document| {
        let outcome = evaluate_attempt(&mut document.settings, kind, &attempt, now);
        Ok((
            outcome,
            document.settings.recovery_address().map(ToOwned::to_owned),
        ))
    })?;

    let response = UnlockResponse {
        granted: outcome.is_granted(),
        message: outcome.message(kind),
        remaining_attempts: match &outcome {
            AttemptOutcome::Rejected { remaining_attempts } => Some(*remaining_attempts),
            _ => None,
        },
        locked_until: match &outcome {
            AttemptOutcome::LockedOut { until } | AttemptOutcome::StillLocked { until } => {
                Some(*until)
            }
            _ => None,
        },
    };

    match &outcome {
        AttemptOutcome::Granted => {
            dashboard.session.unlock();
            dashboard.log_info("unlock", "access granted");
        }
        AttemptOutcome::LockedOut { until } => {
            dashboard.log_error("unlock", &format!("locked out until {}", until.to_rfc3339()));
            if let Some(to) = recovery_address {
                dispatch_email(
                    dashboard,
                    EmailRequest {
                        to,
                        subject: "Statusboard locked".to_string(),
                        body: format!(
                            "Too many failed attempts. Access is locked until {}.",
                            until.to_rfc3339()
                        ),
                        kind: EmailKind::Lockout,
                    },
                )
                .await;
            }
        }
        AttemptOutcome::Rejected { .. } | AttemptOutcome::StillLocked { .. } => {
            dashboard.log_info("unlock", &response.message);
        }
    }
    Ok(response)
}

/// Ends the unlocked session; gated commands need a fresh unlock.
pub fn lock_impl(dashboard: &Dashboard) {
    dashboard.session.lock();
    dashboard.log_info("lock", "session locked");
}

pub async fn send_password_hint_impl(dashboard: &Dashboard) -> Result<EmailDispatch, InfraError> {
    let document = dashboard.sync.snapshot();
    let to = recovery_address(&document.settings)?;
    let Some(hint) = document.settings.password_hint.clone() else {
        return Err(InfraError::Validation("No password hint is set".to_string()));
    };
    Ok(dispatch_email(
        dashboard,
        EmailRequest {
            to,
            subject: "Statusboard password hint".to_string(),
            body: format!("Your password hint: {hint}"),
            kind: EmailKind::Hint,
        },
    )
    .await)
}

pub async fn request_recovery_impl(dashboard: &Dashboard) -> Result<EmailDispatch, InfraError> {
    let document = dashboard.sync.snapshot();
    let to = recovery_address(&document.settings)?;
    let mut body = "A recovery request was made for the Statusboard dashboard.".to_string();
    if let Some(hint) = document.settings.password_hint.as_deref() {
        body.push_str(&format!(" Password hint: {hint}"));
    }
    Ok(dispatch_email(
        dashboard,
        EmailRequest {
            to,
            subject: "Statusboard recovery".to_string(),
            body,
            kind: EmailKind::Recovery,
        },
    )
    .await)
}

fn recovery_address(settings: &Settings) -> Result<String, InfraError> {
    settings
        .recovery_address()
        .map(ToOwned::to_owned)
        .ok_or_else(|| InfraError::Validation("No recovery email is set".to_string()))
}

/// Email failures are logged and reported as not sent.
async fn dispatch_email(dashboard: &Dashboard, request: EmailRequest) -> EmailDispatch {
    let kind = request.kind.as_str();
    match dashboard.sync.remote().send_email(&request).await {
        Ok(response) => {
            if response.success {
                dashboard.log_info("send_email", &format!("{kind} email sent"));
            } else {
                tracing::warn!(kind, message = %response.message, "email rejected");
            }
            EmailDispatch {
                sent: response.success,
                message: response.message,
            }
        }
        Err(error) => {
            tracing::warn!(kind, error = %error, "email dispatch failed");
            EmailDispatch {
                sent: false,
                message: "Email could not be sent".to_string(),
            }
        }
    }
}

fn required_id<'a>(value: &'a str, field_name: &str) -> Result<&'a str, InfraError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(InfraError::Validation(format!("{field_name} must not be empty")));
    }
    Ok(value)
}

fn trimmed_option(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::access::MAX_FAILED_ATTEMPTS;
    use crate::infrastructure::dashboard_client::InMemoryDashboardRemote;
    use tokio::time::sleep;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    async fn loaded_dashboard(document: Document) -> (Dashboard, Arc<InMemoryDashboardRemote>) {
        let remote = Arc::new(InMemoryDashboardRemote::with_document(document));
        let sync = SyncClient::new(remote.clone());
        sync.pull().await;
        let dashboard = Dashboard::new(sync, Tz::UTC)
            .with_now_provider(Arc::new(|| fixed_time("2024-01-02T09:15:00Z")));
        (dashboard, remote)
    }

    fn event_input(start: &str, end: &str) -> EventInput {
        EventInput {
            title: "Standup".to_string(),
            date_start: "2024-01-02".to_string(),
            time_start: start.to_string(),
            time_end: end.to_string(),
            ..EventInput::default()
        }
    }

    fn gated_document() -> Document {
        Document {
            settings: Settings {
                password_enabled: true,
                password: "hunter2".to_string(),
                recovery_email: Some("ops@example.com".to_string()),
                password_hint: Some("classic".to_string()),
                ..Settings::default()
            },
            ..Document::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn event_ending_before_start_is_rejected() {
        let (dashboard, _remote) = loaded_dashboard(Document::default()).await;
        let result = add_event_impl(&dashboard, event_input("09:00", "08:00"));
        match result {
            Err(InfraError::Validation(message)) => {
                assert_eq!(message, "End time must be after start time");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(dashboard.sync().snapshot().events.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn all_day_event_renders_all_day_label() {
        let (dashboard, remote) = loaded_dashboard(Document::default()).await;
        let mut input = event_input("", "");
        input.all_day = true;
        let created = add_event_impl(&dashboard, input).expect("add event");
        assert!(created.id.starts_with("evt-"));

        let overview = today_overview_impl(&dashboard);
        assert_eq!(overview.events.len(), 1);
        assert_eq!(overview.events[0].time_label, "All Day");
        assert_eq!(overview.events[0].phase, EventPhase::Ongoing);
        assert_eq!(overview.events[0].color, "#22c55e");

        sleep(Duration::from_secs(1)).await;
        let stored = remote.stored_document().expect("load").expect("stored");
        assert_eq!(stored.events, vec![created]);
    }

    #[tokio::test(start_paused = true)]
    async fn decrement_at_zero_stays_at_zero() {
        let (dashboard, _remote) = loaded_dashboard(Document::default()).await;
        let project = add_project_impl(&dashboard, "Support tickets".to_string()).expect("add");
        let after = decrement_project_impl(&dashboard, project.id.clone()).expect("decrement");
        assert_eq!(after.count, 0);

        increment_project_impl(&dashboard, project.id.clone()).expect("increment");
        let after = increment_project_impl(&dashboard, project.id.clone()).expect("increment");
        assert_eq!(after.count, 2);

        assert!(matches!(
            update_project_impl(&dashboard, project.id.clone(), "Tickets".to_string(), -1),
            Err(InfraError::Validation(_))
        ));
        let edited = update_project_impl(&dashboard, project.id, "Tickets".to_string(), 7)
            .expect("edit project");
        assert_eq!(edited.count, 7);
        assert_eq!(edited.name, "Tickets");
    }

    #[tokio::test(start_paused = true)]
    async fn personnel_in_range_is_active_today() {
        let (dashboard, _remote) = loaded_dashboard(Document::default()).await;
        add_personnel_impl(
            &dashboard,
            PersonnelInput {
                name: "Dana".to_string(),
                status: StatusKind::Wfh,
                date_start: "2024-01-01".to_string(),
                date_end: Some("2024-01-03".to_string()),
                location: None,
            },
        )
        .expect("add personnel");

        let travel = add_personnel_impl(
            &dashboard,
            PersonnelInput {
                name: "Lee".to_string(),
                status: StatusKind::Travel,
                date_start: "2024-01-02".to_string(),
                date_end: None,
                location: None,
            },
        );
        assert!(matches!(travel, Err(InfraError::Validation(_))));

        let overview = today_overview_impl(&dashboard);
        let wfh = overview
            .personnel
            .iter()
            .find(|column| column.status == StatusKind::Wfh)
            .expect("wfh column");
        assert_eq!(wfh.people.len(), 1);
        assert_eq!(wfh.people[0].name, "Dana");
    }

    #[tokio::test(start_paused = true)]
    async fn update_and_delete_report_missing_ids() {
        let (dashboard, _remote) = loaded_dashboard(Document::default()).await;
        let missing = update_event_impl(&dashboard, "evt-missing".to_string(), event_input("09:00", "10:00"));
        assert!(matches!(missing, Err(InfraError::NotFound(_))));
        assert!(!delete_event_impl(&dashboard, "evt-missing".to_string()).expect("delete"));

        let created = add_event_impl(&dashboard, event_input("09:00", "10:00")).expect("add");
        let mut changed = event_input("10:00", "11:00");
        changed.title = "Retro".to_string();
        let updated = update_event_impl(&dashboard, created.id.clone(), changed).expect("update");
        assert_eq!(updated.id, created.id);
        assert_eq!(dashboard.sync().snapshot().events[0].title, "Retro");
        assert!(delete_event_impl(&dashboard, created.id).expect("delete"));
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_missing_items_pushes_nothing() {
        let (dashboard, remote) = loaded_dashboard(Document::default()).await;
        assert!(!delete_event_impl(&dashboard, "evt-missing".to_string()).expect("delete event"));
        assert!(!delete_personnel_impl(&dashboard, "per-missing".to_string()).expect("delete personnel"));
        assert!(!delete_project_impl(&dashboard, "prj-missing".to_string()).expect("delete project"));
        assert!(!dashboard.sync().has_pending_push());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(remote.push_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn mutations_are_rejected_while_loading() {
        let remote = Arc::new(InMemoryDashboardRemote::default());
        let dashboard = Dashboard::new(SyncClient::new(remote), Tz::UTC);
        assert!(matches!(
            add_project_impl(&dashboard, "Early".to_string()),
            Err(InfraError::NotLoaded)
        ));
        let overview = today_overview_impl(&dashboard);
        assert!(overview.loading);
        assert!(overview.projects.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn gated_mutations_require_unlock() {
        let (dashboard, _remote) = loaded_dashboard(gated_document()).await;
        assert!(matches!(
            add_project_impl(&dashboard, "Tickets".to_string()),
            Err(InfraError::AccessDenied(_))
        ));

        let response = unlock_impl(&dashboard, SecretKind::Password, "hunter2".to_string())
            .await
            .expect("unlock");
        assert!(response.granted);
        assert!(dashboard.session().is_unlocked());
        add_project_impl(&dashboard, "Tickets".to_string()).expect("add after unlock");

        lock_impl(&dashboard);
        assert!(!dashboard.session().is_unlocked());
        assert!(matches!(
            add_project_impl(&dashboard, "Again".to_string()),
            Err(InfraError::AccessDenied(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn five_failures_lock_out_and_email_recovery_address() {
        let (dashboard, remote) = loaded_dashboard(gated_document()).await;

        for attempt in 1..MAX_FAILED_ATTEMPTS {
            let response = unlock_impl(&dashboard, SecretKind::Password, "wrong".to_string())
                .await
                .expect("attempt");
            assert!(!response.granted);
            assert_eq!(response.remaining_attempts, Some(MAX_FAILED_ATTEMPTS - attempt));
        }
        let response = unlock_impl(&dashboard, SecretKind::Password, "wrong".to_string())
            .await
            .expect("final attempt");
        assert_eq!(
            response.locked_until,
            Some(fixed_time("2024-01-02T09:20:00Z"))
        );

        let settings = dashboard.sync().snapshot().settings.clone();
        assert_eq!(settings.failed_attempts, MAX_FAILED_ATTEMPTS);
        assert_eq!(settings.lockout_until, Some(fixed_time("2024-01-02T09:20:00Z")));

        let emails = remote.sent_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].kind, EmailKind::Lockout);
        assert_eq!(emails[0].to, "ops@example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn lockout_watcher_clears_expired_lockout() {
        let mut document = gated_document();
        document.settings.failed_attempts = MAX_FAILED_ATTEMPTS;
        document.settings.lockout_until = Some(fixed_time("2024-01-02T09:10:00Z"));
        let (dashboard, _remote) = loaded_dashboard(document).await;

        let watcher = dashboard.start_lockout_watcher();
        sleep(Duration::from_millis(1500)).await;
        let settings = dashboard.sync().snapshot().settings.clone();
        assert_eq!(settings.lockout_until, None);
        assert_eq!(settings.failed_attempts, 0);
        drop(watcher);
    }

    #[tokio::test(start_paused = true)]
    async fn hint_and_recovery_emails_need_an_address() {
        let (dashboard, _remote) = loaded_dashboard(Document::default()).await;
        assert!(matches!(
            send_password_hint_impl(&dashboard).await,
            Err(InfraError::Validation(_))
        ));

        let (dashboard, remote) = loaded_dashboard(gated_document()).await;
        let dispatch = send_password_hint_impl(&dashboard).await.expect("hint");
        assert!(dispatch.sent);
        assert_eq!(dispatch.message, "Email sent to ops@example.com");
        let dispatch = request_recovery_impl(&dashboard).await.expect("recovery");
        assert!(dispatch.sent);

        let kinds: Vec<EmailKind> = remote.sent_emails().iter().map(|email| email.kind).collect();
        assert_eq!(kinds, vec![EmailKind::Hint, EmailKind::Recovery]);
        assert!(remote.sent_emails()[0].body.contains("classic"));
    }

    #[tokio::test(start_paused = true)]
    async fn offline_email_is_logged_not_raised() {
        let (dashboard, remote) = loaded_dashboard(gated_document()).await;
        remote.set_offline(true);
        let dispatch = request_recovery_impl(&dashboard).await.expect("recovery");
        assert!(!dispatch.sent);
    }

    #[tokio::test(start_paused = true)]
    async fn settings_update_validates_and_enables_gate() {
        let (dashboard, _remote) = loaded_dashboard(Document::default()).await;
        let invalid = update_settings_impl(
            &dashboard,
            SettingsUpdate {
                custom_transition_seconds: Some(0.0),
                ..SettingsUpdate::default()
            },
        );
        assert!(matches!(invalid, Err(InfraError::Validation(_))));

        let settings = update_settings_impl(
            &dashboard,
            SettingsUpdate {
                transition_style: Some(TransitionStyle::SlideLeft),
                pin_enabled: Some(true),
                pin: Some("4321".to_string()),
                ..SettingsUpdate::default()
            },
        )
        .expect("update settings");
        assert_eq!(settings.transition_style, TransitionStyle::SlideLeft);
        assert!(dashboard.session().is_unlocked());
        add_project_impl(&dashboard, "Still allowed".to_string()).expect("add project");
    }
}
