use crate::application::document_sync::SyncClient;
use crate::domain::alerts::{upcoming_alerts, UpcomingAlert, CHIME, DEFAULT_LEAD_MINUTES};
use crate::domain::models::ScheduleEvent;
use crate::infrastructure::alert_player::AlertPlayer;
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(10);

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct NotificationEvaluator {
    lead_minutes: i64,
    dismissed: HashSet<String>,
    previous: HashSet<String>,
    player: Arc<dyn AlertPlayer>,
}

impl NotificationEvaluator {
    pub fn new(player: Arc<dyn AlertPlayer>) -> Self {
        Self {
            lead_minutes: DEFAULT_LEAD_MINUTES,
            dismissed: HashSet::new(),
            previous: HashSet::new(),
            player,
        }
    }

    pub fn with_lead_minutes(mut self, lead_minutes: i64) -> Self {
        self.lead_minutes = lead_minutes.max(1);
        self
    }

    /// Current alerts; chimes once for every id that was not alerting on the
    /// previous check.
    pub fn check(&mut self, events: &[ScheduleEvent], now: NaiveDateTime) -> Vec<UpcomingAlert> {
        let alerts = upcoming_alerts(events, now, self.lead_minutes, &self.dismissed);
        let current: HashSet<String> = alerts.iter().map(|alert| alert.event_id.clone()).collect();

        for id in current.difference(&self.previous) {
            tracing::info!(event_id = %id, "event starting soon");
            self.player.play(&CHIME);
        }
        self.previous = current;
        alerts
    }

    /// Dismissals last for the session.
    pub fn dismiss(&mut self, event_id: &str) {
        self.dismissed.insert(event_id.to_string());
        self.previous.remove(event_id);
    }

    pub fn is_dismissed(&self, event_id: &str) -> bool {
        self.dismissed.contains(event_id)
    }
}

/// Periodic evaluation against the synced document; dropping it stops the loop.
pub struct NotificationHandle {
    evaluator: Arc<Mutex<NotificationEvaluator>>,
    alerts: watch::Receiver<Vec<UpcomingAlert>>,
    task: JoinHandle<()>,
}

impl NotificationHandle {
    pub fn start(
        sync: SyncClient,
        evaluator: NotificationEvaluator,
        check_interval: Duration,
        timezone: Tz,
        now_provider: NowProvider,
    ) -> Self {
        let evaluator = Arc::new(Mutex::new(evaluator));
        let (sender, alerts) = watch::channel(Vec::new());
        let shared = Arc::clone(&evaluator);

        let task = tokio::spawn(async move {
            let mut ticker = interval(check_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sync.is_loading() {
                    continue;
                }
                let document = sync.snapshot();
                let now = now_provider().with_timezone(&timezone).naive_local();
                let current = match shared.lock() {
                    Ok(mut evaluator) => evaluator.check(&document.events, now),
                    Err(_) => return,
                };
                if sender.send(current).is_err() {
                    return;
                }
            }
        });

        Self {
            evaluator,
            alerts,
            task,
        }
    }

    pub fn alerts(&self) -> Vec<UpcomingAlert> {
        self.alerts.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<UpcomingAlert>> {
        self.alerts.clone()
    }

    pub fn dismiss(&self, event_id: &str) {
        if let Ok(mut evaluator) = self.evaluator.lock() {
            evaluator.dismiss(event_id);
        }
    }
}

impl Drop for NotificationHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
