use crate::application::transition_scheduler::{SchedulerInput, TransitionScheduler};
use crate::domain::models::Settings;
use crate::domain::overflow::{detect_overflow, ContainerMetrics, OverflowConfig, OverflowState};
use crate::domain::transition::{visible_items, RenderPlan, TransitionVariant};
use crate::infrastructure::scroll_surface::ScrollSurface;
use std::sync::Arc;
use tokio::sync::watch;

/// One list container: overflow detection fed by resize notifications, plus
/// the transition scheduler that presents the list.
pub struct ListView {
    scheduler: TransitionScheduler,
    overflow_config: OverflowConfig,
    metrics: watch::Receiver<Option<ContainerMetrics>>,
    settings: Settings,
    item_count: usize,
    overflow: OverflowState,
}

impl ListView {
    pub fn new(
        surface: Arc<dyn ScrollSurface>,
        overflow_config: OverflowConfig,
        metrics: watch::Receiver<Option<ContainerMetrics>>,
    ) -> Self {
        Self {
            scheduler: TransitionScheduler::new(surface),
            overflow_config,
            metrics,
            settings: Settings::default(),
            item_count: 0,
            overflow: OverflowState::default(),
        }
    }

    pub fn overflow(&self) -> OverflowState {
        self.overflow
    }

    pub fn render_plan(&self) -> RenderPlan {
        self.scheduler.render_plan()
    }

    pub fn active_variant(&self) -> TransitionVariant {
        self.scheduler.active_variant()
    }

    pub fn timer_count(&self) -> usize {
        self.scheduler.timer_count()
    }

    pub fn visible<'a, T>(&self, items: &'a [T]) -> Vec<&'a T> {
        visible_items(items, &self.render_plan())
    }

    /// Called when the settings or the list changed.
    pub fn update(&mut self, settings: &Settings, item_count: usize) {
        self.settings = settings.clone();
        self.item_count = item_count;
        self.refresh();
    }

    /// Waits for the next resize notification and re-measures. Returns `false`
    /// once the notifier is gone.
    pub async fn next_resize(&mut self) -> bool {
        if self.metrics.changed().await.is_err() {
            return false;
        }
        self.refresh();
        true
    }

    fn refresh(&mut self) {
        let metrics = *self.metrics.borrow_and_update();
        self.overflow = detect_overflow(metrics, self.item_count, &self.overflow_config);
        self.scheduler.configure(SchedulerInput::from_settings(
            &self.settings,
            self.overflow,
            self.item_count,
            self.overflow_config.item_height,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        Document, PersonnelStatus, StatusKind, TransitionStyle,
    };
    use crate::infrastructure::scroll_surface::InMemoryScrollSurface;
    use chrono::NaiveDate;

    fn view(
        visible_height: f64,
    ) -> (ListView, watch::Sender<Option<ContainerMetrics>>) {
        let (sender, receiver) = watch::channel(Some(ContainerMetrics::new(visible_height)));
        let surface: Arc<dyn ScrollSurface> = Arc::new(InMemoryScrollSurface::new(800.0, visible_height));
        (
            ListView::new(surface, OverflowConfig::default(), receiver),
            sender,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn resize_notification_recomputes_overflow() {
        let (mut view, sender) = view(480.0);
        view.update(&Settings::default(), 6);
        assert!(!view.overflow().has_overflow);
        assert_eq!(view.overflow().items_per_page, 10);
        assert_eq!(view.active_variant(), TransitionVariant::Static);

        sender
            .send(Some(ContainerMetrics::new(200.0)))
            .expect("send metrics");
        assert!(view.next_resize().await);
        assert!(view.overflow().has_overflow);
        assert_eq!(view.overflow().items_per_page, 4);
        assert_eq!(view.active_variant(), TransitionVariant::Paged);
        assert_eq!(view.timer_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn item_count_change_rechecks_overflow() {
        let (mut view, _sender) = view(200.0);
        view.update(&Settings::default(), 2);
        assert!(!view.overflow().has_overflow);

        view.update(&Settings::default(), 9);
        assert!(view.overflow().has_overflow);
        let items: Vec<u32> = (0..9).collect();
        assert_eq!(view.visible(&items), vec![&0, &1, &2, &3]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_notifier_ends_resize_loop() {
        let (mut view, sender) = view(200.0);
        drop(sender);
        assert!(!view.next_resize().await);
    }

    #[tokio::test(start_paused = true)]
    async fn unmounted_container_falls_back_to_static() {
        let (sender, receiver) = watch::channel(None);
        let surface: Arc<dyn ScrollSurface> = Arc::new(InMemoryScrollSurface::default());
        let mut view = ListView::new(surface, OverflowConfig::default(), receiver);
        view.update(&Settings::default(), 40);
        assert_eq!(view.overflow(), OverflowState::default());
        assert_eq!(view.render_plan(), RenderPlan::All);
        drop(sender);
    }

    #[tokio::test(start_paused = true)]
    async fn each_personnel_column_runs_its_own_scheduler() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 2).expect("valid date");
        let person = |id: &str, status: StatusKind| PersonnelStatus {
            id: id.to_string(),
            name: id.to_string(),
            status,
            date_start: "2024-01-01".to_string(),
            date_end: "2024-01-03".to_string(),
            location: (status == StatusKind::Travel).then(|| "Osaka".to_string()),
        };
        let document = Document {
            personnel: (0..6)
                .map(|index| person(&format!("wfh-{index}"), StatusKind::Wfh))
                .chain([person("cto-1", StatusKind::Cto)])
                .collect(),
            ..Document::default()
        };
        let settings = Settings {
            transition_style: TransitionStyle::VerticalAutoScroll,
            ..Settings::default()
        };

        let mut views = Vec::new();
        let mut senders = Vec::new();
        for (kind, people) in document.group_by_status(today) {
            let (mut view, sender) = view(150.0);
            view.update(&settings, people.len());
            views.push((kind, view));
            senders.push(sender);
        }

        let variants: Vec<(StatusKind, TransitionVariant)> = views
            .iter()
            .map(|(kind, view)| (*kind, view.active_variant()))
            .collect();
        assert_eq!(
            variants,
            vec![
                (StatusKind::Cto, TransitionVariant::Static),
                (StatusKind::Fl, TransitionVariant::Static),
                (StatusKind::Wfh, TransitionVariant::SteppedScroll),
                (StatusKind::Travel, TransitionVariant::Static),
            ]
        );
        assert_eq!(views[1].1.render_plan(), RenderPlan::Placeholder);
    }
}
