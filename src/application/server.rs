use crate::application::bootstrap::bootstrap_workspace;
use crate::application::commands::{Dashboard, LockoutWatcher};
use crate::application::document_sync::{PollHandle, SyncClient};
use crate::application::list_view::ListView;
use crate::application::notifications::{NotificationEvaluator, NotificationHandle};
use crate::domain::overflow::{ContainerMetrics, OverflowConfig};
use crate::infrastructure::alert_player::AlertPlayer;
use crate::infrastructure::config::{read_client_config, read_server_config, ClientConfig};
use crate::infrastructure::dashboard_client::{DashboardRemote, ReqwestDashboardRemote};
use crate::infrastructure::document_repository::{DocumentRepository, SqliteDocumentRepository};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::http_api::{router, ApiState};
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::scroll_surface::ScrollSurface;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Serves the document store API for the workspace until Ctrl-C.
pub async fn run_server(workspace_root: &Path) -> Result<(), InfraError> {
    let bootstrap = bootstrap_workspace(workspace_root)?;
    if !init_logging(&bootstrap.logs_dir)? {
        tracing::debug!("logging already initialized");
    }
    let config = read_server_config(&bootstrap.config_dir)?;

    let repository = Arc::new(SqliteDocumentRepository::new(&bootstrap.database_path));
    repository.load_or_create()?;
    let app = router(ApiState::new(repository));

    let listener = TcpListener::bind(config.bind_address).await?;
    tracing::info!(
        app = %config.app_name,
        address = %listener.local_addr()?,
        database = %bootstrap.database_path.display(),
        "dashboard api listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("dashboard api stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "failed to listen for shutdown signal");
    }
}

pub fn remote_from_config(config: &ClientConfig) -> Arc<dyn DashboardRemote> {
    Arc::new(ReqwestDashboardRemote::new(config.remote_base_url.clone()))
}

/// A connected board: polling sync, upcoming-event alerts and lockout expiry,
/// all stopped when the runtime is dropped.
pub struct ClientRuntime {
    dashboard: Dashboard,
    overflow_config: OverflowConfig,
    notifications: NotificationHandle,
    _polling: PollHandle,
    _lockout: LockoutWatcher,
}

impl ClientRuntime {
    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn notifications(&self) -> &NotificationHandle {
        &self.notifications
    }

    /// A list container sized with the configured item height and padding.
    pub fn list_view(
        &self,
        surface: Arc<dyn ScrollSurface>,
        metrics: watch::Receiver<Option<ContainerMetrics>>,
    ) -> ListView {
        ListView::new(surface, self.overflow_config, metrics)
    }
}

/// Reads `client.json` from the config directory and connects to its remote.
pub async fn connect(
    config_dir: &Path,
    player: Arc<dyn AlertPlayer>,
) -> Result<ClientRuntime, InfraError> {
    let config = read_client_config(config_dir)?;
    tracing::info!(remote = %config.remote_base_url, "connecting dashboard client");
    Ok(start_client(&config, remote_from_config(&config), player).await)
}

pub async fn start_client(
    config: &ClientConfig,
    remote: Arc<dyn DashboardRemote>,
    player: Arc<dyn AlertPlayer>,
) -> ClientRuntime {
    let sync = SyncClient::new(remote).with_push_debounce(config.push_debounce);
    let polling = sync.start(config.poll_interval).await;
    if sync.is_loading() {
        tracing::warn!(remote = %config.remote_base_url, "initial load failed; retrying on poll");
    }

    let dashboard = Dashboard::new(sync.clone(), config.timezone);
    let lockout = dashboard.start_lockout_watcher();
    let notifications = NotificationHandle::start(
        sync,
        NotificationEvaluator::new(player).with_lead_minutes(config.notification_lead_minutes),
        config.notification_interval,
        config.timezone,
        Arc::new(Utc::now),
    );

    ClientRuntime {
        dashboard,
        overflow_config: config.overflow_config(),
        notifications,
        _polling: polling,
        _lockout: lockout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::commands::add_project_impl;
    use crate::domain::models::Document;
    use crate::infrastructure::alert_player::NoopAlertPlayer;
    use crate::infrastructure::dashboard_client::InMemoryDashboardRemote;
    use crate::infrastructure::scroll_surface::InMemoryScrollSurface;
    use tokio::time::{sleep, Duration};
    use url::Url;

    fn local_config() -> ClientConfig {
        ClientConfig::new(Url::parse("http://127.0.0.1:3000/api/").expect("valid url"))
    }

    #[tokio::test(start_paused = true)]
    async fn client_runtime_loads_and_pushes_edits() {
        let remote = Arc::new(InMemoryDashboardRemote::with_document(Document::default()));
        let runtime = start_client(
            &local_config(),
            remote.clone(),
            Arc::new(NoopAlertPlayer),
        )
        .await;

        assert!(!runtime.dashboard().sync().is_loading());
        add_project_impl(runtime.dashboard(), "Deploys".to_string()).expect("add project");
        sleep(Duration::from_millis(600)).await;

        let stored = remote.stored_document().expect("load").expect("stored");
        assert_eq!(stored.projects.len(), 1);
        assert!(runtime.notifications().alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn list_views_use_configured_item_height() {
        let remote = Arc::new(InMemoryDashboardRemote::with_document(Document::default()));
        let config = ClientConfig {
            item_height_px: 100.0,
            ..local_config()
        };
        let runtime = start_client(&config, remote, Arc::new(NoopAlertPlayer)).await;

        let (_sender, metrics) = watch::channel(Some(ContainerMetrics::new(450.0)));
        let surface: Arc<dyn ScrollSurface> = Arc::new(InMemoryScrollSurface::new(900.0, 450.0));
        let mut view = runtime.list_view(surface, metrics);
        view.update(&runtime.dashboard().sync().snapshot().settings, 12);
        assert_eq!(view.overflow().items_per_page, 4);
        assert!(view.overflow().has_overflow);
    }

    #[tokio::test(start_paused = true)]
    async fn client_runtime_recovers_once_remote_is_reachable() {
        let remote = Arc::new(InMemoryDashboardRemote::with_document(Document::default()));
        remote.set_offline(true);
        let runtime = start_client(
            &local_config(),
            remote.clone(),
            Arc::new(NoopAlertPlayer),
        )
        .await;
        assert!(runtime.dashboard().sync().is_loading());

        remote.set_offline(false);
        sleep(Duration::from_millis(3100)).await;
        assert!(!runtime.dashboard().sync().is_loading());
    }
}
