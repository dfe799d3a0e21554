use statusboard::application::commands::{add_event_impl, request_recovery_impl, Dashboard, EventInput};
use statusboard::application::document_sync::{PullOutcome, SyncClient};
use statusboard::domain::models::{Document, Project, Settings};
use statusboard::infrastructure::dashboard_client::{
    DashboardRemote, EmailKind, EmailRequest, ReqwestDashboardRemote,
};
use statusboard::application::server::connect;
use statusboard::infrastructure::alert_player::LoggingAlertPlayer;
use statusboard::infrastructure::config::ensure_default_configs;
use statusboard::infrastructure::document_repository::InMemoryDocumentRepository;
use statusboard::infrastructure::http_api::{router, ApiState};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use url::Url;

static NEXT_CONFIG_DIR: AtomicUsize = AtomicUsize::new(0);

struct TempConfigDir {
    path: PathBuf,
}

impl TempConfigDir {
    fn new() -> Self {
        let sequence = NEXT_CONFIG_DIR.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "statusboard-roundtrip-{}-{sequence}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("create temp config dir");
        Self { path }
    }
}

impl Drop for TempConfigDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

async fn spawn_api(document: Option<Document>) -> Url {
    let repository = match document {
        Some(document) => InMemoryDocumentRepository::with_document(document),
        None => InMemoryDocumentRepository::default(),
    };
    let app = router(ApiState::new(Arc::new(repository)));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind api");
    let address = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve api");
    });
    Url::parse(&format!("http://{address}/api/")).expect("api url")
}

#[tokio::test]
async fn client_pushes_edits_that_a_second_client_pulls() {
    let base_url = spawn_api(None).await;
    let writer = SyncClient::new(Arc::new(ReqwestDashboardRemote::new(base_url.clone())));
    let reader = SyncClient::new(Arc::new(ReqwestDashboardRemote::new(base_url.clone())));

    assert_eq!(writer.pull().await, PullOutcome::Replaced);
    assert_eq!(reader.pull().await, PullOutcome::Replaced);
    assert_eq!(*writer.snapshot(), Document::default());

    writer
        .mutate(|document| {
            document.projects.push(Project {
                id: "prj-1".to_string(),
                name: "Deploys".to_string(),
                count: 3,
            });
            Ok(())
        })
        .expect("mutate");
    writer.push_now().await.expect("push");

    assert_eq!(reader.pull().await, PullOutcome::Replaced);
    assert_eq!(reader.snapshot().projects[0].name, "Deploys");
    assert_eq!(reader.pull().await, PullOutcome::Unchanged);
}

#[tokio::test]
async fn dashboard_commands_reach_the_store() {
    let base_url = spawn_api(Some(Document {
        settings: Settings {
            recovery_email: Some("ops@example.com".to_string()),
            ..Settings::default()
        },
        ..Document::default()
    }))
    .await;
    let remote = Arc::new(ReqwestDashboardRemote::new(base_url));
    let sync = SyncClient::new(remote.clone());
    sync.pull().await;
    let dashboard = Dashboard::new(sync.clone(), chrono_tz::Tz::UTC);

    let event = add_event_impl(
        &dashboard,
        EventInput {
            title: "Release".to_string(),
            date_start: "2024-01-02".to_string(),
            time_start: "09:00".to_string(),
            time_end: "10:00".to_string(),
            ..EventInput::default()
        },
    )
    .expect("add event");
    sync.push_now().await.expect("push");

    let stored = remote.fetch_document().await.expect("fetch");
    assert_eq!(stored.events, vec![event]);

    let dispatch = request_recovery_impl(&dashboard).await.expect("recovery");
    assert!(dispatch.sent);
    assert_eq!(dispatch.message, "Email sent to ops@example.com");
}

#[tokio::test]
async fn invalid_recipient_returns_the_stub_reply() {
    let base_url = spawn_api(None).await;
    let remote = ReqwestDashboardRemote::new(base_url);
    let response = remote
        .send_email(&EmailRequest {
            to: "nobody".to_string(),
            subject: "Hint".to_string(),
            body: "hint".to_string(),
            kind: EmailKind::Hint,
        })
        .await
        .expect("stub reply");
    assert!(!response.success);
    assert_eq!(response.message, "Invalid email address");
}

#[tokio::test]
async fn connect_reads_client_config_and_loads_the_board() {
    let base_url = spawn_api(Some(Document {
        projects: vec![Project {
            id: "prj-1".to_string(),
            name: "Deploys".to_string(),
            count: 4,
        }],
        ..Document::default()
    }))
    .await;

    let config_dir = TempConfigDir::new();
    ensure_default_configs(&config_dir.path).expect("default configs");
    fs::write(
        config_dir.path.join("client.json"),
        format!(r#"{{"schema":1,"remoteBaseUrl":"{base_url}","pollIntervalMs":60000}}"#),
    )
    .expect("client config");

    let runtime = connect(&config_dir.path, Arc::new(LoggingAlertPlayer))
        .await
        .expect("connect");
    let sync = runtime.dashboard().sync();
    assert!(!sync.is_loading());
    assert_eq!(sync.snapshot().projects[0].count, 4);
    assert!(runtime.notifications().alerts().is_empty());
}
