use crate::domain::models::Document;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::document_repository::{DocumentRepository, InMemoryDocumentRepository};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use url::Url;

const DOCUMENT_PATH: &str = "document";
const EMAIL_PATH: &str = "email";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailKind {
    Recovery,
    Lockout,
    Hint,
}

impl EmailKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recovery => "recovery",
            Self::Lockout => "lockout",
            Self::Hint => "hint",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "type")]
    pub kind: EmailKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: EmailKind,
}

#[async_trait]
pub trait DashboardRemote: Send + Sync {
    async fn fetch_document(&self) -> Result<Document, InfraError>;

    async fn push_document(&self, document: &Document) -> Result<Document, InfraError>;

    async fn send_email(&self, request: &EmailRequest) -> Result<EmailResponse, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestDashboardRemote {
    client: Client,
    base_url: Url,
}

impl ReqwestDashboardRemote {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, InfraError> {
        self.base_url.join(path).map_err(|error| {
            InfraError::InvalidConfig(format!(
                "cannot join '{path}' onto {}: {error}",
                self.base_url
            ))
        })
    }

    fn remote_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("dashboard api error: http {}", status.as_u16())
        } else {
            format!("dashboard api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Remote(message)
    }

    async fn read_body(response: reqwest::Response) -> Result<(reqwest::StatusCode, String), InfraError> {
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }
}

#[async_trait]
impl DashboardRemote for ReqwestDashboardRemote {
    async fn fetch_document(&self) -> Result<Document, InfraError> {
        let response = self
            .client
            .get(self.endpoint(DOCUMENT_PATH)?)
            .send()
            .await?;
        let (status, body) = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(Self::remote_http_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn push_document(&self, document: &Document) -> Result<Document, InfraError> {
        let response = self
            .client
            .post(self.endpoint(DOCUMENT_PATH)?)
            .json(document)
            .send()
            .await?;
        let (status, body) = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(Self::remote_http_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn send_email(&self, request: &EmailRequest) -> Result<EmailResponse, InfraError> {
        let response = self
            .client
            .post(self.endpoint(EMAIL_PATH)?)
            .json(request)
            .send()
            .await?;
        let (status, body) = Self::read_body(response).await?;
        if status.is_client_error() {
            // The stub answers validation failures with a structured body.
            if let Ok(parsed) = serde_json::from_str::<EmailResponse>(&body) {
                return Ok(parsed);
            }
        }
        if !status.is_success() {
            return Err(Self::remote_http_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}

/// Remote backed by an in-process repository. Used by headless hosts and tests;
/// `set_offline(true)` makes every call fail like an unreachable server.
#[derive(Debug, Default)]
pub struct InMemoryDashboardRemote {
    repository: InMemoryDocumentRepository,
    offline: AtomicBool,
    fetches: AtomicUsize,
    pushes: AtomicUsize,
    emails: Mutex<Vec<EmailRequest>>,
}

impl InMemoryDashboardRemote {
    pub fn with_document(document: Document) -> Self {
        Self {
            repository: InMemoryDocumentRepository::with_document(document),
            ..Self::default()
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Simulates another client writing the document.
    pub fn replace_document(&self, document: &Document) -> Result<(), InfraError> {
        self.repository.save(document, Utc::now())
    }

    pub fn stored_document(&self) -> Result<Option<Document>, InfraError> {
        self.repository.load()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn push_count(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn sent_emails(&self) -> Vec<EmailRequest> {
        self.emails
            .lock()
            .map(|emails| emails.clone())
            .unwrap_or_default()
    }

    fn ensure_online(&self) -> Result<(), InfraError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(InfraError::Remote("dashboard api unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DashboardRemote for InMemoryDashboardRemote {
    async fn fetch_document(&self) -> Result<Document, InfraError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        self.repository.load_or_create()
    }

    async fn push_document(&self, document: &Document) -> Result<Document, InfraError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.ensure_online()?;
        self.repository.save(document, Utc::now())?;
        Ok(document.clone())
    }

    async fn send_email(&self, request: &EmailRequest) -> Result<EmailResponse, InfraError> {
        self.ensure_online()?;
        if !request.to.contains('@') {
            return Ok(EmailResponse {
                success: false,
                message: "Invalid email address".to_string(),
                kind: request.kind,
            });
        }
        if let Ok(mut emails) = self.emails.lock() {
            emails.push(request.clone());
        }
        Ok(EmailResponse {
            success: true,
            message: format!("Email sent to {}", request.to),
            kind: request.kind,
        })
    }
}
