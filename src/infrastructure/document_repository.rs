use crate::domain::models::Document;
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const SINGLETON_DOCUMENT_ID: &str = "main";

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub trait DocumentRepository: Send + Sync {
    fn load(&self) -> Result<Option<Document>, InfraError>;
    fn save(&self, document: &Document, updated_at: DateTime<Utc>) -> Result<(), InfraError>;

    fn load_or_create(&self) -> Result<Document, InfraError> {
        if let Some(document) = self.load()? {
            return Ok(document);
        }
        let document = Document::default();
        self.save(&document, Utc::now())?;
        Ok(document)
    }
}

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SqliteDocumentRepository {
    db_path: PathBuf,
}

impl SqliteDocumentRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>, InfraError> {
        let connection = self.connect()?;
        let raw: Option<String> = connection
            .query_row(
                "SELECT updated_at FROM dashboard_document WHERE id = ?1",
                params![SINGLETON_DOCUMENT_ID],
                |row| row.get(0),
            )
            .optional()?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|error| {
            InfraError::InvalidConfig(format!(
                "invalid dashboard_document.updated_at '{raw}': {error}"
            ))
        })?;
        Ok(Some(parsed.with_timezone(&Utc)))
    }
}

impl DocumentRepository for SqliteDocumentRepository {
    fn load(&self) -> Result<Option<Document>, InfraError> {
        let connection = self.connect()?;
        let payload: Option<String> = connection
            .query_row(
                "SELECT payload FROM dashboard_document WHERE id = ?1",
                params![SINGLETON_DOCUMENT_ID],
                |row| row.get(0),
            )
            .optional()?;

        let Some(payload) = payload else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    fn save(&self, document: &Document, updated_at: DateTime<Utc>) -> Result<(), InfraError> {
        let payload = document.canonical_json()?;
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO dashboard_document (id, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
               payload = excluded.payload,
               updated_at = excluded.updated_at",
            params![SINGLETON_DOCUMENT_ID, payload, updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentRepository {
    document: Mutex<Option<Document>>,
}

impl InMemoryDocumentRepository {
    pub fn with_document(document: Document) -> Self {
        Self {
            document: Mutex::new(Some(document)),
        }
    }
}

impl DocumentRepository for InMemoryDocumentRepository {
    fn load(&self) -> Result<Option<Document>, InfraError> {
        let document = self
            .document
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("document lock poisoned: {error}")))?;
        Ok(document.clone())
    }

    fn save(&self, document: &Document, _updated_at: DateTime<Utc>) -> Result<(), InfraError> {
        let mut stored = self
            .document
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("document lock poisoned: {error}")))?;
        *stored = Some(document.clone());
        Ok(())
    }
}
