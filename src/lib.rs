pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::Dashboard;
pub use application::document_sync::SyncClient;
pub use application::server::{run_server, start_client, ClientRuntime};
pub use domain::models::{Document, PersonnelStatus, Project, ScheduleEvent, Settings};
pub use infrastructure::error::InfraError;
