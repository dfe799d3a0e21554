pub mod alert_player;
pub mod config;
pub mod dashboard_client;
pub mod document_repository;
pub mod error;
pub mod http_api;
pub mod logging;
pub mod scroll_surface;
