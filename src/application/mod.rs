pub mod bootstrap;
pub mod commands;
pub mod document_sync;
pub mod list_view;
pub mod notifications;
pub mod server;
pub mod transition_scheduler;
