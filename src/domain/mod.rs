pub mod access;
pub mod alerts;
pub mod models;
pub mod overflow;
pub mod transition;
