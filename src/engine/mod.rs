// ClinAudit Engine - Core module structure
pub mod config;
pub mod database;
pub mod model;
pub mod state;
pub mod store;
pub mod controller;
pub mod export;
pub mod api;
pub mod cli;
pub mod logging;

pub use config::Config;
pub use controller::Controller;
pub use database::Database;
pub use model::AuditRecord;
pub use store::{AuditStore, LocalStore, RemoteStore};
