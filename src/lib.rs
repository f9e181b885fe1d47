pub mod api;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use error::ReconcileError;
pub use models::{LedgerEntry, ReconciledPair, Reconciliation};
pub use service::{normalize_identity, reconcile, Reconciler};
