pub mod entry;
pub mod pool;
pub mod result;

pub use entry::{LedgerEntry, NormalizedEntry, RawAmount};
pub use pool::{Channel, MatchCandidatePool, PoolSlot, SlotStatus};
pub use result::{ReconcileStats, ReconciledPair, Reconciliation};
