pub mod amount;
pub mod matcher;
pub mod normalizer;
pub mod similarity;

pub use amount::parse_amount;
pub use matcher::{compare_candidates, reconcile, Candidate, Reconciler};
pub use normalizer::{normalize_identity, NameNormalizer, NormalizerConfig, UNRESOLVED_IDENTITY};
pub use similarity::{identity_similarity, SimilarityMetric};
