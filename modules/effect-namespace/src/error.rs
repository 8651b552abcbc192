use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    #[error("Invalid value for {key}: {value:?} (expected {expected})")]
    InvalidConfig {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Affinity thread already designated as {existing}, refusing {requested}")]
    AffinityConflict { existing: String, requested: String },

    #[error("Global namespace context is already initialized")]
    GlobalAlreadyInitialized,
}
