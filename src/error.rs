use thiserror::Error;

/// Failures the gateway reports instead of folding them into an empty default.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no database connection")]
    Disconnected,
    #[error("database error: {0:#}")]
    Database(anyhow::Error),
    #[error("search provider failed: {0:#}")]
    Search(anyhow::Error),
}
