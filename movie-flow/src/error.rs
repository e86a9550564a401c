use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Session storage error: {0}")]
    StorageError(String),

    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    /// Transport or provider failure inside the catalog gateway. Never leaves the gateway.
    #[error("Catalog request failed: {0}")]
    CatalogError(String),

    #[error("Event processing failed: {0}")]
    EventFailed(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
