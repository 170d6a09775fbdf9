pub mod booking;
pub mod event;
pub mod media;
pub mod repository;
pub mod saga;

/// Field-level and referential validation failures. These are the client's
/// fault and map to 4xx responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),
    #[error("Please provide a valid email address")]
    InvalidEmail,
    #[error("Invalid event ID: {0}")]
    InvalidEventId(String),
    #[error("Referenced event does not exist")]
    MissingEvent,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Database connection failed: {0}")]
    Connection(String),
    #[error("{0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
