use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuessError {
    #[error(
        "Failed to process guess for \"{country}\". The server couldn't find coordinates for this location."
    )]
    Rejected {
        country: String,
        status: u16,
        body: String,
    },
    #[error("Failed to submit guess. Error: {message}")]
    Transport { message: String },
    #[error("the game session is not ready yet")]
    SessionNotReady,
    #[error("another guess is still being evaluated")]
    Busy,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("failed to negotiate session: {0:#}")]
    Negotiate(#[source] anyhow::Error),
    #[error("failed to fetch silhouette: {0:#}")]
    FetchSilhouette(#[source] anyhow::Error),
    #[error(transparent)]
    Silhouette(#[from] SilhouetteError),
    #[error("failed to fetch territories: {0:#}")]
    Territories(#[source] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum SilhouetteError {
    #[error("silhouette payload is empty")]
    EmptyPayload,
    #[error("unexpected silhouette content type '{0}'")]
    NotAnImage(String),
    #[error("silhouette file i/o failed: {0}")]
    Io(#[from] std::io::Error),
}
