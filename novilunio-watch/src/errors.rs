use novilunio_core::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("announcement failed: {0}")]
    Announce(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
