use crate::errors::WatchError;

/// A newly observed article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Watched page the link was found on.
    pub page: String,
    pub link: String,
}

/// Delivers announcements to the notification channel.
#[async_trait::async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, announcement: &Announcement) -> Result<(), WatchError>;
}
