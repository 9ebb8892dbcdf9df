//! Article watcher: periodically fetch pages, spot new article links and
//! announce them.

pub mod announce;
pub mod errors;
pub mod extract;
pub mod fetch;
pub mod state;
pub mod watcher;

pub use announce::{Announcement, Announcer};
pub use errors::WatchError;
pub use extract::{extract_articles, extract_links, is_article_link};
pub use fetch::{DEFAULT_FETCH_TIMEOUT, HttpPageFetcher, PageFetcher, parse_page_url};
pub use state::WatchState;
pub use watcher::{ArticleWatcher, CycleReport, WatchTargets, WatchToggle, spawn_watch_loop};
