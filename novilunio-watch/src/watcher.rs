//! Fetch, diff and announce loop over the watched pages.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::announce::{Announcement, Announcer};
use crate::errors::WatchError;
use crate::extract::extract_articles;
use crate::fetch::PageFetcher;
use crate::state::WatchState;

/// Shared on/off switch of the watch loop.
#[derive(Debug, Clone, Default)]
pub struct WatchToggle(Arc<AtomicBool>);

impl WatchToggle {
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, enabled: bool) {
        self.0.store(enabled, Ordering::SeqCst);
    }

    /// Flip the switch and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

/// Current configuration of the watch loop, re-read before every cycle.
#[async_trait::async_trait]
pub trait WatchTargets: Send + Sync {
    async fn urls(&self) -> Vec<String>;
    async fn interval(&self) -> Duration;
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub failed: usize,
    pub seeded: usize,
    pub announced: usize,
    /// The toggle was off before any page was processed.
    pub skipped: bool,
    /// The toggle flipped off mid-cycle.
    pub interrupted: bool,
}

pub struct ArticleWatcher<F, A> {
    fetcher: F,
    announcer: A,
    toggle: WatchToggle,
    state: WatchState,
    state_path: PathBuf,
}

impl<F, A> ArticleWatcher<F, A>
where
    F: PageFetcher,
    A: Announcer,
{
    /// Build a watcher, loading its seen-sets from `state_path`.
    pub fn new(
        fetcher: F,
        announcer: A,
        toggle: WatchToggle,
        state_path: impl Into<PathBuf>,
    ) -> Result<Self, WatchError> {
        let state_path = state_path.into();
        let state = WatchState::load(&state_path)?;
        Ok(Self {
            fetcher,
            announcer,
            toggle,
            state,
            state_path,
        })
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn toggle(&self) -> &WatchToggle {
        &self.toggle
    }

    /// Forget every seen link, in memory and on disk.
    pub fn reset(&mut self) -> Result<(), WatchError> {
        self.state.clear();
        self.state.save(&self.state_path)?;
        Ok(())
    }

    /// Run one cycle over `urls`.
    ///
    /// Fetch failures are logged per page. A page without a prior seen-set is
    /// seeded silently. New links are announced in sorted order and only
    /// marked seen once their announcement went out. The state is saved at
    /// the end whatever happened to individual pages.
    pub async fn run_cycle(&mut self, urls: &[String]) -> Result<CycleReport, WatchError> {
        let mut report = CycleReport::default();
        if !self.toggle.is_enabled() {
            report.skipped = true;
            return Ok(report);
        }

        let dropped = self.state.retain_pages(urls);
        if dropped > 0 {
            debug!(dropped, "dropped seen-sets of pages no longer watched");
        }

        for url in urls {
            if !self.toggle.is_enabled() {
                info!("watch disabled mid-cycle, stopping");
                report.interrupted = true;
                break;
            }

            let body = match self.fetcher.fetch(url).await {
                Ok(body) => body,
                Err(e) => {
                    warn!(url = %url, error = %e, "page fetch failed");
                    report.failed += 1;
                    continue;
                }
            };
            report.fetched += 1;

            let links = extract_articles(&body);
            if !self.state.is_seeded(url) {
                info!(url = %url, links = links.len(), "seeding seen-set");
                report.seeded += links.len();
                self.state.seed(url, links);
                continue;
            }

            let fresh: Vec<String> = self
                .state
                .unseen(url, &links)
                .into_iter()
                .cloned()
                .collect();
            for link in fresh {
                let announcement = Announcement {
                    page: url.clone(),
                    link,
                };
                match self.announcer.announce(&announcement).await {
                    Ok(()) => {
                        info!(url = %url, link = %announcement.link, "new article announced");
                        self.state.mark_seen(url, &announcement.link);
                        report.announced += 1;
                    }
                    Err(e) => {
                        warn!(
                            url = %url,
                            link = %announcement.link,
                            error = %e,
                            "announcement failed, will retry next cycle"
                        );
                    }
                }
            }
        }

        self.state.save(&self.state_path)?;
        Ok(report)
    }
}

/// Spawn the periodic watch loop.
///
/// The interval is re-read from `targets` after every tick; cycles run only
/// while the toggle is on.
pub fn spawn_watch_loop<F, A, T>(
    watcher: Arc<Mutex<ArticleWatcher<F, A>>>,
    targets: Arc<T>,
) -> tokio::task::JoinHandle<()>
where
    F: PageFetcher + 'static,
    A: Announcer + 'static,
    T: WatchTargets + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut period = targets.interval().await;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_secs = period.as_secs(), "watch loop started");

        loop {
            ticker.tick().await;

            let urls = targets.urls().await;
            let mut guard = watcher.lock().await;
            if guard.toggle().is_enabled() {
                match guard.run_cycle(&urls).await {
                    Ok(report) => debug!(?report, "watch cycle finished"),
                    Err(e) => warn!(error = %e, "watch cycle failed to save state"),
                }
            }
            drop(guard);

            let next = targets.interval().await;
            if next != period {
                info!(interval_secs = next.as_secs(), "watch interval changed");
                period = next;
                ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
        }
    })
}
