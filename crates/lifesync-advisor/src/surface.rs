//! Last-write-wins surface for advisory text.
//!
//! Repeated SOS triggers may race several fetches; only the most recent
//! trigger's result should be shown. Unlike the incident claim, this
//! carries no state transition, so last-write-wins is acceptable -- but
//! "last" means the latest *started* fetch, not whichever response
//! happened to arrive last. A generation counter enforces that: a slow
//! older fetch cannot overwrite a newer one's result.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::service::OFFLINE_FALLBACK;

/// Shared advisory display state.
///
/// Cloning shares the surface; all clones observe the same text.
#[derive(Clone)]
pub struct AdvisorySurface {
    inner: Arc<Inner>,
}

struct Inner {
    /// The displayed value, paired with the generation of the fetch that
    /// produced it. Keeping the generation inside the channel puts the
    /// comparison and the write under the channel's lock.
    tx: watch::Sender<(u64, String)>,
    /// Generation of the most recently started fetch.
    started: AtomicU64,
}

impl AdvisorySurface {
    /// Create a surface initialized with the offline fallback, so the
    /// display is never empty.
    pub fn new() -> Self {
        let (tx, _) = watch::channel((0, OFFLINE_FALLBACK.to_owned()));
        Self {
            inner: Arc::new(Inner {
                tx,
                started: AtomicU64::new(0),
            }),
        }
    }

    /// Register a newly started fetch and return its generation token.
    pub fn begin(&self) -> u64 {
        self.inner.started.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    /// Publish a fetch result. Ignored if a newer generation has already
    /// published, so stale results never clobber fresh ones.
    ///
    /// The generation check and the text write happen together inside
    /// [`watch::Sender::send_if_modified`], so two racing publishers
    /// serialize and the older one cannot displace the newer one's text
    /// whatever the arrival order.
    pub fn publish(&self, generation: u64, text: String) {
        let mut text = Some(text);
        let published = self.inner.tx.send_if_modified(|shown| {
            if generation >= shown.0 {
                if let Some(text) = text.take() {
                    *shown = (generation, text);
                    return true;
                }
            }
            false
        });

        if !published {
            debug!(generation = generation, "discarding stale advisory result");
        }
    }

    /// The advisory text currently shown.
    pub fn latest(&self) -> String {
        self.inner.tx.borrow().1.clone()
    }

    /// Subscribe to display updates. Each value carries the publishing
    /// fetch's generation alongside the text.
    pub fn subscribe(&self) -> watch::Receiver<(u64, String)> {
        self.inner.tx.subscribe()
    }
}

impl Default for AdvisorySurface {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Barrier;

    use super::*;

    #[test]
    fn starts_with_the_offline_fallback() {
        let surface = AdvisorySurface::new();
        assert_eq!(surface.latest(), OFFLINE_FALLBACK);
    }

    #[test]
    fn publishes_in_generation_order() {
        let surface = AdvisorySurface::new();
        let generation = surface.begin();
        surface.publish(generation, String::from("first advisory"));
        assert_eq!(surface.latest(), "first advisory");
    }

    #[test]
    fn stale_result_cannot_overwrite_newer_one() {
        let surface = AdvisorySurface::new();
        let old = surface.begin();
        let new = surface.begin();

        // The newer trigger's fetch answers first.
        surface.publish(new, String::from("newer advisory"));
        // The older fetch limps in afterwards and must be discarded.
        surface.publish(old, String::from("older advisory"));

        assert_eq!(surface.latest(), "newer advisory");
    }

    #[test]
    fn racing_stale_publish_never_displaces_newer_text() {
        // Two fetches publishing from separate threads at the same
        // moment: whatever the interleaving, the older generation's
        // text must never end up displayed.
        for _ in 0..200 {
            let surface = AdvisorySurface::new();
            let old = surface.begin();
            let new = surface.begin();
            let barrier = Arc::new(Barrier::new(2));

            let older = {
                let surface = surface.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    surface.publish(old, String::from("older advisory"));
                })
            };
            let newer = {
                let surface = surface.clone();
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    surface.publish(new, String::from("newer advisory"));
                })
            };

            assert!(older.join().is_ok());
            assert!(newer.join().is_ok());
            assert_eq!(surface.latest(), "newer advisory");
        }
    }

    #[tokio::test]
    async fn subscribers_observe_updates() {
        let surface = AdvisorySurface::new();
        let mut rx = surface.subscribe();

        let generation = surface.begin();
        surface.publish(generation, String::from("updated"));

        assert!(rx.changed().await.is_ok());
        assert_eq!(rx.borrow().1.as_str(), "updated");
    }
}
