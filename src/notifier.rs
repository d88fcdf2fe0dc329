use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::render::{RenderOp, Renderer};
use crate::settings::NotificationTiming;

/// Transient messages. Each one runs its own fade/remove timeline; any
/// number may be on screen at once.
#[derive(Clone)]
pub struct Notifier {
    renderer: Arc<dyn Renderer>,
    next_id: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl Notifier {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self {
            renderer,
            next_id: Arc::new(AtomicU64::new(1)),
            shutdown: CancellationToken::new(),
        }
    }

    /// Shows `text` now, fades it at `fade_after_ms` and removes it at
    /// `remove_after_ms`, both measured from this call.
    pub fn notify(&self, text: impl Into<String>, timing: NotificationTiming) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.renderer.apply(RenderOp::NotificationShown {
            id,
            text: text.into(),
        });

        let shown_at = Instant::now();
        let renderer = self.renderer.clone();
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            let fade_at = shown_at + Duration::from_millis(timing.fade_after_ms);
            let remove_at = shown_at + Duration::from_millis(timing.remove_after_ms);

            tokio::select! {
                _ = time::sleep_until(fade_at) => {
                    renderer.apply(RenderOp::NotificationFading { id });
                }
                _ = shutdown.cancelled() => return,
            }
            tokio::select! {
                _ = time::sleep_until(remove_at) => {
                    renderer.apply(RenderOp::NotificationRemoved { id });
                }
                _ = shutdown.cancelled() => {}
            }
        });

        id
    }

    /// Stops every pending timeline; messages already on screen stay as they are.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::recording::RecordingSurface;

    #[tokio::test(start_paused = true)]
    async fn standard_timeline_fades_then_removes() {
        let surface = Arc::new(RecordingSurface::default());
        let notifier = Notifier::new(surface.clone());
        let id = notifier.notify("✓ About", NotificationTiming::STANDARD);

        time::sleep(Duration::from_millis(3_990)).await;
        assert_eq!(
            surface.ops(),
            vec![RenderOp::NotificationShown {
                id,
                text: "✓ About".into()
            }]
        );

        time::sleep(Duration::from_millis(20)).await;
        assert_eq!(surface.ops().last(), Some(&RenderOp::NotificationFading { id }));

        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(surface.ops().last(), Some(&RenderOp::NotificationRemoved { id }));
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_run_independently() {
        let surface = Arc::new(RecordingSurface::default());
        let notifier = Notifier::new(surface.clone());
        let first = notifier.notify("one", NotificationTiming::STANDARD);
        time::sleep(Duration::from_millis(1_000)).await;
        let second = notifier.notify("two", NotificationTiming::FINAL);
        assert_ne!(first, second);

        time::sleep(Duration::from_millis(6_500)).await;
        let ops = surface.ops();
        assert!(ops.contains(&RenderOp::NotificationRemoved { id: first }));
        assert!(!ops.contains(&RenderOp::NotificationFading { id: second }));

        time::sleep(Duration::from_millis(5_000)).await;
        let ops = surface.ops();
        assert!(ops.contains(&RenderOp::NotificationFading { id: second }));
        assert!(ops.contains(&RenderOp::NotificationRemoved { id: second }));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timelines() {
        let surface = Arc::new(RecordingSurface::default());
        let notifier = Notifier::new(surface.clone());
        notifier.notify("bye", NotificationTiming::STANDARD);
        notifier.shutdown();

        time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(surface.ops().len(), 1);
    }
}
