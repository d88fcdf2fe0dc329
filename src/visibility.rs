use crate::settings::VisibilityPolicy;
use crate::timer::{Clock, Ignored};

/// Pauses the clock while the page is in the background and brings it back
/// when the visitor returns, unless they paused it themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityGuard {
    policy: VisibilityPolicy,
}

impl VisibilityGuard {
    pub fn new(policy: VisibilityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// Page went to the background. The pause is automatic, so the manual
    /// flag is never set here.
    pub fn on_hidden(&self, clock: &mut Clock, now_ms: u64) -> Result<(), Ignored> {
        if clock.run.finished {
            return Err(Ignored::Finished);
        }
        if self.policy == VisibilityPolicy::ClearOnHide {
            clock.clear_manual_pause();
        }
        clock.suspend(now_ms)
    }

    pub fn on_visible(&self, clock: &mut Clock, now_ms: u64) -> Result<(), Ignored> {
        if clock.run.finished {
            return Err(Ignored::Finished);
        }
        if clock.run.manually_paused {
            return Err(Ignored::ManuallyPaused);
        }
        clock.resume(now_ms)
    }
}
