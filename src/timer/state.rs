use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockStatus {
    Idle,
    Running,
    Paused,
}

impl Default for ClockStatus {
    fn default() -> Self {
        ClockStatus::Idle
    }
}

/// Why a transition was dropped. Never surfaced to the visitor; the
/// controller logs these at debug level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ignored {
    AlreadyRunning,
    NotRunning,
    NotStarted,
    Finished,
    ManuallyPaused,
    UnknownCheckpoint(usize),
    NotActive { index: usize, active: Option<usize> },
    AlreadyCompleted(usize),
    NotEligible(usize),
    StaleDwell(usize),
    WrongVariant,
}

impl fmt::Display for Ignored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ignored::AlreadyRunning => write!(f, "clock already running"),
            Ignored::NotRunning => write!(f, "clock not running"),
            Ignored::NotStarted => write!(f, "run not started"),
            Ignored::Finished => write!(f, "run already finished"),
            Ignored::ManuallyPaused => write!(f, "run is manually paused"),
            Ignored::UnknownCheckpoint(index) => write!(f, "no checkpoint at index {index}"),
            Ignored::NotActive { index, active } => match active {
                Some(active) => write!(f, "checkpoint {index} is not active (active: {active})"),
                None => write!(f, "checkpoint {index} is not active (none active)"),
            },
            Ignored::AlreadyCompleted(index) => write!(f, "checkpoint {index} already completed"),
            Ignored::NotEligible(index) => write!(f, "checkpoint {index} has not dwelled long enough"),
            Ignored::StaleDwell(index) => write!(f, "stale dwell timer for checkpoint {index}"),
            Ignored::WrongVariant => write!(f, "operation not available in this widget variant"),
        }
    }
}

impl std::error::Error for Ignored {}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    /// Set on first start, never cleared.
    pub active: bool,
    /// An intentional pause (control button or finish). Blocks auto-resume.
    pub manually_paused: bool,
    pub finished: bool,
}

/// Elapsed-time tracker. All timestamps are milliseconds from the
/// widget's monotonic origin.
#[derive(Debug, Clone, Default)]
pub struct Clock {
    pub status: ClockStatus,
    pub run: RunState,
    /// Elapsed time banked when the clock last stopped.
    accumulated_ms: u64,
    /// `now - accumulated` at the last start/resume; combines with `now`
    /// to compute the true elapsed time while running.
    start_epoch_ms: u64,
    /// Last value written by `sync`, read by the display.
    last_elapsed_ms: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == ClockStatus::Running
    }

    pub fn start(&mut self, now_ms: u64) -> Result<(), Ignored> {
        if self.run.finished {
            return Err(Ignored::Finished);
        }
        if self.is_running() {
            return Err(Ignored::AlreadyRunning);
        }
        self.run_from(now_ms);
        self.run.active = true;
        Ok(())
    }

    /// Manual pause: records the intent so visibility changes won't undo it.
    pub fn pause(&mut self, now_ms: u64) -> Result<(), Ignored> {
        self.stop_at(now_ms)?;
        self.run.manually_paused = true;
        Ok(())
    }

    /// Automatic pause used by the visibility guard; leaves the manual flag alone.
    pub fn suspend(&mut self, now_ms: u64) -> Result<(), Ignored> {
        self.stop_at(now_ms)
    }

    /// Does not clear `manually_paused`; callers acting on user intent do that.
    pub fn resume(&mut self, now_ms: u64) -> Result<(), Ignored> {
        if self.run.finished {
            return Err(Ignored::Finished);
        }
        if !self.run.active {
            return Err(Ignored::NotStarted);
        }
        if self.is_running() {
            return Err(Ignored::AlreadyRunning);
        }
        self.run_from(now_ms);
        Ok(())
    }

    pub fn clear_manual_pause(&mut self) {
        self.run.manually_paused = false;
    }

    /// Stops permanently. Safe to call on an already stopped clock.
    pub fn finish(&mut self, now_ms: u64) {
        let _ = self.stop_at(now_ms);
        self.run.manually_paused = true;
        self.run.finished = true;
    }

    /// Pure read of the elapsed time at `now_ms`.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        match self.status {
            ClockStatus::Running => now_ms.saturating_sub(self.start_epoch_ms),
            ClockStatus::Idle | ClockStatus::Paused => self.accumulated_ms,
        }
    }

    /// Caches the elapsed time at `now_ms` for rendering. Never moves the
    /// cached value backwards.
    pub fn sync(&mut self, now_ms: u64) -> u64 {
        let elapsed = self.elapsed_ms(now_ms);
        self.last_elapsed_ms = self.last_elapsed_ms.max(elapsed);
        self.last_elapsed_ms
    }

    pub fn last_elapsed_ms(&self) -> u64 {
        self.last_elapsed_ms
    }

    fn run_from(&mut self, now_ms: u64) {
        self.start_epoch_ms = now_ms.saturating_sub(self.accumulated_ms);
        self.status = ClockStatus::Running;
    }

    fn stop_at(&mut self, now_ms: u64) -> Result<(), Ignored> {
        if !self.is_running() {
            return Err(Ignored::NotRunning);
        }
        self.accumulated_ms = now_ms.saturating_sub(self.start_epoch_ms);
        self.last_elapsed_ms = self.last_elapsed_ms.max(self.accumulated_ms);
        self.status = ClockStatus::Paused;
        Ok(())
    }
}
