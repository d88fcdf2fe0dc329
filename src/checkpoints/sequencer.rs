use serde::Serialize;

use crate::timer::Ignored;

use super::dwell::{DwellAction, DwellState, DwellTracker};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ColorTag {
    Yellow,
    Orange,
    Red,
}

impl ColorTag {
    /// First checkpoint is yellow, the last red, everything between orange.
    pub fn for_position(order: usize, len: usize) -> Self {
        if order == 0 {
            ColorTag::Yellow
        } else if order + 1 >= len {
            ColorTag::Red
        } else {
            ColorTag::Orange
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub name: String,
    pub order: usize,
    pub completed: bool,
    pub color_tag: ColorTag,
    pub is_terminal: bool,
    /// Elapsed time when the checkpoint was completed.
    pub split_ms: Option<u64>,
    #[serde(skip)]
    dwell: DwellTracker,
}

impl Checkpoint {
    pub fn dwell_state(&self) -> DwellState {
        self.dwell.state()
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "state", content = "index")]
pub enum Progress {
    NotStarted,
    Pending(usize),
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Manual,
    Scroll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub index: usize,
    pub source: CompletionSource,
    pub split_ms: u64,
    /// Newly active checkpoint, `None` when the run just finished.
    pub next: Option<usize>,
    /// A dwell timer was pending for the completed checkpoint.
    pub cancel_dwell: bool,
}

impl Completion {
    pub fn finished(&self) -> bool {
        self.next.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct CheckpointSequencer {
    checkpoints: Vec<Checkpoint>,
    progress: Progress,
}

impl CheckpointSequencer {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let len = names.len();
        let checkpoints = names
            .into_iter()
            .enumerate()
            .map(|(order, name)| Checkpoint {
                name,
                order,
                completed: false,
                color_tag: ColorTag::for_position(order, len),
                is_terminal: order + 1 == len,
                split_ms: None,
                dwell: DwellTracker::default(),
            })
            .collect();

        Self {
            checkpoints,
            progress: Progress::NotStarted,
        }
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn active(&self) -> Option<usize> {
        match self.progress {
            Progress::Pending(index) => Some(index),
            Progress::NotStarted | Progress::Finished => None,
        }
    }

    pub fn active_checkpoint(&self) -> Option<&Checkpoint> {
        self.active().and_then(|index| self.checkpoints.get(index))
    }

    /// Clock started for the first time: checkpoint 0 goes live.
    pub fn activate_first(&mut self) -> Result<usize, Ignored> {
        match self.progress {
            Progress::NotStarted if !self.checkpoints.is_empty() => {
                self.progress = Progress::Pending(0);
                Ok(0)
            }
            Progress::NotStarted => Err(Ignored::UnknownCheckpoint(0)),
            Progress::Pending(_) => Err(Ignored::AlreadyRunning),
            Progress::Finished => Err(Ignored::Finished),
        }
    }

    pub fn intersection(
        &mut self,
        index: usize,
        is_intersecting: bool,
        bounding_top: f64,
        counting: bool,
    ) -> Result<DwellAction, Ignored> {
        let checkpoint = self.active_mut(index)?;
        Ok(checkpoint.dwell.observe(is_intersecting, bounding_top, counting))
    }

    pub fn dwell_elapsed(&mut self, index: usize, generation: u64) -> Result<(), Ignored> {
        let checkpoint = self.active_mut(index)?;
        if checkpoint.dwell.dwell_elapsed(generation) {
            Ok(())
        } else {
            Err(Ignored::StaleDwell(index))
        }
    }

    pub fn manual_complete(&mut self, index: usize, elapsed_ms: u64) -> Result<Completion, Ignored> {
        self.active_mut(index)?;
        Ok(self.complete(index, CompletionSource::Manual, elapsed_ms))
    }

    /// Completion through an upward scroll exit; needs a satisfied dwell.
    pub fn auto_complete(&mut self, index: usize, elapsed_ms: u64) -> Result<Completion, Ignored> {
        let checkpoint = self.active_mut(index)?;
        if checkpoint.dwell.state() != DwellState::Eligible {
            return Err(Ignored::NotEligible(index));
        }
        Ok(self.complete(index, CompletionSource::Scroll, elapsed_ms))
    }

    /// Clock stopped: the active checkpoint's pending wait is abandoned.
    pub fn suspend_active(&mut self) -> Option<(usize, DwellAction)> {
        let index = self.active()?;
        let action = self.checkpoints[index].dwell.suspend();
        Some((index, action))
    }

    pub fn wake_active(&mut self) -> Option<(usize, DwellAction)> {
        let index = self.active()?;
        let action = self.checkpoints[index].dwell.wake();
        Some((index, action))
    }

    fn active_mut(&mut self, index: usize) -> Result<&mut Checkpoint, Ignored> {
        let active = self.active();
        let checkpoint = self
            .checkpoints
            .get_mut(index)
            .ok_or(Ignored::UnknownCheckpoint(index))?;
        if checkpoint.completed {
            return Err(Ignored::AlreadyCompleted(index));
        }
        if active != Some(index) {
            return Err(Ignored::NotActive { index, active });
        }
        Ok(checkpoint)
    }

    fn complete(&mut self, index: usize, source: CompletionSource, elapsed_ms: u64) -> Completion {
        let checkpoint = &mut self.checkpoints[index];
        let cancel_dwell = checkpoint.dwell.complete() == DwellAction::Cancel;
        checkpoint.completed = true;
        checkpoint.split_ms = Some(elapsed_ms);

        let next = if checkpoint.is_terminal {
            self.progress = Progress::Finished;
            None
        } else {
            self.progress = Progress::Pending(index + 1);
            Some(index + 1)
        };

        Completion {
            index,
            source,
            split_ms: elapsed_ms,
            next,
            cancel_dwell,
        }
    }
}
