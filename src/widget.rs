//! The widget's state machine. Every operation takes the current time in
//! milliseconds from the widget's origin and returns the effects the page
//! and the scheduler should carry out; nothing here touches a timer or
//! the page directly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::checkpoints::{
    Checkpoint, CheckpointSequencer, ColorTag, Completion, DwellAction, Progress, Segment,
    SegmentTracker,
};
use crate::render::{ControlGlyph, DisplayColor, RenderOp};
use crate::settings::{NotificationTiming, WidgetSettings, WidgetVariant};
use crate::timer::{format_elapsed, Clock, ClockStatus, Ignored, RunState};
use crate::visibility::VisibilityGuard;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Render(RenderOp),
    Observe(usize),
    Unobserve(usize),
    /// Stop observing every checkpoint and drop pending dwell timers.
    DisconnectViewport,
    StartRedraw,
    StopRedraw,
    ScheduleDwell { index: usize, generation: u64, after_ms: u64 },
    CancelDwell { index: usize },
    Notify { text: String, timing: NotificationTiming },
}

#[derive(Debug, Clone)]
enum Progression {
    Checkpoints(CheckpointSequencer),
    Segments(SegmentTracker),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub run_id: Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub status: ClockStatus,
    pub run: RunState,
    pub elapsed_ms: u64,
    pub display: String,
    pub color: DisplayColor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<Progress>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub checkpoints: Vec<Checkpoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
pub struct TimerWidget {
    clock: Clock,
    guard: VisibilityGuard,
    progression: Progression,
    dwell_ms: u64,
    standard_notification: NotificationTiming,
    final_notification: NotificationTiming,
    color: DisplayColor,
    run_id: Uuid,
    started_at: Option<DateTime<Utc>>,
}

impl TimerWidget {
    pub fn new(settings: &WidgetSettings) -> Self {
        let progression = match settings.variant {
            WidgetVariant::Checkpoints => {
                Progression::Checkpoints(CheckpointSequencer::new(settings.checkpoints.clone()))
            }
            WidgetVariant::Segments => {
                Progression::Segments(SegmentTracker::new(settings.segments.clone()))
            }
        };

        Self {
            clock: Clock::new(),
            guard: VisibilityGuard::new(settings.visibility_policy),
            progression,
            dwell_ms: settings.dwell_ms,
            standard_notification: settings.standard_notification,
            final_notification: settings.final_notification,
            color: DisplayColor::Yellow,
            run_id: Uuid::new_v4(),
            started_at: None,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    /// Initial paint before any interaction.
    pub fn mount(&self) -> Vec<Effect> {
        vec![
            Effect::Render(RenderOp::SetText {
                text: format_elapsed(0),
            }),
            Effect::Render(RenderOp::control(ControlGlyph::Start)),
        ]
    }

    /// The start/pause control: first press starts the run, later presses
    /// toggle a manual pause.
    pub fn control_click(&mut self, now_ms: u64) -> Result<Vec<Effect>, Ignored> {
        if self.clock.run.finished {
            return Err(Ignored::Finished);
        }
        if !self.clock.run.active {
            self.start(now_ms)
        } else if self.clock.is_running() {
            self.pause(now_ms)
        } else {
            self.resume(now_ms)
        }
    }

    pub fn start(&mut self, now_ms: u64) -> Result<Vec<Effect>, Ignored> {
        if self.clock.run.active {
            return self.resume(now_ms);
        }
        // Activate before touching the clock so a rejected start leaves no trace.
        let first = match &mut self.progression {
            Progression::Checkpoints(sequencer) => Some(sequencer.activate_first()?),
            Progression::Segments(_) => None,
        };
        self.clock.start(now_ms)?;
        self.started_at = Some(Utc::now());

        let mut effects = vec![Effect::Render(RenderOp::Activate)];
        if let (Some(first), Progression::Checkpoints(sequencer)) = (first, &self.progression) {
            let checkpoint = &sequencer.checkpoints()[first];
            self.color = checkpoint.color_tag.into();
            effects.push(Effect::Render(RenderOp::ShowCheckpoint {
                index: first,
                name: checkpoint.name.clone(),
            }));
            effects.push(Effect::Observe(first));
        } else {
            self.color = ColorTag::Yellow.into();
        }
        effects.push(Effect::Render(RenderOp::color(self.color)));
        self.push_running(&mut effects, now_ms);
        Ok(effects)
    }

    /// Manual pause.
    pub fn pause(&mut self, now_ms: u64) -> Result<Vec<Effect>, Ignored> {
        self.clock.pause(now_ms)?;
        Ok(self.stopped_effects(now_ms))
    }

    /// User-driven resume; clears the manual pause.
    pub fn resume(&mut self, now_ms: u64) -> Result<Vec<Effect>, Ignored> {
        self.clock.resume(now_ms)?;
        self.clock.clear_manual_pause();
        let mut effects = Vec::new();
        self.push_running(&mut effects, now_ms);
        Ok(effects)
    }

    pub fn visibility_changed(&mut self, hidden: bool, now_ms: u64) -> Result<Vec<Effect>, Ignored> {
        if hidden {
            self.guard.on_hidden(&mut self.clock, now_ms)?;
            Ok(self.stopped_effects(now_ms))
        } else {
            self.guard.on_visible(&mut self.clock, now_ms)?;
            let mut effects = Vec::new();
            self.push_running(&mut effects, now_ms);
            Ok(effects)
        }
    }

    pub fn checkpoint_click(&mut self, index: usize, now_ms: u64) -> Result<Vec<Effect>, Ignored> {
        self.ensure_in_play()?;
        let elapsed = self.clock.sync(now_ms);
        let completion = self.sequencer_mut()?.manual_complete(index, elapsed)?;
        Ok(self.completion_effects(completion, now_ms))
    }

    pub fn intersection(
        &mut self,
        index: usize,
        is_intersecting: bool,
        bounding_top: f64,
        now_ms: u64,
    ) -> Result<Vec<Effect>, Ignored> {
        self.ensure_in_play()?;
        let counting = self.clock.is_running();
        let dwell_ms = self.dwell_ms;
        let action = self
            .sequencer_mut()?
            .intersection(index, is_intersecting, bounding_top, counting)?;

        match action {
            DwellAction::None => Ok(Vec::new()),
            DwellAction::Schedule(generation) => Ok(vec![Effect::ScheduleDwell {
                index,
                generation,
                after_ms: dwell_ms,
            }]),
            DwellAction::Cancel => Ok(vec![Effect::CancelDwell { index }]),
            DwellAction::ExitedUpward => {
                let elapsed = self.clock.sync(now_ms);
                let completion = self.sequencer_mut()?.auto_complete(index, elapsed)?;
                Ok(self.completion_effects(completion, now_ms))
            }
        }
    }

    /// A dwell timer fired for `index`.
    pub fn dwell_elapsed(&mut self, index: usize, generation: u64) -> Result<Vec<Effect>, Ignored> {
        self.ensure_in_play()?;
        self.sequencer_mut()?.dwell_elapsed(index, generation)?;
        Ok(Vec::new())
    }

    /// Periodic repaint. Segment thresholds are checked here since they only
    /// depend on elapsed time.
    pub fn redraw(&mut self, now_ms: u64) -> Vec<Effect> {
        let elapsed = self.clock.sync(now_ms);
        let mut effects = vec![Effect::Render(RenderOp::SetText {
            text: format_elapsed(elapsed),
        })];

        if let Progression::Segments(tracker) = &mut self.progression {
            let len = tracker.segments().len();
            for index in tracker.check(elapsed) {
                let segment = &tracker.segments()[index];
                self.color = if tracker.is_final(index) {
                    DisplayColor::Victory
                } else {
                    ColorTag::for_position(index + 1, len).into()
                };
                effects.push(Effect::Notify {
                    text: format!("✓ {}", segment.name),
                    timing: self.standard_notification,
                });
                effects.push(Effect::Render(RenderOp::color(self.color)));
            }
        }
        effects
    }

    pub fn snapshot(&self, now_ms: u64) -> TimerSnapshot {
        let elapsed_ms = self.clock.elapsed_ms(now_ms);
        let (progress, checkpoints, segments) = match &self.progression {
            Progression::Checkpoints(sequencer) => (
                Some(sequencer.progress()),
                sequencer.checkpoints().to_vec(),
                Vec::new(),
            ),
            Progression::Segments(tracker) => (None, Vec::new(), tracker.segments().to_vec()),
        };

        TimerSnapshot {
            run_id: self.run_id,
            started_at: self.started_at,
            status: self.clock.status,
            run: self.clock.run,
            elapsed_ms,
            display: format_elapsed(elapsed_ms),
            color: self.color,
            progress,
            checkpoints,
            segments,
        }
    }

    fn ensure_in_play(&self) -> Result<(), Ignored> {
        if self.clock.run.finished {
            return Err(Ignored::Finished);
        }
        if !self.clock.run.active {
            return Err(Ignored::NotStarted);
        }
        Ok(())
    }

    fn sequencer_mut(&mut self) -> Result<&mut CheckpointSequencer, Ignored> {
        match &mut self.progression {
            Progression::Checkpoints(sequencer) => Ok(sequencer),
            Progression::Segments(_) => Err(Ignored::WrongVariant),
        }
    }

    fn push_running(&mut self, effects: &mut Vec<Effect>, now_ms: u64) {
        effects.push(Effect::Render(RenderOp::SetText {
            text: format_elapsed(self.clock.sync(now_ms)),
        }));
        effects.push(Effect::Render(RenderOp::control(ControlGlyph::Pause)));
        effects.push(Effect::StartRedraw);
        if let Progression::Checkpoints(sequencer) = &mut self.progression {
            if let Some((index, DwellAction::Schedule(generation))) = sequencer.wake_active() {
                effects.push(Effect::ScheduleDwell {
                    index,
                    generation,
                    after_ms: self.dwell_ms,
                });
            }
        }
    }

    fn stopped_effects(&mut self, now_ms: u64) -> Vec<Effect> {
        let mut effects = vec![
            Effect::StopRedraw,
            Effect::Render(RenderOp::SetText {
                text: format_elapsed(self.clock.sync(now_ms)),
            }),
            Effect::Render(RenderOp::control(ControlGlyph::Resume)),
        ];
        if let Progression::Checkpoints(sequencer) = &mut self.progression {
            if let Some((index, DwellAction::Cancel)) = sequencer.suspend_active() {
                effects.push(Effect::CancelDwell { index });
            }
        }
        effects
    }

    fn completion_effects(&mut self, completion: Completion, now_ms: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        if completion.cancel_dwell {
            effects.push(Effect::CancelDwell {
                index: completion.index,
            });
        }
        effects.push(Effect::Unobserve(completion.index));
        effects.push(Effect::Render(RenderOp::CompleteCheckpoint {
            index: completion.index,
            split: format_elapsed(completion.split_ms),
        }));

        let Progression::Checkpoints(sequencer) = &self.progression else {
            return effects;
        };
        let completed_name = sequencer.checkpoints()[completion.index].name.clone();

        match completion.next {
            Some(next) => {
                let checkpoint = &sequencer.checkpoints()[next];
                let next_name = checkpoint.name.clone();
                self.color = checkpoint.color_tag.into();
                effects.push(Effect::Notify {
                    text: format!("✓ {completed_name}"),
                    timing: self.standard_notification,
                });
                effects.push(Effect::Render(RenderOp::color(self.color)));
                effects.push(Effect::Render(RenderOp::ShowCheckpoint {
                    index: next,
                    name: next_name,
                }));
                effects.push(Effect::Observe(next));
            }
            None => {
                self.clock.finish(now_ms);
                self.color = DisplayColor::Victory;
                let final_text = format_elapsed(self.clock.sync(now_ms));
                effects.push(Effect::StopRedraw);
                effects.push(Effect::DisconnectViewport);
                effects.push(Effect::Render(RenderOp::SetText {
                    text: final_text.clone(),
                }));
                effects.push(Effect::Render(RenderOp::color(self.color)));
                effects.push(Effect::Render(RenderOp::EnterFinished));
                effects.push(Effect::Notify {
                    text: format!("✓ {completed_name} {final_text}"),
                    timing: self.final_notification,
                });
            }
        }
        effects
    }
}
