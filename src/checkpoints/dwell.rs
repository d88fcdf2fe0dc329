use serde::Serialize;

/// Per-checkpoint visibility tracker.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DwellState {
    NotVisible,
    VisibleWaiting,
    Eligible,
    Completed,
}

/// What the owner should do with the scheduler after an intersection update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwellAction {
    None,
    /// Start a dwell timer tagged with this generation.
    Schedule(u64),
    /// Cancel the pending dwell timer.
    Cancel,
    /// Eligible element left through the top edge.
    ExitedUpward,
}

#[derive(Debug, Clone)]
pub struct DwellTracker {
    state: DwellState,
    /// Last reported intersection, kept even while the clock is paused.
    in_view: bool,
    /// Bumped on every schedule so a late timer can be told apart.
    generation: u64,
}

impl Default for DwellTracker {
    fn default() -> Self {
        Self {
            state: DwellState::NotVisible,
            in_view: false,
            generation: 0,
        }
    }
}

impl DwellTracker {
    pub fn state(&self) -> DwellState {
        self.state
    }

    pub fn in_view(&self) -> bool {
        self.in_view
    }

    /// Applies an intersection report. `counting` is false while the clock is
    /// stopped: visibility is recorded but no dwell timer starts.
    pub fn observe(&mut self, is_intersecting: bool, bounding_top: f64, counting: bool) -> DwellAction {
        self.in_view = is_intersecting;
        match (self.state, is_intersecting) {
            (DwellState::Completed, _) => DwellAction::None,
            (DwellState::NotVisible, true) if counting => self.begin_wait(),
            (DwellState::NotVisible, _) => DwellAction::None,
            (DwellState::VisibleWaiting, true) => DwellAction::None,
            (DwellState::VisibleWaiting, false) => {
                self.state = DwellState::NotVisible;
                DwellAction::Cancel
            }
            (DwellState::Eligible, true) => DwellAction::None,
            (DwellState::Eligible, false) if bounding_top < 0.0 => DwellAction::ExitedUpward,
            // Leaving downward keeps the eligibility; the visitor may scroll back.
            (DwellState::Eligible, false) => DwellAction::None,
        }
    }

    /// Dwell timer fired. Returns false for a timer from an older generation.
    pub fn dwell_elapsed(&mut self, generation: u64) -> bool {
        if self.state != DwellState::VisibleWaiting || generation != self.generation {
            return false;
        }
        self.state = DwellState::Eligible;
        true
    }

    /// Clock stopped: abandon an unfinished wait. Eligibility survives.
    pub fn suspend(&mut self) -> DwellAction {
        if self.state == DwellState::VisibleWaiting {
            self.state = DwellState::NotVisible;
            return DwellAction::Cancel;
        }
        DwellAction::None
    }

    /// Clock running again: restart the wait if the element is still on screen.
    pub fn wake(&mut self) -> DwellAction {
        if self.state == DwellState::NotVisible && self.in_view {
            return self.begin_wait();
        }
        DwellAction::None
    }

    /// Terminal. Returns `Cancel` if a timer was still pending.
    pub fn complete(&mut self) -> DwellAction {
        let was_waiting = self.state == DwellState::VisibleWaiting;
        self.state = DwellState::Completed;
        if was_waiting {
            DwellAction::Cancel
        } else {
            DwellAction::None
        }
    }

    fn begin_wait(&mut self) -> DwellAction {
        self.generation += 1;
        self.state = DwellState::VisibleWaiting;
        DwellAction::Schedule(self.generation)
    }
}
