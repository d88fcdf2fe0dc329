pub mod dwell;
pub mod segments;
pub mod sequencer;

pub use dwell::{DwellAction, DwellState};
pub use segments::{Segment, SegmentTracker};
pub use sequencer::{Checkpoint, CheckpointSequencer, ColorTag, Completion, CompletionSource, Progress};
