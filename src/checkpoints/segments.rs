use serde::{Deserialize, Serialize};

/// Elapsed-time marker used by the segment variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub name: String,
    pub threshold_ms: u64,
    #[serde(default, skip_deserializing)]
    pub reached: bool,
}

impl Segment {
    pub fn new(name: impl Into<String>, threshold_ms: u64) -> Self {
        Self {
            name: name.into(),
            threshold_ms,
            reached: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SegmentTracker {
    segments: Vec<Segment>,
}

impl SegmentTracker {
    pub fn new(mut segments: Vec<Segment>) -> Self {
        segments.sort_by_key(|segment| segment.threshold_ms);
        for segment in &mut segments {
            segment.reached = false;
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_final(&self, index: usize) -> bool {
        index + 1 == self.segments.len()
    }

    /// Marks every threshold at or below `elapsed_ms` and returns the indices
    /// reached by this call, in order.
    pub fn check(&mut self, elapsed_ms: u64) -> Vec<usize> {
        self.segments
            .iter_mut()
            .enumerate()
            .filter(|(_, segment)| !segment.reached && elapsed_ms >= segment.threshold_ms)
            .map(|(index, segment)| {
                segment.reached = true;
                index
            })
            .collect()
    }
}
