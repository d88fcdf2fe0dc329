use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::checkpoints::Segment;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum WidgetVariant {
    /// Progress driven by scrolling past page sections.
    Checkpoints,
    /// Progress driven by elapsed-time thresholds.
    Segments,
}

impl Default for WidgetVariant {
    fn default() -> Self {
        WidgetVariant::Checkpoints
    }
}

/// How a hidden tab interacts with a manual pause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum VisibilityPolicy {
    /// A manual pause survives hide/show; only the control resumes it.
    StickyManualPause,
    /// Hiding the tab forgets the manual pause, so coming back resumes.
    ClearOnHide,
}

impl Default for VisibilityPolicy {
    fn default() -> Self {
        VisibilityPolicy::StickyManualPause
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTiming {
    pub fade_after_ms: u64,
    pub remove_after_ms: u64,
}

impl NotificationTiming {
    pub const STANDARD: Self = Self {
        fade_after_ms: 4_000,
        remove_after_ms: 7_000,
    };

    pub const FINAL: Self = Self {
        fade_after_ms: 8_000,
        remove_after_ms: 11_000,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct WidgetSettings {
    pub variant: WidgetVariant,
    pub redraw_interval_ms: u64,
    pub dwell_ms: u64,
    pub visibility_policy: VisibilityPolicy,
    pub standard_notification: NotificationTiming,
    pub final_notification: NotificationTiming,
    pub checkpoints: Vec<String>,
    pub segments: Vec<Segment>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        Self {
            variant: WidgetVariant::default(),
            redraw_interval_ms: 10,
            dwell_ms: 2_000,
            visibility_policy: VisibilityPolicy::default(),
            standard_notification: NotificationTiming::STANDARD,
            final_notification: NotificationTiming::FINAL,
            checkpoints: vec![
                "1st checkpoint".into(),
                "2nd checkpoint".into(),
                "Final checkpoint".into(),
            ],
            segments: vec![
                Segment::new("1st segment", 5_000),
                Segment::new("2nd segment", 10_000),
                Segment::new("Final time", 15_000),
            ],
        }
    }
}

impl WidgetSettings {
    /// Reads settings from a JSON file. A missing file yields defaults; a
    /// malformed one is logged and replaced by defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = match serde_json::from_str::<Self>(&contents) {
            Ok(settings) => settings,
            Err(err) => {
                log_warn!("Ignoring malformed settings in {}: {err}", path.display());
                Self::default()
            }
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.redraw_interval_ms == 0 {
            bail!("redrawIntervalMs must be greater than zero");
        }
        for (label, timing) in [
            ("standardNotification", self.standard_notification),
            ("finalNotification", self.final_notification),
        ] {
            if timing.remove_after_ms < timing.fade_after_ms {
                bail!("{label}: removeAfterMs must not be earlier than fadeAfterMs");
            }
        }
        match self.variant {
            WidgetVariant::Checkpoints if self.checkpoints.is_empty() => {
                bail!("checkpoint variant needs at least one checkpoint")
            }
            WidgetVariant::Segments if self.segments.is_empty() => {
                bail!("segment variant needs at least one segment")
            }
            _ => Ok(()),
        }
    }
}
