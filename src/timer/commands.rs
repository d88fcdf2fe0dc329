use serde::Deserialize;

use crate::widget::TimerSnapshot;

use super::WidgetController;

/// Something that happened on the page.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum PageEvent {
    ControlClick,
    #[serde(rename_all = "camelCase")]
    CheckpointClick { index: usize },
    #[serde(rename_all = "camelCase")]
    Intersection {
        index: usize,
        is_intersecting: bool,
        bounding_top: f64,
    },
    #[serde(rename_all = "camelCase")]
    VisibilityChange { hidden: bool },
    Snapshot,
}

/// Routes a page event to the controller. Only `Snapshot` produces a reply.
pub async fn dispatch(controller: &WidgetController, event: PageEvent) -> Option<TimerSnapshot> {
    match event {
        PageEvent::ControlClick => controller.control_click().await,
        PageEvent::CheckpointClick { index } => controller.checkpoint_click(index).await,
        PageEvent::Intersection {
            index,
            is_intersecting,
            bounding_top,
        } => {
            controller
                .intersection(index, is_intersecting, bounding_top)
                .await
        }
        PageEvent::VisibilityChange { hidden } => controller.visibility_changed(hidden).await,
        PageEvent::Snapshot => return Some(controller.get_snapshot().await),
    }
    None
}
