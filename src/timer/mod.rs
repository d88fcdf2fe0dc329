pub mod commands;
pub mod controller;
pub mod format;
pub mod state;

pub use controller::WidgetController;
pub use format::format_elapsed;
pub use state::{Clock, ClockStatus, Ignored, RunState};
