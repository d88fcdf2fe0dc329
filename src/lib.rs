pub mod bridge;
pub mod checkpoints;
pub mod notifier;
pub mod render;
pub mod settings;
pub mod timer;
mod utils;
pub mod visibility;
pub mod widget;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use bridge::JsonSurface;

pub use render::{RenderOp, Renderer, Viewport};
pub use settings::WidgetSettings;
pub use timer::{format_elapsed, WidgetController};
pub use widget::{TimerSnapshot, TimerWidget};

const DEFAULT_SETTINGS_FILE: &str = "speedrun.json";

pub fn run() -> anyhow::Result<()> {
    let debug_mode = std::env::var("SPEEDRUN_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // RUST_LOG still wins over the default level.
    env_logger::Builder::new()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    let settings_path = std::env::var_os("SPEEDRUN_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));
    let settings = WidgetSettings::load(&settings_path)?;

    log::info!(
        "speedrun timer starting ({:?} variant, settings from {})",
        settings.variant,
        settings_path.display()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build the timer runtime")?;

    runtime.block_on(async move {
        let surface = Arc::new(JsonSurface::new(std::io::stdout()));
        let controller = WidgetController::new(&settings, surface.clone(), surface.clone());
        controller.mount().await;

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        bridge::serve(stdin, &controller, surface).await
    })
}
