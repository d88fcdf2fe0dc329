use std::{
    collections::HashMap,
    sync::{Arc, Mutex as StdMutex},
};

use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Duration, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    notifier::Notifier,
    render::{Renderer, Viewport},
    settings::WidgetSettings,
    widget::{Effect, TimerSnapshot, TimerWidget},
};

use super::Ignored;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

/// Owns the widget and carries out its effects: repaint ticker, dwell
/// timers, notifications and viewport observation. Cheap to clone; clones
/// share the same widget.
#[derive(Clone)]
pub struct WidgetController {
    widget: Arc<Mutex<TimerWidget>>,
    renderer: Arc<dyn Renderer>,
    viewport: Arc<dyn Viewport>,
    notifier: Notifier,
    origin: Instant,
    tick_interval: Duration,
    ticker: Arc<StdMutex<Option<JoinHandle<()>>>>,
    dwell_timers: Arc<StdMutex<HashMap<usize, CancellationToken>>>,
}

impl WidgetController {
    pub fn new(
        settings: &WidgetSettings,
        renderer: Arc<dyn Renderer>,
        viewport: Arc<dyn Viewport>,
    ) -> Self {
        Self {
            widget: Arc::new(Mutex::new(TimerWidget::new(settings))),
            notifier: Notifier::new(renderer.clone()),
            renderer,
            viewport,
            origin: Instant::now(),
            tick_interval: Duration::from_millis(settings.redraw_interval_ms),
            ticker: Arc::new(StdMutex::new(None)),
            dwell_timers: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Milliseconds since the controller was built.
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub async fn mount(&self) {
        let widget = self.widget.lock().await;
        self.apply_effects(widget.mount());
    }

    pub async fn control_click(&self) {
        let mut widget = self.widget.lock().await;
        let result = widget.control_click(self.now_ms());
        self.settle("control click", result);
    }

    pub async fn start(&self) {
        let mut widget = self.widget.lock().await;
        let result = widget.start(self.now_ms());
        self.settle("start", result);
    }

    pub async fn pause(&self) {
        let mut widget = self.widget.lock().await;
        let result = widget.pause(self.now_ms());
        self.settle("pause", result);
    }

    pub async fn resume(&self) {
        let mut widget = self.widget.lock().await;
        let result = widget.resume(self.now_ms());
        self.settle("resume", result);
    }

    pub async fn checkpoint_click(&self, index: usize) {
        let mut widget = self.widget.lock().await;
        let result = widget.checkpoint_click(index, self.now_ms());
        self.settle("checkpoint click", result);
    }

    pub async fn intersection(&self, index: usize, is_intersecting: bool, bounding_top: f64) {
        let mut widget = self.widget.lock().await;
        let result = widget.intersection(index, is_intersecting, bounding_top, self.now_ms());
        self.settle("intersection", result);
    }

    pub async fn visibility_changed(&self, hidden: bool) {
        let mut widget = self.widget.lock().await;
        let result = widget.visibility_changed(hidden, self.now_ms());
        self.settle(if hidden { "page hidden" } else { "page visible" }, result);
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        let widget = self.widget.lock().await;
        widget.snapshot(self.now_ms())
    }

    /// Stops every background activity. The widget stays inert afterwards.
    pub fn shutdown(&self) {
        self.cancel_ticker();
        self.cancel_all_dwell();
        self.notifier.shutdown();
        log_info!("widget shut down");
    }

    fn settle(&self, label: &str, result: Result<Vec<Effect>, Ignored>) {
        match result {
            Ok(effects) => self.apply_effects(effects),
            Err(reason) => log_debug!("ignored {label}: {reason}"),
        }
    }

    /// Runs with the widget lock held so effects land in transition order.
    fn apply_effects(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Render(op) => self.renderer.apply(op),
                Effect::Observe(index) => self.viewport.observe(index),
                Effect::Unobserve(index) => self.viewport.unobserve(index),
                Effect::DisconnectViewport => {
                    self.cancel_all_dwell();
                    self.viewport.disconnect();
                    log_info!("run finished, viewport observation disconnected");
                }
                Effect::StartRedraw => self.spawn_ticker(),
                Effect::StopRedraw => self.cancel_ticker(),
                Effect::ScheduleDwell {
                    index,
                    generation,
                    after_ms,
                } => self.schedule_dwell(index, generation, Duration::from_millis(after_ms)),
                Effect::CancelDwell { index } => self.cancel_dwell(index),
                Effect::Notify { text, timing } => {
                    log_info!("notify: {text}");
                    self.notifier.notify(text, timing);
                }
            }
        }
    }

    fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().unwrap();
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(controller.tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;

                let mut widget = controller.widget.lock().await;
                if !widget.is_running() {
                    break;
                }
                let effects = widget.redraw(controller.now_ms());
                controller.apply_effects(effects);
            }
        });

        *ticker_guard = Some(handle);
    }

    fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().unwrap().take() {
            handle.abort();
        }
    }

    fn schedule_dwell(&self, index: usize, generation: u64, after: Duration) {
        let token = CancellationToken::new();
        if let Some(previous) = self
            .dwell_timers
            .lock()
            .unwrap()
            .insert(index, token.clone())
        {
            previous.cancel();
        }

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(after) => {
                    let mut widget = controller.widget.lock().await;
                    if token.is_cancelled() {
                        return;
                    }
                    // Replacements cancel first and run under the widget lock,
                    // so an uncancelled token is still the one in the map.
                    controller.dwell_timers.lock().unwrap().remove(&index);
                    let result = widget.dwell_elapsed(index, generation);
                    if result.is_ok() {
                        log_info!("checkpoint {index} eligible for scroll completion");
                    }
                    controller.settle("dwell timer", result);
                }
                _ = token.cancelled() => {}
            }
        });
    }

    fn cancel_dwell(&self, index: usize) {
        if let Some(token) = self.dwell_timers.lock().unwrap().remove(&index) {
            token.cancel();
        }
    }

    #[cfg(test)]
    fn pending_dwell_count(&self) -> usize {
        self.dwell_timers.lock().unwrap().len()
    }

    fn cancel_all_dwell(&self) {
        for (_, token) in self.dwell_timers.lock().unwrap().drain() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoints::Progress;
    use crate::render::recording::{RecordingSurface, SurfaceCall};
    use crate::render::{DisplayColor, RenderOp};
    use crate::timer::ClockStatus;

    fn controller_with(settings: WidgetSettings) -> (WidgetController, Arc<RecordingSurface>) {
        let surface = Arc::new(RecordingSurface::default());
        let controller = WidgetController::new(&settings, surface.clone(), surface.clone());
        (controller, surface)
    }

    fn controller() -> (WidgetController, Arc<RecordingSurface>) {
        controller_with(WidgetSettings {
            checkpoints: vec!["About".into(), "Projects".into(), "Contact".into()],
            ..WidgetSettings::default()
        })
    }

    async fn advance_to(controller: &WidgetController, at_ms: u64) {
        let now = controller.now_ms();
        assert!(at_ms >= now, "cannot go back from {now} to {at_ms}");
        time::sleep(Duration::from_millis(at_ms - now)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn mount_paints_idle_display() {
        let (controller, surface) = controller();
        controller.mount().await;
        assert_eq!(surface.last_text().as_deref(), Some("00:00:00"));
        assert_eq!(controller.get_snapshot().await.status, ClockStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_repaints_while_running_and_stops_on_pause() {
        let (controller, surface) = controller();
        controller.control_click().await;

        advance_to(&controller, 1_235).await;
        assert_eq!(surface.last_text().as_deref(), Some("00:01:23"));

        controller.control_click().await;
        let paused_text = surface.last_text();
        let ops_after_pause = surface.ops().len();

        advance_to(&controller, 3_000).await;
        assert_eq!(surface.ops().len(), ops_after_pause, "no repaint while paused");
        assert_eq!(surface.last_text(), paused_text);
    }

    #[tokio::test(start_paused = true)]
    async fn scroll_scenario_advances_to_second_checkpoint() {
        let (controller, surface) = controller();
        controller.control_click().await;
        assert!(surface.calls().contains(&SurfaceCall::Observe(0)));

        advance_to(&controller, 500).await;
        controller.intersection(0, true, 240.0).await;

        advance_to(&controller, 2_600).await;
        advance_to(&controller, 3_000).await;
        controller.intersection(0, false, -20.0).await;

        let snapshot = controller.get_snapshot().await;
        assert_eq!(snapshot.progress, Some(Progress::Pending(1)));
        assert_eq!(snapshot.color, DisplayColor::Orange);
        assert_eq!(surface.last_color(), Some(DisplayColor::Orange));
        assert_eq!(surface.notifications(), vec!["✓ About".to_string()]);

        let calls = surface.calls();
        assert!(calls.contains(&SurfaceCall::Unobserve(0)));
        assert!(calls.contains(&SurfaceCall::Observe(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn fired_dwell_timer_is_forgotten() {
        let (controller, _surface) = controller();
        controller.control_click().await;
        controller.intersection(0, true, 240.0).await;
        assert_eq!(controller.pending_dwell_count(), 1);

        advance_to(&controller, 2_100).await;
        assert_eq!(controller.pending_dwell_count(), 0);
        assert_eq!(
            controller.get_snapshot().await.checkpoints[0].dwell_state(),
            crate::checkpoints::DwellState::Eligible
        );

        controller.intersection(1, true, 240.0).await;
        assert_eq!(controller.pending_dwell_count(), 0, "checkpoint 1 is not active yet");
    }

    #[tokio::test(start_paused = true)]
    async fn short_dwell_does_not_complete() {
        let (controller, surface) = controller();
        controller.control_click().await;
        controller.intersection(0, true, 240.0).await;

        advance_to(&controller, 1_900).await;
        controller.intersection(0, false, -20.0).await;
        advance_to(&controller, 5_000).await;

        assert_eq!(
            controller.get_snapshot().await.progress,
            Some(Progress::Pending(0))
        );
        assert!(surface.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hidden_tab_pauses_and_returns() {
        let (controller, _surface) = controller();
        controller.control_click().await;

        advance_to(&controller, 1_000).await;
        controller.visibility_changed(true).await;
        advance_to(&controller, 6_000).await;
        controller.visibility_changed(false).await;
        advance_to(&controller, 6_500).await;

        let snapshot = controller.get_snapshot().await;
        assert_eq!(snapshot.status, ClockStatus::Running);
        assert_eq!(snapshot.elapsed_ms, 1_500);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_pause_survives_tab_switch() {
        let (controller, _surface) = controller();
        controller.control_click().await;
        advance_to(&controller, 1_000).await;
        controller.pause().await;

        controller.visibility_changed(true).await;
        controller.visibility_changed(false).await;
        advance_to(&controller, 4_000).await;

        let snapshot = controller.get_snapshot().await;
        assert_eq!(snapshot.status, ClockStatus::Paused);
        assert_eq!(snapshot.elapsed_ms, 1_000);

        controller.resume().await;
        controller.visibility_changed(true).await;
        controller.visibility_changed(false).await;
        assert_eq!(controller.get_snapshot().await.status, ClockStatus::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn finishing_disconnects_and_freezes() {
        let (controller, surface) = controller();
        controller.control_click().await;
        controller.checkpoint_click(0).await;
        controller.checkpoint_click(1).await;
        controller.intersection(2, true, 40.0).await;

        advance_to(&controller, 1_000).await;
        controller.checkpoint_click(2).await;
        controller.checkpoint_click(2).await;

        let calls = surface.calls();
        let disconnects = calls
            .iter()
            .filter(|call| **call == SurfaceCall::Disconnect)
            .count();
        assert_eq!(disconnects, 1);
        assert!(surface.ops().contains(&RenderOp::EnterFinished));

        controller.visibility_changed(true).await;
        controller.visibility_changed(false).await;
        controller.control_click().await;
        advance_to(&controller, 4_000).await;

        let snapshot = controller.get_snapshot().await;
        assert!(snapshot.run.finished);
        assert_eq!(snapshot.elapsed_ms, 1_000);
        assert_eq!(snapshot.display, "00:01:00");
        assert_eq!(
            surface.notifications().last().map(String::as_str),
            Some("✓ Contact 00:01:00")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn segment_variant_notifies_from_the_ticker() {
        let (controller, surface) = controller_with(WidgetSettings {
            variant: crate::settings::WidgetVariant::Segments,
            ..WidgetSettings::default()
        });
        controller.control_click().await;

        advance_to(&controller, 10_050).await;
        assert_eq!(
            surface.notifications(),
            vec!["✓ 1st segment".to_string(), "✓ 2nd segment".to_string()]
        );
        assert_eq!(surface.last_color(), Some(DisplayColor::Red));

        advance_to(&controller, 15_050).await;
        assert_eq!(surface.last_color(), Some(DisplayColor::Victory));
        controller.shutdown();
    }
}
