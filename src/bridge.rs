//! JSON-lines bridge between the widget and the page script. Page events
//! arrive one per line; render and viewport operations leave one per line.

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::{
    render::{RenderOp, Renderer, Viewport},
    timer::{
        commands::{dispatch, PageEvent},
        WidgetController,
    },
    widget::TimerSnapshot,
};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Serialize)]
#[serde(rename_all = "camelCase", tag = "op")]
enum ViewportOp {
    Observe { index: usize },
    Unobserve { index: usize },
    Disconnect,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase", tag = "op")]
enum Reply<'a> {
    Snapshot { snapshot: &'a TimerSnapshot },
}

/// Renderer and viewport that serialize every call onto a writer.
pub struct JsonSurface<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonSurface<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn write_line<T: Serialize>(&self, value: &T) -> Result<()> {
        let mut out = self.out.lock().unwrap();
        serde_json::to_writer(&mut *out, value).context("failed to encode bridge message")?;
        out.write_all(b"\n").context("failed to write bridge message")?;
        out.flush().context("failed to flush bridge output")
    }

    fn emit<T: Serialize>(&self, value: &T) {
        if let Err(err) = self.write_line(value) {
            log_error!("{err:#}");
        }
    }

    pub fn reply_snapshot(&self, snapshot: &TimerSnapshot) -> Result<()> {
        self.write_line(&Reply::Snapshot { snapshot })
    }
}

impl<W: Write + Send> Renderer for JsonSurface<W> {
    fn apply(&self, op: RenderOp) {
        self.emit(&op);
    }
}

impl<W: Write + Send> Viewport for JsonSurface<W> {
    fn observe(&self, index: usize) {
        self.emit(&ViewportOp::Observe { index });
    }

    fn unobserve(&self, index: usize) {
        self.emit(&ViewportOp::Unobserve { index });
    }

    fn disconnect(&self) {
        self.emit(&ViewportOp::Disconnect);
    }
}

/// Feeds page events from `input` to the controller until EOF, then shuts
/// the widget down. Malformed lines are logged and skipped.
pub async fn serve<R, W>(
    input: R,
    controller: &WidgetController,
    surface: Arc<JsonSurface<W>>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write + Send,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await.context("failed to read page event")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match serde_json::from_str::<PageEvent>(line) {
            Ok(event) => event,
            Err(err) => {
                log_warn!("skipping malformed page event {line:?}: {err}");
                continue;
            }
        };
        log_debug!("page event: {event:?}");

        if let Some(snapshot) = dispatch(controller, event).await {
            if let Err(err) = surface.reply_snapshot(&snapshot) {
                log_error!("snapshot reply dropped: {err:#}");
            }
        }
    }

    log_info!("page closed the bridge");
    controller.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::WidgetSettings;
    use serde_json::Value;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn lines(&self) -> Vec<Value> {
            let bytes = self.0.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn surface_writes_one_json_object_per_line() {
        let buf = SharedBuf::default();
        let surface = JsonSurface::new(buf.clone());
        surface.apply(RenderOp::SetText {
            text: "00:00:00".into(),
        });
        surface.observe(2);
        surface.disconnect();

        let lines = buf.lines();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["op"], "setText");
        assert_eq!(lines[0]["text"], "00:00:00");
        assert_eq!(lines[1]["op"], "observe");
        assert_eq!(lines[1]["index"], 2);
        assert_eq!(lines[2]["op"], "disconnect");
    }

    #[tokio::test(start_paused = true)]
    async fn serve_dispatches_events_and_replies_to_snapshots() {
        let buf = SharedBuf::default();
        let surface = Arc::new(JsonSurface::new(buf.clone()));
        let controller =
            WidgetController::new(&WidgetSettings::default(), surface.clone(), surface.clone());

        let input = concat!(
            "{\"event\":\"controlClick\"}\n",
            "not json\n",
            "\n",
            "{\"event\":\"checkpointClick\",\"index\":0}\n",
            "{\"event\":\"snapshot\"}\n",
        );
        serve(input.as_bytes(), &controller, surface).await.unwrap();

        let lines = buf.lines();
        assert!(lines.iter().any(|line| line["op"] == "activate"));
        assert!(lines
            .iter()
            .any(|line| line["op"] == "observe" && line["index"] == 1));
        let snapshot = lines
            .iter()
            .find(|line| line["op"] == "snapshot")
            .expect("snapshot reply");
        assert_eq!(snapshot["snapshot"]["progress"]["index"], 1);
        assert_eq!(snapshot["snapshot"]["checkpoints"][0]["completed"], true);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_snapshot_reply_still_shuts_down() {
        let surface = Arc::new(JsonSurface::new(BrokenPipe));
        let controller =
            WidgetController::new(&WidgetSettings::default(), surface.clone(), surface.clone());

        let input = concat!(
            "{\"event\":\"controlClick\"}\n",
            "{\"event\":\"snapshot\"}\n",
            "{\"event\":\"controlClick\"}\n",
        );
        serve(input.as_bytes(), &controller, surface).await.unwrap();

        let snapshot = controller.get_snapshot().await;
        assert_eq!(snapshot.status, crate::timer::ClockStatus::Paused);
        assert!(!snapshot.run.finished);
    }
}
