//! Dispatch sink that writes each frame as one JSON line.

use std::io::Write;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use touch_core::EventFrame;
use tracing::warn;

use crate::application::inject_gesture::{DeliveryOutcome, DispatchSink};

/// Serialises frames with `serde_json`, one object per line.
///
/// A frame is accepted once it has been written and flushed; a serialisation
/// or I/O failure rejects it.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_frame(&self, frame: &EventFrame) -> std::io::Result<()> {
        let line = serde_json::to_string(frame)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")?;
        writer.flush()
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

#[async_trait]
impl<W: Write + Send> DispatchSink for JsonLinesSink<W> {
    async fn deliver(&self, frame: &EventFrame) -> DeliveryOutcome {
        match self.write_frame(frame) {
            Ok(()) => DeliveryOutcome::Accepted,
            Err(e) => {
                warn!(sequence = frame.sequence, error = %e, "failed to write frame");
                DeliveryOutcome::Rejected(e.to_string())
            }
        }
    }
}
