//! Rolling text log of every delivered touch.
//!
//! One line per touch that changed in a frame:
//!
//! ```text
//! 1843920011 began 0 (120, 340)
//! 1853971204 moved 0 (125.5, 340)
//! ```
//!
//! The first column is nanoseconds on a monotonic clock.  After
//! `rollover_lines` lines the writer seeks back to the start of the file and
//! keeps writing over the oldest entries.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use touch_core::EventFrame;
use tracing::warn;

use crate::application::inject_gesture::{DeliveryOutcome, FrameObserver};

struct LogState<W> {
    writer: W,
    lines: usize,
}

pub struct TouchLog<W: Write + Seek + Send> {
    state: Mutex<LogState<W>>,
    rollover_lines: usize,
    epoch: Instant,
}

impl TouchLog<File> {
    /// Creates (or truncates) the log file at `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file or its parent directory
    /// cannot be created.
    pub fn create(path: &Path, rollover_lines: usize) -> io::Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(file, rollover_lines))
    }
}

impl<W: Write + Seek + Send> TouchLog<W> {
    pub fn new(writer: W, rollover_lines: usize) -> Self {
        Self {
            state: Mutex::new(LogState { writer, lines: 0 }),
            rollover_lines: rollover_lines.max(1),
            epoch: Instant::now(),
        }
    }

    pub fn into_inner(self) -> W {
        self.state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .writer
    }

    /// Appends the changed touches of `frame`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error hit while seeking or writing.
    pub fn write_frame(&self, frame: &EventFrame) -> io::Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        for touch in frame.touches.iter().filter(|t| frame.is_changed(t.id)) {
            if state.lines >= self.rollover_lines {
                state.writer.seek(SeekFrom::Start(0))?;
                state.lines = 0;
            }
            let nanos = self.epoch.elapsed().as_nanos();
            writeln!(
                state.writer,
                "{nanos} {} {} {}",
                touch.phase, touch.id, touch.location
            )?;
            state.lines += 1;
        }
        state.writer.flush()
    }
}

impl<W: Write + Seek + Send> FrameObserver for TouchLog<W> {
    fn observe(&self, _gesture: &str, frame: &EventFrame, _outcome: &DeliveryOutcome) {
        if let Err(e) = self.write_frame(frame) {
            warn!(sequence = frame.sequence, error = %e, "touch log write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use touch_core::{FrameBuilder, IdentitySpace, Point, SlotTable, SurfaceId, TouchPhase};

    fn two_touch_frame() -> EventFrame {
        let mut table = SlotTable::new();
        let ids = table.acquire_many(2, SurfaceId(1)).unwrap();
        table
            .transition(ids[0], TouchPhase::Began, Point::new(1.0, 2.0))
            .unwrap();
        table
            .transition(ids[1], TouchPhase::Began, Point::new(3.5, 4.0))
            .unwrap();
        FrameBuilder::new()
            .build(&table, &[ids[1]], &IdentitySpace)
            .unwrap()
    }

    fn lines(log: TouchLog<Cursor<Vec<u8>>>) -> Vec<String> {
        String::from_utf8(log.into_inner().into_inner())
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_logs_only_changed_touches() {
        // Arrange
        let log = TouchLog::new(Cursor::new(Vec::new()), 100);

        // Act
        log.write_frame(&two_touch_frame()).unwrap();

        // Assert
        let lines = lines(log);
        assert_eq!(lines.len(), 1);
        let (nanos, rest) = lines[0].split_once(' ').unwrap();
        assert!(nanos.parse::<u128>().is_ok());
        assert_eq!(rest, "began 1 (3.5, 4)");
    }

    #[test]
    fn test_rolls_over_to_file_start() {
        // Arrange
        let log = TouchLog::new(Cursor::new(Vec::new()), 2);
        let frame = two_touch_frame();

        // Act – three lines with a two-line budget
        for _ in 0..3 {
            log.write_frame(&frame).unwrap();
        }

        // Assert – the third line overwrote the first
        let state = log.state.lock().unwrap();
        assert_eq!(state.lines, 1);
        assert!((state.writer.position() as usize) < state.writer.get_ref().len());
    }

    #[test]
    fn test_create_writes_to_disk() {
        let dir = std::env::temp_dir().join(format!("touchsynth-log-{}", uuid::Uuid::new_v4()));
        let path = dir.join("touches.log");

        let log = TouchLog::create(&path, 10).unwrap();
        log.observe("tap", &two_touch_frame(), &DeliveryOutcome::Accepted);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("began 1 (3.5, 4)\n"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
