// Event stream writer
// Writes JSON-lines output, keeping selected stream categories and dropping orphan frames

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::events::{Event, StreamCategory};
use crate::stream::StreamError;

/// Which categories are written, and which are dropped when orphaned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamFilter {
    pub streams: BTreeSet<StreamCategory>,
    pub drop_orphans: BTreeSet<StreamCategory>,
}

impl StreamFilter {
    pub fn new(
        streams: impl IntoIterator<Item = StreamCategory>,
        drop_orphans: impl IntoIterator<Item = StreamCategory>,
    ) -> Self {
        StreamFilter {
            streams: streams.into_iter().collect(),
            drop_orphans: drop_orphans.into_iter().collect(),
        }
    }

    /// Keep everything, drop nothing
    pub fn all() -> Self {
        StreamFilter::new(
            [
                StreamCategory::TrayInfo,
                StreamCategory::Geometry,
                StreamCategory::Calibration,
                StreamCategory::DetectorStatus,
                StreamCategory::Daq,
                StreamCategory::Physics,
                StreamCategory::Simulation,
            ],
            [],
        )
    }

    pub fn accepts(&self, stream: StreamCategory) -> bool {
        self.streams.contains(&stream)
    }
}

impl Default for StreamFilter {
    /// TrayInfo, DAQ, Physics and simulation frames; DAQ frames without physics are dropped
    fn default() -> Self {
        StreamFilter::new(
            [
                StreamCategory::TrayInfo,
                StreamCategory::Daq,
                StreamCategory::Physics,
                StreamCategory::Simulation,
            ],
            [StreamCategory::Daq],
        )
    }
}

/// JSON-lines event writer
pub struct EventWriter {
    path: PathBuf,
    out: BufWriter<File>,
    filter: StreamFilter,
    /// Orphan-droppable frame waiting for a physics event
    pending: Option<Event>,
    /// Frames that arrived after `pending`
    held: Vec<Event>,
    written: usize,
    orphans_dropped: usize,
}

impl EventWriter {
    /// Create (or truncate) the output file
    pub fn create(path: &Path, filter: StreamFilter) -> Result<Self, StreamError> {
        let file = File::create(path).map_err(|source| StreamError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(EventWriter {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            filter,
            pending: None,
            held: Vec::new(),
            written: 0,
            orphans_dropped: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue or write one event, subject to the filter
    pub fn write(&mut self, event: &Event) -> Result<(), StreamError> {
        if !self.filter.accepts(event.stream) {
            return Ok(());
        }

        if self.filter.drop_orphans.contains(&event.stream) {
            self.drop_pending();
            self.flush_held()?;
            self.pending = Some(event.clone());
            return Ok(());
        }

        if event.is_physics() {
            if let Some(parent) = self.pending.take() {
                self.emit(&parent)?;
            }
            self.flush_held()?;
            return self.emit(event);
        }

        if self.pending.is_some() {
            self.held.push(event.clone());
            Ok(())
        } else {
            self.emit(event)
        }
    }

    /// Flush the file; returns the number of events written
    pub fn finish(mut self) -> Result<usize, StreamError> {
        self.drop_pending();
        self.flush_held()?;
        self.out.flush().map_err(|source| StreamError::Io {
            path: self.path.clone(),
            source,
        })?;

        if self.orphans_dropped > 0 {
            log::debug!(
                "Dropped {} orphan frames from {}",
                self.orphans_dropped,
                self.path.display()
            );
        }
        Ok(self.written)
    }

    pub fn orphans_dropped(&self) -> usize {
        self.orphans_dropped
    }

    fn drop_pending(&mut self) {
        if self.pending.take().is_some() {
            self.orphans_dropped += 1;
        }
    }

    fn flush_held(&mut self) -> Result<(), StreamError> {
        let held = std::mem::take(&mut self.held);
        for event in &held {
            self.emit(event)?;
        }
        Ok(())
    }

    fn emit(&mut self, event: &Event) -> Result<(), StreamError> {
        let json = serde_json::to_string(event)?;
        writeln!(self.out, "{}", json).map_err(|source| StreamError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::read_events;
    use tempfile::TempDir;

    fn frame(event_id: u32, stream: StreamCategory) -> Event {
        Event::new(1, event_id, stream)
    }

    fn write_all(filter: StreamFilter, events: &[Event]) -> (Vec<Event>, usize) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.jsonl");

        let mut writer = EventWriter::create(&path, filter).unwrap();
        for event in events {
            writer.write(event).unwrap();
        }
        let count = writer.finish().unwrap();

        (read_events(&path).unwrap(), count)
    }

    #[test]
    fn test_filters_categories() {
        let events = vec![
            frame(0, StreamCategory::Geometry),
            frame(0, StreamCategory::TrayInfo),
            frame(1, StreamCategory::Physics),
        ];
        let (written, count) = write_all(StreamFilter::new([StreamCategory::Physics], []), &events);

        assert_eq!(count, 1);
        assert_eq!(written[0].stream, StreamCategory::Physics);
    }

    #[test]
    fn test_daq_kept_with_physics() {
        let events = vec![
            frame(1, StreamCategory::Daq),
            frame(1, StreamCategory::Physics),
            frame(1, StreamCategory::Physics),
        ];
        let (written, count) = write_all(StreamFilter::default(), &events);

        assert_eq!(count, 3);
        let streams: Vec<StreamCategory> = written.iter().map(|e| e.stream).collect();
        assert_eq!(
            streams,
            vec![
                StreamCategory::Daq,
                StreamCategory::Physics,
                StreamCategory::Physics
            ]
        );
    }

    #[test]
    fn test_orphan_daq_dropped() {
        let events = vec![
            frame(1, StreamCategory::Daq),
            frame(2, StreamCategory::Daq),
            frame(2, StreamCategory::Physics),
            frame(3, StreamCategory::Daq),
        ];

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out.jsonl");
        let mut writer = EventWriter::create(&path, StreamFilter::default()).unwrap();
        for event in &events {
            writer.write(event).unwrap();
        }
        assert_eq!(writer.orphans_dropped(), 1);
        let count = writer.finish().unwrap();

        let written = read_events(&path).unwrap();
        assert_eq!(count, 2);
        assert_eq!(written[0].event_id, 2);
        assert_eq!(written[0].stream, StreamCategory::Daq);
        assert_eq!(written[1].stream, StreamCategory::Physics);
    }

    #[test]
    fn test_order_preserved_around_pending_frame() {
        let events = vec![
            frame(1, StreamCategory::Daq),
            frame(1, StreamCategory::Simulation),
            frame(1, StreamCategory::Physics),
        ];
        let (written, _) = write_all(StreamFilter::default(), &events);

        let streams: Vec<StreamCategory> = written.iter().map(|e| e.stream).collect();
        assert_eq!(
            streams,
            vec![
                StreamCategory::Daq,
                StreamCategory::Simulation,
                StreamCategory::Physics
            ]
        );
    }

    #[test]
    fn test_held_frames_survive_orphan_drop() {
        let events = vec![
            frame(1, StreamCategory::Daq),
            frame(1, StreamCategory::Simulation),
        ];
        let (written, count) = write_all(StreamFilter::default(), &events);

        assert_eq!(count, 1);
        assert_eq!(written[0].stream, StreamCategory::Simulation);
    }

    #[test]
    fn test_all_filter_keeps_everything() {
        let events = vec![
            frame(0, StreamCategory::Geometry),
            frame(1, StreamCategory::Daq),
        ];
        let (_, count) = write_all(StreamFilter::all(), &events);
        assert_eq!(count, 2);
    }
}
