// Event stream reader
// Reads one JSON event per line, skipping blank lines

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use crate::events::Event;
use crate::stream::StreamError;

/// Iterator over the events of a JSON-lines file
pub struct EventReader {
    path: PathBuf,
    lines: Lines<BufReader<File>>,
    line: usize,
}

impl EventReader {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let file = File::open(path).map_err(|source| StreamError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(EventReader {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for EventReader {
    type Item = Result<Event, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line += 1;

            let line = match line {
                Ok(line) => line,
                Err(source) => {
                    return Some(Err(StreamError::Io {
                        path: self.path.clone(),
                        source,
                    }))
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            return Some(serde_json::from_str(&line).map_err(|source| {
                StreamError::Malformed {
                    path: self.path.clone(),
                    line: self.line,
                    source,
                }
            }));
        }
    }
}

/// Read every event of a file
pub fn read_events(path: &Path) -> Result<Vec<Event>, StreamError> {
    EventReader::open(path)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StreamCategory;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_read_events_skips_blank_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        fs::write(
            &path,
            concat!(
                "{\"run_id\": 1, \"event_id\": 1, \"stream\": \"DAQ\"}\n",
                "\n",
                "{\"run_id\": 1, \"event_id\": 1, \"stream\": \"Physics\", \"pulse_series\": {\"SRTHVInIcePulses\": [",
                "{\"string\": 5, \"position\": 1, \"pulses\": [{\"charge\": 3.0, \"time\": 10.0}]}]}}\n",
            ),
        )
        .unwrap();

        let events = read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].stream, StreamCategory::Daq);
        assert_eq!(
            events[1].pulses("SRTHVInIcePulses").unwrap().pulse_count(),
            1
        );
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("events.jsonl");
        fs::write(
            &path,
            "{\"run_id\": 1, \"event_id\": 1, \"stream\": \"DAQ\"}\n{\"run_id\": \n",
        )
        .unwrap();

        match read_events(&path) {
            Err(StreamError::Malformed { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = EventReader::open(&temp_dir.path().join("absent.jsonl"));
        assert!(matches!(result, Err(StreamError::Io { .. })));
    }
}
