//! The captured-session format: an ordered list of timestamped frames, each
//! mapping target names to raw rotation components.
//!
//! Sessions serialize as [ron] text. Rust formats floats as the shortest
//! string that parses back to the same value, so a save/load cycle yields a
//! bitwise-identical sequence of frames. A file looks like:
//!
//! ```text
//! (frames:[(timestamp_ms:0,poses:{"Head":(1.0,0.0,0.0,0.0)}), ...])
//! ```

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// One timestamped snapshot of every captured target's rotation, components
/// in wire order `[w, x, y, z]`. Immutable once appended to a recording.
///
/// The map is a `BTreeMap` so frames compare and iterate deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    timestamp_ms: u64,
    poses: BTreeMap<String, [f32; 4]>,
}

impl RecordedFrame {
    /// Builds a frame from a capture timestamp (milliseconds since the
    /// recording started) and per-target components.
    pub fn new(timestamp_ms: u64, poses: BTreeMap<String, [f32; 4]>) -> Self {
        RecordedFrame {
            timestamp_ms,
            poses,
        }
    }

    /// Milliseconds since the recording's start, from a monotonic clock.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// The per-target rotation components captured in this frame.
    pub fn poses(&self) -> &BTreeMap<String, [f32; 4]> {
        &self.poses
    }
}

/// Everything that can go wrong reading or writing a session file.
#[derive(Debug)]
pub enum SessionError {
    /// Io failed while reading or writing.
    IoError(std::io::Error),
    /// Serialization failed.
    RonError(ron::Error),
    /// The file was not valid session text.
    RonSpannedError(ron::de::SpannedError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use SessionError as SE;
        let msg = match self {
            SE::IoError(error) => Cow::from(format!("io error: {}", error)),
            SE::RonError(error) => Cow::from(format!("ron error: {}", error)),
            SE::RonSpannedError(error) => Cow::from(format!("ron spanning error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for SessionError {}

/// An ordered, append-only capture session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    frames: Vec<RecordedFrame>,
}

impl Recording {
    /// Wraps an already-ordered list of frames.
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Recording { frames }
    }

    /// The frames, in capture order.
    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// True when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Writes the session to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let mut handle = File::create(path).map_err(SessionError::IoError)?;
        self.to_writer(&mut handle)
    }

    /// Writes the session to the [Write]able object provided.
    pub fn to_writer(&self, writer: &mut impl Write) -> Result<(), SessionError> {
        let text = ron::ser::to_string(self).map_err(SessionError::RonError)?;
        writer
            .write_all(text.as_bytes())
            .map_err(SessionError::IoError)
    }

    /// Reads a session from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let mut handle = File::open(path).map_err(SessionError::IoError)?;
        Self::from_reader(&mut handle)
    }

    /// Reads a session from the [Read]able object provided.
    pub fn from_reader(reader: &mut impl Read) -> Result<Self, SessionError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(SessionError::IoError)?;
        ron::de::from_str(&text).map_err(SessionError::RonSpannedError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pose(target: &str, components: [f32; 4]) -> BTreeMap<String, [f32; 4]> {
        let mut poses = BTreeMap::new();
        poses.insert(target.to_owned(), components);
        poses
    }

    fn three_frame_session() -> Recording {
        let mut both = pose("Head", [0.996_194_7, 0.087_155_74, 0.0, 0.0]);
        both.insert("LeftArm".to_owned(), [0.7, 0.0, 0.7, 0.0]);
        Recording::new(vec![
            RecordedFrame::new(0, pose("Head", [1.0, 0.0, 0.0, 0.0])),
            RecordedFrame::new(33, both),
            RecordedFrame::new(66, pose("LeftArm", [0.5, 0.5, 0.5, 0.5])),
        ])
    }

    #[test]
    fn write_and_read_cursor() {
        let session = three_frame_session();
        let mut buf = Cursor::new(Vec::new());

        session.to_writer(&mut buf).unwrap();
        buf.set_position(0);
        let read_back = Recording::from_reader(&mut buf).unwrap();

        assert_eq!(session, read_back);
    }

    #[test]
    fn write_and_read_path() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        let path = tempfile.path();
        let session = three_frame_session();

        session.to_path(path).unwrap();
        let read_back = Recording::from_path(path).unwrap();

        assert_eq!(session, read_back);
    }

    #[test]
    fn frame_order_and_timestamps_survive() {
        let session = three_frame_session();
        let mut buf = Cursor::new(Vec::new());
        session.to_writer(&mut buf).unwrap();
        buf.set_position(0);
        let read_back = Recording::from_reader(&mut buf).unwrap();

        let stamps: Vec<u64> = read_back.frames().iter().map(|f| f.timestamp_ms()).collect();
        assert_eq!(stamps, vec![0, 33, 66]);
        assert_eq!(
            read_back.frames()[1].poses().keys().collect::<Vec<_>>(),
            vec!["Head", "LeftArm"]
        );
    }

    #[test]
    fn garbage_input_is_a_parse_error() {
        let mut buf = Cursor::new(b"RIFF not a session".to_vec());
        assert!(matches!(
            Recording::from_reader(&mut buf),
            Err(SessionError::RonSpannedError(_))
        ));
    }

    #[test]
    fn empty_session_round_trips() {
        let session = Recording::default();
        let mut buf = Cursor::new(Vec::new());
        session.to_writer(&mut buf).unwrap();
        buf.set_position(0);
        assert_eq!(Recording::from_reader(&mut buf).unwrap(), session);
    }
}
