//! Replay recording, playback and persistence
//!
//! A replay is the ordered list of spawned piece ids plus every input press
//! stamped with the tick it happened on. Together with the engine's fixed
//! tick duration this is enough to reproduce a run exactly.
//!
//! Binary layout (little-endian, stored gzip-compressed):
//!
//! ```text
//! u16            number of piece choices (N)
//! u8 * N         piece ids
//! (u32, u8) ...  tick stamp and input code, repeated to end of stream
//! ```

use crate::error::{Result, TetrisError};
use crate::input::{InputIntent, InputKind};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Size of one encoded input record: u32 tick + u8 code
const INPUT_RECORD_LEN: usize = 5;

/// Replay speeds offered to players; negative values slow playback down
pub const SPEED_PRESETS: [i32; 9] = [8, 6, 4, 2, 1, -2, -4, -6, -8];

/// One recorded input press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    pub tick: u32,
    pub kind: InputKind,
}

/// On-disk encoding of a replay file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplayFormat {
    /// Gzip-compressed binary records
    #[default]
    Binary,
    /// Uncompressed line-oriented text
    Text,
}

impl ReplayFormat {
    /// `.txt` files are text, anything else is binary
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("txt") => ReplayFormat::Text,
            _ => ReplayFormat::Binary,
        }
    }
}

/// The recorded content of one session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplayRecord {
    pub pieces: Vec<u8>,
    pub inputs: Vec<InputEvent>,
}

impl ReplayRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty() && self.inputs.is_empty()
    }

    /// Uncompressed binary stream
    pub fn encode_raw(&self) -> Result<Vec<u8>> {
        let count = u16::try_from(self.pieces.len()).map_err(|_| {
            TetrisError::CorruptReplay(format!(
                "{} piece choices do not fit the u16 header",
                self.pieces.len()
            ))
        })?;

        let mut out = Vec::with_capacity(2 + self.pieces.len() + self.inputs.len() * INPUT_RECORD_LEN);
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&self.pieces);
        for event in &self.inputs {
            out.extend_from_slice(&event.tick.to_le_bytes());
            out.push(event.kind.code());
        }
        Ok(out)
    }

    /// Parse an uncompressed binary stream
    pub fn decode_raw(bytes: &[u8]) -> Result<Self> {
        let Some((header, rest)) = bytes.split_first_chunk::<2>() else {
            return Err(TetrisError::CorruptReplay("missing piece count".into()));
        };
        let count = u16::from_le_bytes(*header) as usize;
        if rest.len() < count {
            return Err(TetrisError::CorruptReplay(format!(
                "expected {} piece choices, found {} bytes",
                count,
                rest.len()
            )));
        }
        let (pieces, records) = rest.split_at(count);
        if records.len() % INPUT_RECORD_LEN != 0 {
            return Err(TetrisError::CorruptReplay(format!(
                "{} trailing bytes do not form whole input records",
                records.len() % INPUT_RECORD_LEN
            )));
        }

        let inputs = records
            .chunks_exact(INPUT_RECORD_LEN)
            .map(|chunk| {
                let tick = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                Ok(InputEvent {
                    tick,
                    kind: InputKind::from_code(chunk[4])?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            pieces: pieces.to_vec(),
            inputs,
        })
    }

    /// Gzip-compressed binary encoding
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let raw = self.encode_raw()?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        Ok(encoder.finish()?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut raw = Vec::new();
        GzDecoder::new(bytes)
            .read_to_end(&mut raw)
            .map_err(|e| TetrisError::CorruptReplay(format!("decompression failed: {}", e)))?;
        Self::decode_raw(&raw)
    }

    /// Line-oriented text encoding: count, one id per line, then tick/name
    /// line pairs
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.pieces.len());
        for id in &self.pieces {
            let _ = writeln!(out, "{}", id);
        }
        for event in &self.inputs {
            let _ = writeln!(out, "{}", event.tick);
            let _ = writeln!(out, "{}", event.kind.name());
        }
        out
    }

    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

        let count: usize = parse_line(lines.next(), "piece count")?;
        let pieces = (0..count)
            .map(|_| parse_line::<u8>(lines.next(), "piece id"))
            .collect::<Result<Vec<_>>>()?;

        let mut inputs = Vec::new();
        while let Some(tick_line) = lines.next() {
            let tick = parse_line(Some(tick_line), "tick")?;
            let name = lines
                .next()
                .ok_or_else(|| TetrisError::CorruptReplay(format!("tick {} has no action", tick)))?;
            inputs.push(InputEvent {
                tick,
                kind: InputKind::from_name(name)?,
            });
        }

        Ok(Self { pieces, inputs })
    }

    pub fn save(&self, path: &Path, format: ReplayFormat) -> Result<()> {
        let bytes = match format {
            ReplayFormat::Binary => self.to_bytes()?,
            ReplayFormat::Text => self.to_text().into_bytes(),
        };
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, bytes)?;
        info!(
            "Saved replay to {} ({} pieces, {} inputs)",
            path.display(),
            self.pieces.len(),
            self.inputs.len()
        );
        Ok(())
    }

    pub fn load(path: &Path, format: ReplayFormat) -> Result<Self> {
        let bytes = fs::read(path)?;
        let record = match format {
            ReplayFormat::Binary => Self::from_bytes(&bytes)?,
            ReplayFormat::Text => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| TetrisError::CorruptReplay("text replay is not UTF-8".into()))?;
                Self::from_text(&text)?
            }
        };
        info!(
            "Loaded replay {} ({} pieces, {} inputs)",
            path.display(),
            record.pieces.len(),
            record.inputs.len()
        );
        Ok(record)
    }
}

fn parse_line<T: std::str::FromStr>(line: Option<&str>, what: &str) -> Result<T> {
    let line = line.ok_or_else(|| TetrisError::CorruptReplay(format!("missing {}", what)))?;
    line.parse()
        .map_err(|_| TetrisError::CorruptReplay(format!("bad {}: {:?}", what, line)))
}

/// Live tick at which an event recorded at `tick` is replayed.
///
/// Positive speeds divide (faster, rounding down), negative speeds multiply
/// (slower). Zero behaves like 1.
pub fn scaled_tick(tick: u32, speed: i32) -> u64 {
    let tick = tick as u64;
    match speed {
        0 => tick,
        s if s > 0 => tick / s as u64,
        s => tick * s.unsigned_abs() as u64,
    }
}

/// What a [`Replay`] is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayMode {
    #[default]
    Idle,
    Recording,
    Playback,
}

/// Records a session, or feeds a recorded one back to the engine
#[derive(Debug, Clone)]
pub struct Replay {
    record: ReplayRecord,
    mode: ReplayMode,
    piece_cursor: usize,
    input_cursor: usize,
    speed: i32,
    finished: bool,
}

impl Default for Replay {
    fn default() -> Self {
        Self::new()
    }
}

impl Replay {
    pub fn new() -> Self {
        Self {
            record: ReplayRecord::new(),
            mode: ReplayMode::Idle,
            piece_cursor: 0,
            input_cursor: 0,
            speed: 1,
            finished: false,
        }
    }

    pub fn mode(&self) -> ReplayMode {
        self.mode
    }

    pub fn record(&self) -> &ReplayRecord {
        &self.record
    }

    /// Discard any record and start appending a new one
    pub fn start_recording(&mut self) {
        self.record = ReplayRecord::new();
        self.mode = ReplayMode::Recording;
        self.rewind();
    }

    /// Play `record` back from the start
    pub fn start_playback(&mut self, record: ReplayRecord) {
        self.record = record;
        self.mode = ReplayMode::Playback;
        self.rewind();
    }

    /// Stop recording or playing; the record is kept
    pub fn stop(&mut self) {
        self.mode = ReplayMode::Idle;
    }

    /// Move both cursors back to the start and clear the finished flag
    pub fn rewind(&mut self) {
        self.piece_cursor = 0;
        self.input_cursor = 0;
        self.finished = false;
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Change the playback speed; 0 is treated as 1
    pub fn set_speed(&mut self, speed: i32) {
        self.speed = if speed == 0 { 1 } else { speed };
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn record_piece_choice(&mut self, id: u8) {
        if self.mode == ReplayMode::Recording {
            self.record.pieces.push(id);
        }
    }

    pub fn record_input(&mut self, tick: u64, kind: InputKind) {
        if self.mode != ReplayMode::Recording {
            return;
        }
        match u32::try_from(tick) {
            Ok(tick) => self.record.inputs.push(InputEvent { tick, kind }),
            Err(_) => {
                warn!("Tick {} does not fit a replay stamp, recording stopped", tick);
                self.mode = ReplayMode::Idle;
            }
        }
    }

    pub fn remaining_piece_choices(&self) -> usize {
        self.record.pieces.len().saturating_sub(self.piece_cursor)
    }

    pub fn next_piece_choice(&mut self) -> Result<u8> {
        let id = self
            .record
            .pieces
            .get(self.piece_cursor)
            .copied()
            .ok_or(TetrisError::ReplayExhausted {
                cursor: self.piece_cursor,
                len: self.record.pieces.len(),
            })?;
        self.piece_cursor += 1;
        Ok(id)
    }

    /// Inputs due at live tick `tick`, merged into one intent.
    ///
    /// Yields `None` while the next event is still in the future. Once every
    /// event has been handed out, the following poll raises the finished
    /// flag and rewinds the input cursor.
    pub fn poll_input(&mut self, tick: u64) -> Option<InputIntent> {
        let inputs = &self.record.inputs;
        if self.input_cursor >= inputs.len() {
            debug!("Replay finished after {} inputs", inputs.len());
            self.input_cursor = 0;
            self.finished = true;
            return None;
        }

        let mut intent: Option<InputIntent> = None;
        while let Some(event) = inputs.get(self.input_cursor) {
            if tick < scaled_tick(event.tick, self.speed) {
                break;
            }
            intent.get_or_insert_with(InputIntent::default).apply(event.kind);
            self.input_cursor += 1;
        }
        intent
    }
}
