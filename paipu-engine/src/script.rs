//! Record envelope and script parsing.
//!
//! A raw record is a JSON object whose `script` field holds the
//! base64-encoded, zlib-deflated script JSON. The script carries the wall
//! (`w`, 288 hex chars), the packed dice (`d`), the players (`p`), the
//! action stream (`a`), and the optional win flags (`b`), per-seat win data
//! (`y`), round info (`i`) and table metadata (`g`). Missing `b`/`y`
//! degrade to drawn-game semantics; missing `w`/`d`/`a` are parse errors.

use std::collections::BTreeMap;
use std::io::Read;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use flate2::read::ZlibDecoder;
use serde::Deserialize;

use crate::action::RawAction;
use crate::errors::{RecordError, RecordResult};
use crate::tile::{Tile, WALL_LEN};
use crate::types::Wind;

// ---------------------------------------------------------------------------
// Raw serde views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub script: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Session the record belongs to.
    #[serde(default)]
    pub belongs: Option<String>,
    #[serde(default, rename = "t")]
    pub timestamp_ms: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerEntry {
    #[serde(default, rename = "i")]
    pub id: String,
    #[serde(default, rename = "n")]
    pub name: String,
    /// Pre-round Elo.
    #[serde(default, rename = "e")]
    pub elo: f64,
}

/// Per-seat win data. The fan map keys are declared fan ids; each value
/// packs the point value in the low byte and `count - 1` in the next.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeatWinData {
    #[serde(default, rename = "f")]
    pub total_fan: u32,
    #[serde(default, rename = "t")]
    pub fan_map: BTreeMap<String, u32>,
    #[serde(default, rename = "h")]
    pub hand: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameMeta {
    #[serde(default, rename = "t")]
    pub title: String,
}

/// The decoded script as found in the record, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawScript {
    #[serde(default)]
    pub w: Option<String>,
    #[serde(default)]
    pub d: Option<u32>,
    #[serde(default)]
    pub p: Vec<PlayerEntry>,
    #[serde(default)]
    pub a: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub b: Option<u32>,
    #[serde(default)]
    pub y: Vec<SeatWinData>,
    #[serde(default)]
    pub i: Option<u32>,
    #[serde(default)]
    pub g: Option<GameMeta>,
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// Decodes the record envelope: JSON -> base64 -> zlib inflate -> script JSON.
pub fn decode_envelope(record_json: &str) -> RecordResult<RawScript> {
    let record: RawRecord =
        serde_json::from_str(record_json).map_err(|e| RecordError::Envelope {
            message: format!("record is not a valid record object: {}", e),
        })?;
    decode_script(&record.script)
}

/// Decodes just the `script` payload of a record.
pub fn decode_script(encoded: &str) -> RecordResult<RawScript> {
    let compressed = BASE64
        .decode(encoded.trim())
        .map_err(|e| RecordError::Envelope {
            message: format!("script is not valid base64: {}", e),
        })?;

    let mut inflated = Vec::with_capacity(compressed.len() * 4);
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| RecordError::Envelope {
            message: format!("script payload failed to inflate: {}", e),
        })?;

    serde_json::from_slice(&inflated).map_err(|e| RecordError::Envelope {
        message: format!("inflated script is not valid JSON: {}", e),
    })
}

// ---------------------------------------------------------------------------
// Validated record
// ---------------------------------------------------------------------------

/// A record with its required fields decoded into typed form.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    /// The shuffled 144-tile buffer, before the dice rotation.
    pub wall: Vec<Tile>,
    /// The four dice, low nibble first.
    pub dice: [u8; 4],
    pub players: Vec<PlayerEntry>,
    pub actions: Vec<RawAction>,
    /// Winner bitmap in the low 4 bits, discarder bitmap in bits 4-7.
    /// Zero when the script carries no `b` field.
    pub win_flags: u32,
    /// Always padded to four entries.
    pub win_data: Vec<SeatWinData>,
    pub round_info: u32,
    pub title: String,
}

impl ParsedRecord {
    /// Full pipeline: envelope decode then script validation.
    pub fn from_record_json(record_json: &str) -> RecordResult<Self> {
        Self::from_script(decode_envelope(record_json)?)
    }

    pub fn from_script(script: RawScript) -> RecordResult<Self> {
        let wall_hex = script.w.ok_or(RecordError::Parse {
            field: "w",
            message: "wall field missing".into(),
        })?;
        let wall = parse_wall_hex(&wall_hex)?;

        let dice_packed = script.d.ok_or(RecordError::Parse {
            field: "d",
            message: "dice field missing".into(),
        })?;
        let dice = [
            (dice_packed & 15) as u8,
            ((dice_packed >> 4) & 15) as u8,
            ((dice_packed >> 8) & 15) as u8,
            ((dice_packed >> 12) & 15) as u8,
        ];

        let raw_actions = script.a.ok_or(RecordError::Parse {
            field: "a",
            message: "action stream missing".into(),
        })?;
        let actions = parse_actions(&raw_actions);

        let mut win_data = script.y;
        win_data.resize_with(4, SeatWinData::default);

        Ok(ParsedRecord {
            wall,
            dice,
            players: script.p,
            actions,
            win_flags: script.b.unwrap_or(0),
            win_data,
            round_info: script.i.unwrap_or(0),
            title: script.g.map(|g| g.title).unwrap_or_default(),
        })
    }

    /// The round wind is the quotient of the round-info field by 4, mod 4,
    /// and is stable for the whole replay.
    pub fn round_wind(&self) -> Wind {
        Wind::from(((self.round_info / 4) % 4) as u8)
    }

    pub fn player_name(&self, seat: usize) -> String {
        self.players
            .get(seat)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("P{}", seat))
    }

    /// Winner seats from the win-flags bitmap, lowest seat first.
    pub fn script_winners(&self) -> Vec<u8> {
        (0..4u8)
            .filter(|s| self.win_flags & (1 << s) != 0)
            .collect()
    }

    /// Discarder seat from the win-flags bitmap, if one is marked.
    pub fn script_discarder(&self) -> Option<u8> {
        (0..4u8).find(|s| self.win_flags & (1 << (s + 4)) != 0)
    }
}

fn parse_wall_hex(wall_hex: &str) -> RecordResult<Vec<Tile>> {
    if wall_hex.len() != WALL_LEN * 2 {
        return Err(RecordError::Parse {
            field: "w",
            message: format!("expected {} hex chars, got {}", WALL_LEN * 2, wall_hex.len()),
        });
    }
    let mut wall = Vec::with_capacity(WALL_LEN);
    for i in (0..wall_hex.len()).step_by(2) {
        let byte = u8::from_str_radix(&wall_hex[i..i + 2], 16).map_err(|e| RecordError::Parse {
            field: "w",
            message: format!("bad hex pair at offset {}: {}", i, e),
        })?;
        let tile = Tile::new(byte).ok_or(RecordError::Parse {
            field: "w",
            message: format!("tile index {} out of range at offset {}", byte, i),
        })?;
        wall.push(tile);
    }
    Ok(wall)
}

/// Each action entry is a 3+ element integer array; the first packs the
/// seat in the high nibble and the kind in the low one. Short or non-array
/// entries are skipped, matching the platform's own tolerance.
fn parse_actions(entries: &[serde_json::Value]) -> Vec<RawAction> {
    let mut actions = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(items) = entry.as_array() else {
            continue;
        };
        if items.len() < 3 {
            continue;
        }
        let (Some(combined), Some(data), Some(time)) =
            (items[0].as_i64(), items[1].as_i64(), items[2].as_i64())
        else {
            continue;
        };
        actions.push(RawAction {
            seat: ((combined >> 4) & 3) as u8,
            kind: (combined & 15) as u8,
            data: data as u32,
            time_ms: time.max(0) as u64,
        });
    }
    actions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
