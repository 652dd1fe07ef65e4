//! Player aggregate statistics: a fold over parsed records.
//!
//! Everything here derives from script fields alone (win flags, per-seat
//! win data, pre-round Elo), so the fold never replays -- it is cheap
//! enough to run over a whole archive, in parallel per record.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use paipu_engine::analysis::extract_declared_fans;
use paipu_engine::script::ParsedRecord;

#[derive(Debug, Clone, Serialize)]
pub struct EloPoint {
    pub record_id: String,
    pub timestamp_ms: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FanSummary {
    pub name: String,
    pub points: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct WinEntry {
    pub record_id: String,
    pub timestamp_ms: i64,
    /// `"zimo"` or `"ron"`.
    pub win_type: String,
    pub total_fan: u32,
    /// The stored winning hand, verbatim from the record.
    pub hand: String,
    /// The headline fans: max points, or anything at 24+.
    pub max_fans: Vec<FanSummary>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerTotals {
    pub player_id: String,
    pub name: String,
    pub current_elo: f64,
    pub total_rounds: u32,
    pub win_count: u32,
    pub ron_win_count: u32,
    pub tsumo_win_count: u32,
    pub deal_in_count: u32,
    pub draw_count: u32,
    pub elo_history: Vec<EloPoint>,
    pub wins: Vec<WinEntry>,
}

/// One record to fold, already fetched from storage.
#[derive(Debug, Clone)]
pub struct RecordSource {
    pub id: String,
    pub timestamp_ms: i64,
    pub json: String,
}

/// Sequential fold keyed by player id. Deterministic output order.
#[derive(Debug, Default)]
pub struct PlayerStatsBuilder {
    players: BTreeMap<String, PlayerTotals>,
}

impl PlayerStatsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, record_id: &str, timestamp_ms: i64, record: &ParsedRecord) {
        let winners = record.script_winners();
        let discarder = record.script_discarder();
        let drawn_game = winners.is_empty();

        for (seat, entry) in record.players.iter().enumerate().take(4) {
            if entry.id.is_empty() {
                warn!(record_id, seat, "player entry with empty id, skipped");
                continue;
            }
            let totals = self
                .players
                .entry(entry.id.clone())
                .or_insert_with(|| PlayerTotals {
                    player_id: entry.id.clone(),
                    name: entry.name.clone(),
                    ..PlayerTotals::default()
                });
            totals.name = entry.name.clone();
            totals.total_rounds += 1;
            totals.current_elo = entry.elo;
            totals.elo_history.push(EloPoint {
                record_id: record_id.to_string(),
                timestamp_ms,
                value: entry.elo,
            });

            let seat = seat as u8;
            if drawn_game {
                totals.draw_count += 1;
            } else if winners.contains(&seat) {
                totals.win_count += 1;
                let self_drawn = discarder.map_or(true, |d| d == seat);
                if self_drawn {
                    totals.tsumo_win_count += 1;
                } else {
                    totals.ron_win_count += 1;
                }
                totals.wins.push(build_win_entry(
                    record_id,
                    timestamp_ms,
                    record,
                    seat,
                    self_drawn,
                ));
            } else if discarder == Some(seat) {
                totals.deal_in_count += 1;
            }
        }
    }

    pub fn finish(self) -> Vec<PlayerTotals> {
        self.players.into_values().collect()
    }
}

fn build_win_entry(
    record_id: &str,
    timestamp_ms: i64,
    record: &ParsedRecord,
    seat: u8,
    self_drawn: bool,
) -> WinEntry {
    let win_data = &record.win_data[seat as usize];
    let details = extract_declared_fans(win_data);
    let max_points = details.iter().map(|f| f.points).max().unwrap_or(0);
    let max_fans = details
        .iter()
        .filter(|f| f.points >= 24 || f.points == max_points)
        .map(|f| FanSummary {
            name: f.name.clone(),
            points: f.points,
            count: f.count,
        })
        .collect();

    WinEntry {
        record_id: record_id.to_string(),
        timestamp_ms,
        win_type: if self_drawn { "zimo" } else { "ron" }.to_string(),
        total_fan: win_data.total_fan,
        hand: win_data.hand.clone().unwrap_or_default(),
        max_fans,
    }
}

/// Parses record envelopes in parallel, then folds sequentially so the
/// output stays deterministic. Undecodable records are logged and skipped.
pub fn collect_stats(sources: &[RecordSource]) -> Vec<PlayerTotals> {
    let mut parsed: Vec<(usize, &RecordSource, ParsedRecord)> = sources
        .par_iter()
        .enumerate()
        .filter_map(|(idx, source)| match ParsedRecord::from_record_json(&source.json) {
            Ok(record) => Some((idx, source, record)),
            Err(e) => {
                warn!(id = source.id.as_str(), error = %e, "record skipped");
                None
            }
        })
        .collect();
    parsed.sort_by_key(|(idx, _, _)| *idx);

    let mut builder = PlayerStatsBuilder::new();
    for (_, source, record) in &parsed {
        builder.ingest(&source.id, source.timestamp_ms, record);
    }
    builder.finish()
}
