//! The replay driver.
//!
//! Folds a parsed record's action stream over a fresh [`GameState`]:
//! deal, per-step dispatch, step logging, observer publication, win
//! deduction, and the final win analysis. Replays are deterministic --
//! the same raw record always produces the same outputs.

use tracing::{debug, info, warn};

use crate::action::{self, ActionKind, RawAction};
use crate::analysis::{self, WinInfo};
use crate::errors::RecordResult;
use crate::format;
use crate::script::ParsedRecord;
use crate::state::event_handler::RecordEventHandler;
use crate::state::GameState;
use crate::types::{GameLog, StepLog};

/// One published step: the raw action plus what the driver derived from it.
#[derive(Debug, Clone, Copy)]
pub struct StepRecord<'a> {
    pub step: u32,
    pub action: &'a RawAction,
    /// Present on declared-win steps.
    pub win: Option<WinMarker>,
}

#[derive(Debug, Clone, Copy)]
pub struct WinMarker {
    pub declared_fan: u32,
    pub self_drawn: bool,
}

/// Read-only hook invoked after every applied action, in registration
/// order. Observers must not mutate the state.
pub trait ReplayObserver {
    fn on_step(&mut self, record: &ParsedRecord, step: &StepRecord<'_>, state: &GameState);
}

#[derive(Debug)]
pub struct ReplayOutcome {
    pub game_log: GameLog,
    pub final_state: GameState,
}

/// Replays one record at a time. Observers persist across records, so a
/// single replayer can fold statistics over a whole batch.
#[derive(Default)]
pub struct RecordReplayer {
    observers: Vec<Box<dyn ReplayObserver>>,
    state: GameState,
}

impl RecordReplayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_observer(&mut self, observer: Box<dyn ReplayObserver>) {
        self.observers.push(observer);
    }

    pub fn observers(&self) -> &[Box<dyn ReplayObserver>] {
        &self.observers
    }

    /// Full pipeline from the raw record JSON.
    pub fn replay_json(&mut self, record_json: &str) -> RecordResult<ReplayOutcome> {
        let record = ParsedRecord::from_record_json(record_json)?;
        Ok(self.replay(&record))
    }

    /// Replays an already-parsed record.
    pub fn replay(&mut self, record: &ParsedRecord) -> ReplayOutcome {
        self.state.reset();
        self.state
            .setup_wall_and_deal(&record.wall, record.dice, 0);
        info!(
            title = record.title.as_str(),
            actions = record.actions.len(),
            "replay started"
        );

        let mut game_log = GameLog {
            title: record.title.clone(),
            player_names: (0..4).map(|s| record.player_name(s)).collect(),
            dealer: self.state.dealer,
            steps: Vec::with_capacity(record.actions.len()),
            win_analysis: None,
        };

        let mut captured_win: Option<WinInfo> = None;
        let mut prev_time = 0u64;

        for (idx, raw) in record.actions.iter().enumerate() {
            let step_number = idx as u32 + 1;
            let description = action::describe(raw, self.state.last_discard_tile());

            self.state.apply_action(raw);
            self.advance_wall(raw);

            let win_marker = self.deduce_win(record, idx, &mut captured_win);
            game_log.steps.push(self.build_step_log(
                record,
                step_number,
                raw,
                description,
                prev_time,
            ));

            let step = StepRecord {
                step: step_number,
                action: raw,
                win: win_marker,
            };
            for observer in &mut self.observers {
                observer.on_step(record, &step, &self.state);
            }

            prev_time = raw.time_ms;
        }

        if captured_win.is_none() {
            captured_win = self.win_from_script(record);
        }
        game_log.win_analysis =
            captured_win.map(|win| analysis::analyze_win(&self.state, record, &win));

        ReplayOutcome {
            game_log,
            final_state: self.state.clone(),
        }
    }

    /// The processor owns tile movement; the driver owns the pointers.
    fn advance_wall(&mut self, raw: &RawAction) {
        match raw.action_kind() {
            Some(ActionKind::FlowerReplace) => self.state.wall.advance_back(),
            Some(ActionKind::Draw) => {
                let from_back = action::decode_draw(raw.data).map_or(false, |d| d.from_back);
                if from_back {
                    self.state.wall.advance_back();
                } else {
                    self.state.wall.advance_front();
                }
            }
            _ => {}
        }
    }

    /// Handles a declared win: deduces self-drawn status, cross-checks the
    /// script flags, and captures the first valid winner.
    fn deduce_win(
        &mut self,
        record: &ParsedRecord,
        idx: usize,
        captured: &mut Option<WinInfo>,
    ) -> Option<WinMarker> {
        let raw = &record.actions[idx];
        if raw.action_kind() != Some(ActionKind::DeclareWin) {
            return None;
        }
        let decode = action::decode_win(raw.data);
        let winner = raw.seat;

        let mut self_drawn = deduce_self_drawn(&record.actions, idx, winner);

        // Cross-check against the script's win flags; the script wins.
        if record.win_flags != 0 && record.script_winners().contains(&winner) {
            let discarder = record.script_discarder();
            let script_self_drawn = discarder.map_or(true, |d| d == winner);
            if script_self_drawn != self_drawn {
                warn!(
                    winner,
                    deduced = self_drawn,
                    script = script_self_drawn,
                    "self-drawn deduction disagrees with win flags"
                );
                self_drawn = script_self_drawn;
            }
        }

        if decode.declared_fan == 0 {
            debug!(winner, "zero-fan declaration (wrong win), replay continues");
            return Some(WinMarker {
                declared_fan: 0,
                self_drawn,
            });
        }

        if captured.is_none() {
            let tile = if self_drawn {
                self.state.seat(winner as usize).last_draw
            } else {
                self.state.last_discard_tile()
            };
            match tile {
                Some(tile) => {
                    *captured = Some(WinInfo {
                        seat: winner,
                        tile,
                        self_drawn,
                    });
                }
                None => warn!(winner, self_drawn, "cannot determine win tile"),
            }
        }

        Some(WinMarker {
            declared_fan: decode.declared_fan,
            self_drawn,
        })
    }

    /// Drawn games carry no kind-6 action; the script's win flags are the
    /// fallback source of the winner.
    fn win_from_script(&self, record: &ParsedRecord) -> Option<WinInfo> {
        let winner = *record.script_winners().first()?;
        let discarder = record.script_discarder();
        let self_drawn = discarder.map_or(true, |d| d == winner);
        record.win_data[winner as usize].hand.as_ref()?;

        let tile = if self_drawn {
            self.state.seat(winner as usize).last_draw
        } else {
            self.state.last_discard_tile()
        }?;
        Some(WinInfo {
            seat: winner,
            tile,
            self_drawn,
        })
    }

    fn build_step_log(
        &self,
        record: &ParsedRecord,
        step_number: u32,
        raw: &RawAction,
        description: String,
        prev_time: u64,
    ) -> StepLog {
        let seat = raw.seat as usize & 3;
        let seat_state = self.state.seat(seat);
        StepLog {
            step_number,
            seat: raw.seat,
            name: record.player_name(seat),
            wind: analysis::seat_wind(raw.seat, self.state.dealer)
                .glyph()
                .to_string(),
            action_kind: raw.kind,
            description,
            elapsed_ms: raw.time_ms.saturating_sub(prev_time),
            hand_tiles: seat_state.hand.iter().map(|t| t.label().to_string()).collect(),
            pack_tiles: seat_state.melds.iter().map(format::pack_form).collect(),
            discard_tiles: seat_state
                .discards
                .iter()
                .map(|t| t.label().to_string())
                .collect(),
        }
    }
}

/// Scans backward past pass/abandon steps; a draw (wall or flower
/// replacement) by the winner right before the declaration marks a
/// self-drawn win.
fn deduce_self_drawn(actions: &[RawAction], win_idx: usize, winner: u8) -> bool {
    for prev in actions[..win_idx].iter().rev() {
        match prev.action_kind() {
            Some(ActionKind::Pass) | Some(ActionKind::Abandon) => continue,
            Some(ActionKind::Draw) | Some(ActionKind::FlowerReplace) => {
                return prev.seat == winner;
            }
            _ => return false,
        }
    }
    false
}
