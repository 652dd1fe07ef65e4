//! The intercept detector.
//!
//! Registered as a replay observer; on every valid claim win it probes the
//! three non-discarder seats in turn order from the discarder's right,
//! scoring each seat's hypothetical hand against the claimed tile. Two or
//! more eligible seats make the event an intercept: the actual winner
//! claimed priority over an upstream seat that could also have declared.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;
use tracing::{debug, warn};

use paipu_engine::action::ActionKind;
use paipu_engine::analysis;
use paipu_engine::fan;
use paipu_engine::format;
use paipu_engine::replay::{ReplayObserver, StepRecord};
use paipu_engine::script::ParsedRecord;
use paipu_engine::state::GameState;
use paipu_engine::tile::Tile;
use paipu_engine::types::Wind;

/// The platform's minimum declarable fan.
pub const MIN_WIN_FAN: u32 = 8;

#[derive(Debug, Clone, Serialize)]
pub struct InterceptEvent {
    pub record_id: String,
    pub step: u32,
    pub discarder: u8,
    pub discard_tile: Tile,
    /// First eligible seat in priority order -- the seat the win belongs
    /// to under claim priority.
    pub winner: Option<u8>,
    /// Eligible seats in scan order (discarder + 1 first).
    pub potential_winners: Vec<u8>,
    pub potential_fans: Vec<u32>,
    pub is_intercept: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct InterceptSummary {
    pub total_ron_wins: u32,
    pub intercept_count: u32,
    pub intercept_rate: f64,
    pub events: Vec<InterceptEvent>,
}

/// Accumulates intercept events across records.
#[derive(Debug, Default)]
pub struct InterceptStats {
    record_id: String,
    events: Vec<InterceptEvent>,
}

impl InterceptStats {
    pub fn set_record_id(&mut self, record_id: impl Into<String>) {
        self.record_id = record_id.into();
    }

    pub fn push(&mut self, event: InterceptEvent) {
        self.events.push(event);
    }

    pub fn reset(&mut self) {
        self.events.clear();
        self.record_id.clear();
    }

    pub fn events(&self) -> &[InterceptEvent] {
        &self.events
    }

    /// Events with at least one eligible seat count as claim wins; two or
    /// more make an intercept.
    pub fn summary(&self) -> InterceptSummary {
        let total_ron_wins = self
            .events
            .iter()
            .filter(|e| !e.potential_winners.is_empty())
            .count() as u32;
        let intercept_count = self.events.iter().filter(|e| e.is_intercept).count() as u32;
        let intercept_rate = if total_ron_wins > 0 {
            intercept_count as f64 / total_ron_wins as f64
        } else {
            0.0
        };
        InterceptSummary {
            total_ron_wins,
            intercept_count,
            intercept_rate,
            events: self.events.clone(),
        }
    }
}

/// Probes all three non-discarder seats against the discarded tile.
pub fn check_intercept(
    state: &GameState,
    discarder: u8,
    discard_tile: Tile,
    round_wind: Wind,
    step: u32,
    record_id: &str,
) -> InterceptEvent {
    let mut event = InterceptEvent {
        record_id: record_id.to_string(),
        step,
        discarder,
        discard_tile,
        winner: None,
        potential_winners: Vec::new(),
        potential_fans: Vec::new(),
        is_intercept: false,
    };

    for offset in 1..=3u8 {
        let seat = (discarder + offset) % 4;
        let fan = hypothetical_claim_fan(state, seat, discard_tile, round_wind);
        if fan >= MIN_WIN_FAN {
            debug!(seat, fan, step, "seat could declare on the discard");
            if event.winner.is_none() {
                event.winner = Some(seat);
            }
            event.potential_winners.push(seat);
            event.potential_fans.push(fan);
        }
    }

    if event.potential_winners.len() > 1 {
        event.is_intercept = true;
    } else if event.potential_winners.is_empty() {
        warn!(
            record_id,
            step,
            discarder,
            tile = discard_tile.label(),
            "claim win declared but no seat scores the minimum"
        );
    }
    event
}

/// Fan total `seat` could declare by claiming `tile`, per the scoring
/// backend. Zero when the hand does not win.
pub fn hypothetical_claim_fan(
    state: &GameState,
    seat: u8,
    tile: Tile,
    round_wind: Wind,
) -> u32 {
    let seat_state = state.seat(seat as usize);
    let seat_wind = analysis::seat_wind(seat, state.dealer);

    // Claim-path environment: the tile never enters the hand.
    let mut hand = seat_state.hand.clone();
    if let Some(pos) = hand.iter().position(|&t| t == tile) {
        hand.remove(pos);
    }

    let input = format::scoring_string(
        &hand,
        &seat_state.melds,
        tile,
        round_wind,
        seat_wind,
        false,
        analysis::is_last_copy(state, tile, false),
        analysis::is_sea_bottom(state),
        analysis::is_robbing_kong(state, false),
        0,
        &[],
    );

    match fan::score_hand(&input) {
        Ok(Some(tally)) => tally.total,
        Ok(None) => 0,
        Err(e) => {
            warn!(seat, error = %e, "hypothetical hand failed to parse");
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Observer wiring
// ---------------------------------------------------------------------------

/// Shared-handle observer. The replay driver owns the boxed probe; the
/// caller keeps a clone of the handle to read the accumulated stats after
/// the fold. Single-threaded by design -- each worker owns its own probe.
#[derive(Clone, Default)]
pub struct InterceptProbe {
    stats: Rc<RefCell<InterceptStats>>,
}

impl InterceptProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_record_id(&self, record_id: impl Into<String>) {
        self.stats.borrow_mut().set_record_id(record_id);
    }

    pub fn summary(&self) -> InterceptSummary {
        self.stats.borrow().summary()
    }

    pub fn reset(&self) {
        self.stats.borrow_mut().reset();
    }
}

impl ReplayObserver for InterceptProbe {
    fn on_step(&mut self, record: &ParsedRecord, step: &StepRecord<'_>, state: &GameState) {
        if step.action.action_kind() != Some(ActionKind::DeclareWin) {
            return;
        }
        let Some(marker) = step.win else {
            return;
        };
        if marker.declared_fan == 0 || marker.self_drawn {
            return;
        }
        let Some((discarder, tile)) = state.last_discard else {
            warn!(step = step.step, "claim win with no discard on the table");
            return;
        };

        let mut stats = self.stats.borrow_mut();
        let record_id = stats.record_id.clone();
        let event = check_intercept(
            state,
            discarder,
            tile,
            record.round_wind(),
            step.step,
            &record_id,
        );
        stats.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paipu_engine::tile::Tile;

    fn t(i: u8) -> Tile {
        Tile::new(i).unwrap()
    }

    /// Seat waiting on 4s with a pure-flush hand worth well over the
    /// minimum: 111s 23s 555s 777s 99s.
    fn flush_wait_hand() -> Vec<Tile> {
        vec![
            t(36),
            t(37),
            t(38), // 111s
            t(40),
            t(44), // 2s 3s
            t(52),
            t(53),
            t(54), // 555s
            t(60),
            t(61),
            t(62), // 777s
            t(68),
            t(69), // 99s
        ]
    }

    #[test]
    fn single_eligible_seat_is_not_an_intercept() {
        let mut state = GameState::new();
        state.seats[1].hand = flush_wait_hand();
        state.seats[0].discards.push(t(48));
        state.last_discard = Some((0, t(48)));

        let event = check_intercept(&state, 0, t(48), Wind::East, 5, "r1");
        assert_eq!(event.potential_winners, vec![1]);
        assert_eq!(event.winner, Some(1));
        assert!(!event.is_intercept);
        assert!(event.potential_fans[0] >= MIN_WIN_FAN);
    }

    #[test]
    fn two_eligible_seats_make_an_intercept() {
        let mut state = GameState::new();
        state.seats[1].hand = flush_wait_hand();
        // Seat 2 also waits on 4s: 23s 111p 222p 333p 99p.
        state.seats[2].hand = vec![
            t(41),
            t(45),
            t(72),
            t(73),
            t(74),
            t(76),
            t(77),
            t(78),
            t(80),
            t(81),
            t(82),
            t(104),
            t(105),
        ];
        state.seats[0].discards.push(t(48));
        state.last_discard = Some((0, t(48)));

        let event = check_intercept(&state, 0, t(48), Wind::East, 9, "r2");
        assert_eq!(event.potential_winners, vec![1, 2]);
        assert_eq!(event.winner, Some(1));
        assert!(event.is_intercept);
    }

    #[test]
    fn low_fan_hands_are_ignored() {
        let mut state = GameState::new();
        // Seat 3 waits on 4s but with a bare chicken-adjacent hand:
        // 23s 456m 789m 123p EE -- a claim scores under the minimum.
        state.seats[3].hand = vec![
            t(40),
            t(44),
            t(12),
            t(16),
            t(20),
            t(24),
            t(28),
            t(32),
            t(72),
            t(76),
            t(80),
            t(108),
            t(109),
        ];
        state.seats[0].discards.push(t(48));
        state.last_discard = Some((0, t(48)));

        let event = check_intercept(&state, 0, t(48), Wind::South, 3, "r3");
        assert!(event.potential_winners.is_empty());
        assert!(!event.is_intercept);
    }

    #[test]
    fn summary_rates() {
        let mut stats = InterceptStats::default();
        stats.push(InterceptEvent {
            record_id: "a".into(),
            step: 1,
            discarder: 0,
            discard_tile: t(48),
            winner: Some(1),
            potential_winners: vec![1],
            potential_fans: vec![24],
            is_intercept: false,
        });
        stats.push(InterceptEvent {
            record_id: "a".into(),
            step: 9,
            discarder: 2,
            discard_tile: t(20),
            winner: Some(3),
            potential_winners: vec![3, 1],
            potential_fans: vec![12, 8],
            is_intercept: true,
        });
        let summary = stats.summary();
        assert_eq!(summary.total_ron_wins, 2);
        assert_eq!(summary.intercept_count, 1);
        assert!((summary.intercept_rate - 0.5).abs() < f64::EPSILON);
    }
}
