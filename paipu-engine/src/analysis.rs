//! Win analysis: environment predicates, declared-fan extraction, and the
//! declared-versus-computed report.
//!
//! Analyzers are plain per-call values; a worker owns one implicitly by
//! calling [`analyze_win`] with its own state.

use tracing::{debug, warn};

use crate::fan;
use crate::format;
use crate::script::{ParsedRecord, SeatWinData};
use crate::state::GameState;
use crate::tile::Tile;
use crate::types::{fan_name, FanDetail, Wind, WinAnalysis};

/// The captured winning event a replay hands to the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WinInfo {
    pub seat: u8,
    pub tile: Tile,
    pub self_drawn: bool,
}

/// Seat wind relative to the dealer.
pub fn seat_wind(seat: u8, dealer: u8) -> Wind {
    Wind::from((seat + 4 - dealer) % 4)
}

/// Sea-bottom: the wall ring is exhausted.
pub fn is_sea_bottom(state: &GameState) -> bool {
    state.wall.is_exhausted()
}

/// Kong-rob: the win claims the fourth tile of an added kong.
pub fn is_robbing_kong(state: &GameState, self_drawn: bool) -> bool {
    !self_drawn && state.last_action_was_add_kong
}

/// Last-copy: the winning kind's other copies are all exposed. A meld
/// holding exactly three copies settles it immediately; otherwise every
/// meld copy and discard copy counts against a threshold of three for a
/// self-draw and four for a claim (the claimed win tile itself sits in the
/// donor's pile). Mutually exclusive with kong-rob.
pub fn is_last_copy(state: &GameState, tile: Tile, self_drawn: bool) -> bool {
    if is_robbing_kong(state, self_drawn) {
        return false;
    }
    let Some(kind) = tile.kind() else {
        return false;
    };

    for seat in &state.seats {
        for meld in &seat.melds {
            let copies = meld
                .tiles
                .iter()
                .filter(|t| t.kind() == Some(kind))
                .count();
            if copies == 3 {
                return true;
            }
        }
    }

    let exposed = state.exposed_copies(kind);
    let required = if self_drawn { 3 } else { 4 };
    if exposed > required {
        warn!(
            kind = kind.id(),
            exposed, "more copies exposed than the wall holds"
        );
    }
    exposed >= required
}

/// Declared fan entries from the per-winner fan map. Each packed value is
/// `points | (count - 1) << 8`; the legacy duplicate id 83 is dropped.
pub fn extract_declared_fans(win_data: &SeatWinData) -> Vec<FanDetail> {
    let mut details = Vec::new();
    for (id_str, &packed) in &win_data.fan_map {
        let Ok(fan_id) = id_str.parse::<u16>() else {
            warn!(id = id_str.as_str(), "non-numeric fan id in win data");
            continue;
        };
        if fan_id == 83 {
            continue;
        }
        details.push(FanDetail {
            fan_id,
            name: fan_name(fan_id),
            points: packed & 0xFF,
            count: ((packed >> 8) & 0xFF) + 1,
        });
    }
    details
}

/// Builds the full `WinAnalysis` for a captured win.
pub fn analyze_win(state: &GameState, record: &ParsedRecord, win: &WinInfo) -> WinAnalysis {
    let seat = win.seat as usize & 3;
    let seat_state = state.seat(seat);

    let round = record.round_wind();
    let swind = seat_wind(win.seat, state.dealer);
    let last_copy = is_last_copy(state, win.tile, win.self_drawn);
    let sea = is_sea_bottom(state);
    let rob = is_robbing_kong(state, win.self_drawn);

    let scoring_input = format::scoring_string(
        &seat_state.hand,
        &seat_state.melds,
        win.tile,
        round,
        swind,
        win.self_drawn,
        last_copy,
        sea,
        rob,
        0,
        &[],
    );
    let env = format::env_flag(round, swind, win.self_drawn, last_copy, sea, rob);

    let win_data = &record.win_data[seat];
    let declared_fans = extract_declared_fans(win_data);
    let declared_base_fan = declared_fans.iter().map(|f| f.points * f.count).sum();

    let (computed_total_fan, computed_fans) = match fan::score_hand(&scoring_input) {
        Ok(Some(tally)) => (tally.total, tally.summary()),
        Ok(None) => {
            warn!(seat, input = scoring_input.as_str(), "hand does not score as a win");
            (0, Vec::new())
        }
        Err(e) => {
            warn!(seat, error = %e, "scoring input failed to parse");
            (0, Vec::new())
        }
    };

    let mut formatted = seat_state.hand.clone();
    formatted.sort();
    let formatted_hand = formatted
        .iter()
        .map(|t| t.label().to_string())
        .collect::<Vec<_>>()
        .join(" ");

    debug!(
        seat,
        declared = win_data.total_fan,
        computed = computed_total_fan,
        input = scoring_input.as_str(),
        "win analyzed"
    );

    WinAnalysis {
        winner: win.seat,
        winner_name: record.player_name(seat),
        winner_wind: swind.letter(),
        declared_total_fan: win_data.total_fan,
        declared_base_fan,
        computed_total_fan,
        flower_count: seat_state.flower_count,
        formatted_hand,
        declared_fans,
        computed_fans,
        scoring_input,
        env_flag: env,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Meld, MeldKind};

    fn t(i: u8) -> Tile {
        Tile::new(i).unwrap()
    }

    #[test]
    fn seat_wind_rotation() {
        assert_eq!(seat_wind(0, 0), Wind::East);
        assert_eq!(seat_wind(3, 0), Wind::North);
        assert_eq!(seat_wind(0, 2), Wind::West);
        assert_eq!(seat_wind(2, 2), Wind::East);
    }

    #[test]
    fn last_copy_counts_melds_and_discards() {
        let mut state = GameState::new();
        // Kind 5: one copy in a pung-meld... a full pung settles it.
        state.seats[1].melds.push(Meld {
            kind: MeldKind::Pung,
            tiles: vec![t(20), t(20), t(20)],
            direction: 1,
            offer_seq: 0,
        });
        assert!(is_last_copy(&state, t(21), false));
        assert!(is_last_copy(&state, t(21), true));
    }

    #[test]
    fn last_copy_from_discards_only() {
        let mut state = GameState::new();
        state.seats[0].discards.push(t(20));
        state.seats[2].discards.push(t(21));
        state.seats[3].discards.push(t(22));
        // Claim: three older copies plus the claimed one in a pile = 4.
        state.seats[1].discards.push(t(23));
        assert!(is_last_copy(&state, t(23), false));

        let mut state = GameState::new();
        state.seats[0].discards.push(t(20));
        state.seats[2].discards.push(t(21));
        // Self-draw needs only the other three visible.
        assert!(!is_last_copy(&state, t(23), true));
        state.seats[3].discards.push(t(22));
        assert!(is_last_copy(&state, t(23), true));
    }

    #[test]
    fn robbing_kong_excludes_last_copy() {
        let mut state = GameState::new();
        state.last_action_was_add_kong = true;
        for seat in 0..3 {
            state.seats[seat].discards.push(t(20 + seat as u8));
        }
        state.seats[3].discards.push(t(23));
        assert!(is_robbing_kong(&state, false));
        assert!(!is_last_copy(&state, t(23), false));
        // A self-draw is never a rob.
        assert!(!is_robbing_kong(&state, true));
    }

    #[test]
    fn declared_fan_extraction() {
        let win_data: SeatWinData = serde_json::from_value(serde_json::json!({
            "f": 17,
            "t": {
                "22": 24,                  // 清一色, 24 points, count 1
                "59": 2 | (1 << 8),        // 箭刻, 2 points, count 2
                "83": 1,                   // legacy duplicate, dropped
            },
        }))
        .unwrap();
        let fans = extract_declared_fans(&win_data);
        assert_eq!(fans.len(), 2);
        let quinyise = fans.iter().find(|f| f.fan_id == 22).unwrap();
        assert_eq!(quinyise.points, 24);
        assert_eq!(quinyise.count, 1);
        assert_eq!(quinyise.name, "清一色");
        let jianke = fans.iter().find(|f| f.fan_id == 59).unwrap();
        assert_eq!(jianke.count, 2);
        let base: u32 = fans.iter().map(|f| f.points * f.count).sum();
        assert_eq!(base, 24 + 4);
    }
}
