//! Property-based invariants over generated records.
//!
//! A small deterministic generator deals a real wall, then plays rounds of
//! draw-and-discard using only tiles the shadow hands actually hold, so
//! every generated record is internally consistent. The replay must then
//! preserve the universal invariants for any seed.

use proptest::prelude::*;

use paipu_engine::action::RawAction;
use paipu_engine::replay::RecordReplayer;
use paipu_engine::script::{ParsedRecord, PlayerEntry, SeatWinData};
use paipu_engine::tile::{Tile, WALL_LEN};

/// Tile value at post-rotation wall slot `i` for an identity buffer and
/// dice 1-1-1-1 (rotation start 116).
fn rotated_value(i: usize) -> u8 {
    ((116 + i) % WALL_LEN) as u8
}

/// Splitmix-style step; deterministic per seed.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as usize
    }
}

/// Shadow-deals the wall and emits a dealer discard followed by
/// draw-discard turns for the other seats in rotation.
fn build_record(seed: u64, turns: usize) -> ParsedRecord {
    let mut hands: [Vec<u8>; 4] = Default::default();
    let mut slot = 0usize;
    for _ in 0..3 {
        for seat in 0..4 {
            for _ in 0..4 {
                hands[seat].push(rotated_value(slot));
                slot += 1;
            }
        }
    }
    for seat in 0..4 {
        hands[seat].push(rotated_value(slot));
        slot += 1;
    }
    hands[0].push(rotated_value(slot));

    let mut rng = Lcg(seed | 1);
    let mut actions: Vec<RawAction> = Vec::new();
    let mut time = 500u64;

    // The dealer opens with a discard from the dealt fourteen.
    let idx = rng.next() % hands[0].len();
    let tile = hands[0].remove(idx);
    actions.push(RawAction {
        seat: 0,
        kind: 2,
        data: tile as u32,
        time_ms: time,
    });

    let mut front = 53usize;
    for turn in 0..turns {
        if front >= WALL_LEN {
            break;
        }
        let seat = ((turn + 1) % 4) as u8;
        let drawn = rotated_value(front);
        front += 1;
        hands[seat as usize].push(drawn);
        time += 300;
        actions.push(RawAction {
            seat,
            kind: 7,
            data: drawn as u32,
            time_ms: time,
        });

        let idx = rng.next() % hands[seat as usize].len();
        let tile = hands[seat as usize].remove(idx);
        time += 300;
        actions.push(RawAction {
            seat,
            kind: 2,
            data: tile as u32,
            time_ms: time,
        });
    }

    ParsedRecord {
        wall: (0..WALL_LEN as u8).map(|i| Tile::new(i).unwrap()).collect(),
        dice: [1, 1, 1, 1],
        players: (0..4)
            .map(|i| PlayerEntry {
                id: format!("p{}", i),
                name: format!("玩家{}", i),
                elo: 1500.0,
            })
            .collect(),
        actions,
        win_flags: 0,
        win_data: vec![SeatWinData::default(); 4],
        round_info: 0,
        title: String::new(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replay_invariants_hold(seed in any::<u64>(), turns in 0usize..=80) {
        let record = build_record(seed, turns);
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&record);
        let state = &outcome.final_state;

        // -- Hand-size invariant: everyone sits at 13 between turns. ------
        for seat in 0..4 {
            let s = state.seat(seat);
            prop_assert_eq!(s.hand.len() + 3 * s.melds.len(), 13);
            // Hands stay sorted.
            prop_assert!(s.hand.windows(2).all(|w| w[0] <= w[1]));
        }

        // -- Wall pointer accounting. ------------------------------------
        let draws = record.actions.iter().filter(|a| a.kind == 7).count();
        prop_assert_eq!(state.wall.front, 53 + draws);
        prop_assert!(state.wall.front <= state.wall.back + 1);

        // -- Per-kind conservation: every identity accounted for. --------
        let census = state.kind_census();
        for (kind, &count) in census.iter().enumerate() {
            prop_assert!(count <= 4, "kind {} seen {} times", kind, count);
        }
        let suited: u32 = census.iter().map(|&c| c as u32).sum();
        let flowers: usize = state
            .seats
            .iter()
            .map(|s| {
                s.hand.iter().filter(|t| t.is_flower()).count()
                    + s.discards.iter().filter(|t| t.is_flower()).count()
            })
            .sum::<usize>()
            + state.wall.undealt().iter().filter(|t| t.is_flower()).count();
        prop_assert_eq!(suited as usize + flowers, 144);

        // -- Discard piles only grow (no claims in this generator). ------
        for seat in 0..4 {
            let expected = record
                .actions
                .iter()
                .filter(|a| a.kind == 2 && a.seat == seat as u8)
                .count();
            prop_assert_eq!(state.seat(seat).discards.len(), expected);
        }
    }

    #[test]
    fn replay_is_deterministic(seed in any::<u64>(), turns in 0usize..=40) {
        let record = build_record(seed, turns);
        let mut replayer = RecordReplayer::new();
        let first = serde_json::to_string(&replayer.replay(&record).game_log).unwrap();
        let second = serde_json::to_string(&replayer.replay(&record).game_log).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn step_logs_match_action_count(seed in any::<u64>(), turns in 0usize..=40) {
        let record = build_record(seed, turns);
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&record);
        prop_assert_eq!(outcome.game_log.steps.len(), record.actions.len());
        // Timestamps in the log are non-negative deltas.
        for step in &outcome.game_log.steps {
            prop_assert!(step.elapsed_ms <= 600);
        }
    }
}
