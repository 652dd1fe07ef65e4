#[cfg(test)]
mod replay_tests {
    use crate::action::RawAction;
    use crate::analysis::{self, WinInfo};
    use crate::replay::RecordReplayer;
    use crate::script::{ParsedRecord, PlayerEntry, SeatWinData};
    use crate::state::event_handler::RecordEventHandler;
    use crate::state::GameState;
    use crate::tile::{Tile, WALL_LEN};
    use crate::types::{Meld, MeldKind};

    fn t(i: u8) -> Tile {
        Tile::new(i).unwrap()
    }

    fn players() -> Vec<PlayerEntry> {
        ["甲", "乙", "丙", "丁"]
            .iter()
            .enumerate()
            .map(|(i, name)| PlayerEntry {
                id: format!("p{}", i),
                name: name.to_string(),
                elo: 1500.0,
            })
            .collect()
    }

    fn record(wall: Vec<Tile>, actions: Vec<RawAction>) -> ParsedRecord {
        ParsedRecord {
            wall,
            dice: [1, 1, 1, 1],
            players: players(),
            actions,
            win_flags: 0,
            win_data: vec![SeatWinData::default(); 4],
            round_info: 0,
            title: "测试局".to_string(),
        }
    }

    fn identity_wall() -> Vec<Tile> {
        (0..WALL_LEN as u8).map(t).collect()
    }

    fn raw(seat: u8, kind: u8, data: u32, time_ms: u64) -> RawAction {
        RawAction {
            seat,
            kind,
            data,
            time_ms,
        }
    }

    /// With dice 1-1-1-1 and dealer 0 the rotation starts at buffer
    /// index 116; `post_deal[i]` is the tile a seat sees at wall slot `i`.
    fn rotated_value(i: usize) -> u8 {
        ((116 + i) % WALL_LEN) as u8
    }

    /// Builds a wall buffer whose post-rotation order is `want`.
    fn buffer_for(want: &[u8; WALL_LEN]) -> Vec<Tile> {
        let mut buffer = vec![t(0); WALL_LEN];
        for (i, &v) in want.iter().enumerate() {
            buffer[(116 + i) % WALL_LEN] = t(v);
        }
        buffer
    }

    // -- deal-only record, no actions --------------------------------------

    #[test]
    fn deal_only_record() {
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&record(identity_wall(), vec![]));

        let state = &outcome.final_state;
        assert_eq!(state.seat(0).hand.len(), 14);
        for seat in 1..4 {
            assert_eq!(state.seat(seat).hand.len(), 13);
            let hand = &state.seat(seat).hand;
            assert!(hand.windows(2).all(|w| w[0] <= w[1]));
        }
        assert_eq!(state.wall.front, 53);
        assert!(outcome.game_log.win_analysis.is_none());
        assert!(outcome.game_log.steps.is_empty());
    }

    // -- zero-fan declaration keeps the replay going -------------------------

    #[test]
    fn wrong_win_does_not_trigger_analysis() {
        let actions = vec![
            raw(0, 2, 44, 1000),
            raw(1, 7, 28, 2000),
            // Auto win with zero declared fan: an invalid "wrong win".
            raw(1, 6, 1, 3000),
        ];
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&record(identity_wall(), actions));

        assert_eq!(outcome.game_log.steps.len(), 3);
        assert!(outcome.game_log.win_analysis.is_none());
    }

    // -- full valid game: deal, discard, draw, self-drawn win ----------------

    fn winning_record() -> ParsedRecord {
        // Seat 1 is dealt 123m 456m 789m 111s 9s and draws the second 9s.
        let seat1_positions = [4usize, 5, 6, 7, 20, 21, 22, 23, 36, 37, 38, 39, 49];
        let seat1_tiles = [0u8, 4, 8, 12, 16, 20, 24, 28, 32, 36, 37, 38, 68];

        let mut want = [0u8; WALL_LEN];
        let mut placed = [false; WALL_LEN];
        let mut used = [false; 144];
        for (&pos, &tile) in seat1_positions.iter().zip(seat1_tiles.iter()) {
            want[pos] = tile;
            placed[pos] = true;
            used[tile as usize] = true;
        }
        want[53] = 69; // seat 1's winning draw
        placed[53] = true;
        used[69] = true;

        let mut rest = (0u8..144).filter(|&v| !used[v as usize]);
        for i in 0..WALL_LEN {
            if !placed[i] {
                want[i] = rest.next().unwrap();
            }
        }

        // The dealer throws the first tile dealt to them (wall slot 0).
        let dealer_discard = want[0] as u32;
        let actions = vec![
            raw(0, 2, dealer_discard, 900),
            raw(1, 7, 69, 1800),
            raw(1, 6, (24 << 1) | 1, 2600),
        ];

        let mut rec = record(buffer_for(&want), actions);
        // Winner bitmap: seat 1; discarder bitmap marks the winner itself
        // for a self-drawn win.
        rec.win_flags = (1 << 1) | (1 << (1 + 4));
        rec.win_data[1] = serde_json::from_value(serde_json::json!({
            "f": 24,
            "t": { "28": 16, "56": 4, "76": 1 | (1 << 8), "81": 1 },
            "h": "123456789m1119s9s",
        }))
        .unwrap();
        rec
    }

    #[test]
    fn self_drawn_win_is_analyzed() {
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&winning_record());

        let analysis = outcome.game_log.win_analysis.expect("win expected");
        assert_eq!(analysis.winner, 1);
        assert_eq!(analysis.winner_name, "乙");
        assert_eq!(analysis.winner_wind, 'S');
        assert_eq!(analysis.declared_total_fan, 24);
        assert_eq!(analysis.scoring_input, "123456789m1119s9s|ES1000");
        assert_eq!(analysis.env_flag, "ES1000");
        // 清龙 16 + 不求人 4 + 幺九刻 1 + 缺一门 1 + 无字 1 + 单钓将 1.
        assert_eq!(analysis.computed_total_fan, 24);
        assert_eq!(analysis.flower_count, 0);
        // Declared map decodes points and counts; base sums them.
        assert_eq!(analysis.declared_base_fan, 16 + 4 + 2 + 1);
    }

    #[test]
    fn replay_is_deterministic() {
        let rec = winning_record();
        let mut replayer = RecordReplayer::new();
        let first = replayer.replay(&rec);
        let second = replayer.replay(&rec);

        let a = serde_json::to_string(&first.game_log).unwrap();
        let b = serde_json::to_string(&second.game_log).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn step_logs_snapshot_the_actor() {
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&winning_record());

        let steps = &outcome.game_log.steps;
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].seat, 0);
        assert_eq!(steps[0].wind, "东");
        assert_eq!(steps[0].discard_tiles.len(), 1);
        assert_eq!(steps[1].seat, 1);
        assert_eq!(steps[1].hand_tiles.len(), 14);
        assert_eq!(steps[1].elapsed_ms, 900);
        assert!(steps[2].description.contains("和"));
    }

    // -- sea-bottom self-draw ------------------------------------------------

    #[test]
    fn sea_bottom_sets_env_bit() {
        let mut actions: Vec<RawAction> = Vec::new();
        let mut time = 1000;
        for i in 53..WALL_LEN {
            actions.push(raw((i % 4) as u8, 7, rotated_value(i) as u32, time));
            time += 100;
        }
        // The last draw (wall slot 143) lands on seat 3, who declares.
        actions.push(raw(3, 6, (8 << 1) | 1, time));

        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&record(identity_wall(), actions));

        assert!(outcome.final_state.wall.is_exhausted());
        let analysis = outcome.game_log.win_analysis.expect("win expected");
        let env: Vec<char> = analysis.env_flag.chars().collect();
        assert_eq!(env[2], '1', "self-drawn bit");
        assert_eq!(env[4], '1', "sea-bottom bit");
        assert_eq!(env[5], '0', "kong-rob bit");
    }

    // -- added kong robbed ---------------------------------------------------

    #[test]
    fn robbed_kong_env_flag() {
        let mut state = GameState::new();
        // Seat 2 exposed a pung of kind 7 earlier and just drew the fourth.
        state.seats[2].melds.push(Meld {
            kind: MeldKind::Pung,
            tiles: vec![t(28), t(28), t(28)],
            direction: 1,
            offer_seq: 0,
        });
        state.seats[2].hand = vec![t(31), t(60)];
        state.apply_action(&raw(2, 5, 7 | 0x0300, 5000));
        assert!(state.last_action_was_add_kong);

        // Seat 3 robs the fourth copy, completing an 8m pair.
        state.seats[3].hand = vec![
            t(0),
            t(4),
            t(8), // 123m
            t(40),
            t(44),
            t(48), // 234s
            t(72),
            t(76),
            t(80), // 123p
            t(96),
            t(100),
            t(104), // 789p
            t(29), // lone 8m
        ];
        state.apply_action(&raw(3, 6, (9 << 1) | 0, 5600));

        let rec = record(identity_wall(), vec![]);
        let win = WinInfo {
            seat: 3,
            tile: t(28),
            self_drawn: false,
        };
        let analysis = analysis::analyze_win(&state, &rec, &win);
        let env: Vec<char> = analysis.env_flag.chars().collect();
        assert_eq!(env[2], '0', "self-drawn bit");
        assert_eq!(env[5], '1', "kong-rob bit");
        // Kong-rob forces the last-copy bit off.
        assert_eq!(env[3], '0', "last-copy bit");
    }

    // -- envelope round trip -------------------------------------------------

    #[test]
    fn replay_from_encoded_envelope() {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine as _;
        use flate2::write::ZlibEncoder;
        use flate2::Compression;
        use std::io::Write;

        let wall_hex: String = (0..WALL_LEN).map(|i| format!("{:02x}", i)).collect();
        let script = serde_json::json!({
            "w": wall_hex,
            "d": 0x1111,
            "p": [
                {"i": "a", "n": "甲", "e": 1500.0},
                {"i": "b", "n": "乙", "e": 1500.0},
                {"i": "c", "n": "丙", "e": 1500.0},
                {"i": "d", "n": "丁", "e": 1500.0},
            ],
            "a": [[7, 44, 1000]],
            "g": {"t": "封装测试"},
        });

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(serde_json::to_string(&script).unwrap().as_bytes())
            .unwrap();
        let compressed = encoder.finish().unwrap();
        let record_json =
            serde_json::json!({ "script": BASE64.encode(compressed) }).to_string();

        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay_json(&record_json).unwrap();
        assert_eq!(outcome.game_log.title, "封装测试");
        assert_eq!(outcome.game_log.steps.len(), 1);
        // Seat 0, kind 7: a draw.
        assert_eq!(outcome.game_log.steps[0].action_kind, 7);
    }

    // -- invariants over a replayed record -----------------------------------

    #[test]
    fn kind_census_is_conserved() {
        let rec = winning_record();
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&rec);

        let census = outcome.final_state.kind_census();
        let flowers: usize = outcome
            .final_state
            .seats
            .iter()
            .map(|s| s.flower_tiles.len())
            .sum();
        // 136 suited/honor tiles spread over the census, flowers separate.
        let total: u32 = census.iter().map(|&c| c as u32).sum();
        assert_eq!(total as usize + flowers + flowers_in_zones(&outcome), 144);
        for &count in census.iter() {
            assert!(count <= 4);
        }
    }

    /// Flowers still sitting in hands or the wall (never melded).
    fn flowers_in_zones(outcome: &crate::replay::ReplayOutcome) -> usize {
        let state = &outcome.final_state;
        let in_hands: usize = state
            .seats
            .iter()
            .map(|s| s.hand.iter().filter(|t| t.is_flower()).count())
            .sum();
        let in_wall = state
            .wall
            .undealt()
            .iter()
            .filter(|t| t.is_flower())
            .count();
        in_hands + in_wall
    }

    #[test]
    fn hand_size_invariant_after_each_step() {
        let rec = winning_record();
        let mut replayer = RecordReplayer::new();
        let outcome = replayer.replay(&rec);
        let state = &outcome.final_state;
        for seat in 0..4 {
            let s = state.seat(seat);
            let size = s.hand.len() + 3 * s.melds.len();
            assert!(size == 13 || size == 14, "seat {} size {}", seat, size);
        }
    }
}
