//! End-to-end replay scenarios through the public crate surfaces:
//! a full claim-win record with the intercept probe attached, and the
//! aggregate rates that fall out of it.

use paipu_engine::action::RawAction;
use paipu_engine::replay::RecordReplayer;
use paipu_engine::script::{ParsedRecord, PlayerEntry, SeatWinData};
use paipu_engine::tile::{Tile, WALL_LEN};
use paipu_stats::intercept::{InterceptProbe, MIN_WIN_FAN};

fn t(i: u8) -> Tile {
    Tile::new(i).unwrap()
}

fn players() -> Vec<PlayerEntry> {
    (0..4)
        .map(|i| PlayerEntry {
            id: format!("p{}", i),
            name: format!("玩家{}", i),
            elo: 1500.0,
        })
        .collect()
}

/// Post-rotation wall slot positions dealt to each seat (dealer 0).
fn seat_positions(seat: usize) -> Vec<usize> {
    let mut positions = Vec::with_capacity(14);
    for round in 0..3 {
        for slot in 0..4 {
            positions.push(round * 16 + seat * 4 + slot);
        }
    }
    positions.push(48 + seat);
    if seat == 0 {
        positions.push(52);
    }
    positions
}

/// Builds a wall buffer whose post-rotation order is `want`, for dice
/// 1-1-1-1 (rotation start 116).
fn buffer_for(want: &[u8; WALL_LEN]) -> Vec<Tile> {
    let mut buffer = vec![t(0); WALL_LEN];
    for (i, &v) in want.iter().enumerate() {
        buffer[(116 + i) % WALL_LEN] = t(v);
    }
    buffer
}

/// Seat 0 deals into a double wait: seats 1 and 2 both hold hands that
/// complete on 4s (tile 48) above the declaration minimum.
fn intercept_record() -> ParsedRecord {
    // Seat 1: 111s 23s 555s 777s 99s -- a pure flush wait.
    let seat1_tiles = [36u8, 37, 38, 40, 44, 52, 53, 54, 60, 61, 62, 68, 69];
    // Seat 2: 23s 111p 222p 333p 99p.
    let seat2_tiles = [41u8, 45, 72, 73, 74, 76, 77, 78, 80, 81, 82, 104, 105];

    let mut want = [0u8; WALL_LEN];
    let mut placed = [false; WALL_LEN];
    let mut used = [false; 144];
    let mut assign = |positions: &[usize],
                      tiles: &[u8],
                      want: &mut [u8; WALL_LEN],
                      placed: &mut [bool; WALL_LEN],
                      used: &mut [bool; 144]| {
        for (&pos, &tile) in positions.iter().zip(tiles.iter()) {
            want[pos] = tile;
            placed[pos] = true;
            used[tile as usize] = true;
        }
    };
    assign(
        &seat_positions(1)[..13],
        &seat1_tiles,
        &mut want,
        &mut placed,
        &mut used,
    );
    assign(
        &seat_positions(2)[..13],
        &seat2_tiles,
        &mut want,
        &mut placed,
        &mut used,
    );

    // The dealer's extra tile is the 4s both seats wait on.
    want[52] = 48;
    placed[52] = true;
    used[48] = true;

    let mut rest = (0u8..144).filter(|&v| !used[v as usize]);
    for i in 0..WALL_LEN {
        if !placed[i] {
            want[i] = rest.next().unwrap();
        }
    }

    let actions = vec![
        RawAction {
            seat: 0,
            kind: 2,
            data: 48,
            time_ms: 700,
        },
        RawAction {
            seat: 1,
            kind: 6,
            data: 43 << 1,
            time_ms: 1500,
        },
    ];

    let mut win_data = vec![SeatWinData::default(); 4];
    win_data[1] = serde_json::from_value(serde_json::json!({
        "f": 43,
        "t": { "22": 24, "33": 16, "62": 2, "73": 1 },
        "h": "11123455577799s4s",
    }))
    .unwrap();

    ParsedRecord {
        wall: buffer_for(&want),
        dice: [1, 1, 1, 1],
        players: players(),
        actions,
        win_flags: (1 << 1) | (1 << 4),
        win_data,
        round_info: 0,
        title: "截和测试".to_string(),
    }
}

#[test]
fn claim_win_emits_intercept_event() {
    let record = intercept_record();
    let probe = InterceptProbe::new();
    probe.set_record_id("rec-1");

    let mut replayer = RecordReplayer::new();
    replayer.add_observer(Box::new(probe.clone()));
    let outcome = replayer.replay(&record);

    let summary = probe.summary();
    assert_eq!(summary.events.len(), 1);
    let event = &summary.events[0];
    assert_eq!(event.record_id, "rec-1");
    assert_eq!(event.discarder, 0);
    assert_eq!(event.discard_tile, t(48));
    // Scan order from discarder + 1: seat 1 first, then seat 2.
    assert_eq!(event.potential_winners, vec![1, 2]);
    assert_eq!(event.winner, Some(1));
    assert!(event.is_intercept);
    assert!(event.potential_fans.iter().all(|&f| f >= MIN_WIN_FAN));
    // The flush seat scores 清一色 + 三暗刻 + 门前清 + 幺九刻.
    assert_eq!(event.potential_fans[0], 43);

    assert_eq!(summary.total_ron_wins, 1);
    assert_eq!(summary.intercept_count, 1);
    assert!((summary.intercept_rate - 1.0).abs() < f64::EPSILON);

    // The analyzer agrees with the probe about the winner's hand.
    let analysis = outcome.game_log.win_analysis.expect("win expected");
    assert_eq!(analysis.winner, 1);
    assert_eq!(analysis.winner_wind, 'S');
    assert_eq!(analysis.declared_total_fan, 43);
    assert_eq!(analysis.computed_total_fan, 43);
    assert_eq!(&analysis.env_flag[2..], "0000");
}

#[test]
fn self_drawn_wins_do_not_probe() {
    let mut record = intercept_record();
    // Rewrite the tail: seat 1 draws its winning tile instead.
    record.actions = vec![
        RawAction {
            seat: 1,
            kind: 7,
            data: 48,
            time_ms: 700,
        },
        RawAction {
            seat: 1,
            kind: 6,
            data: (43 << 1) | 1,
            time_ms: 1500,
        },
    ];
    record.win_flags = (1 << 1) | (1 << 5);

    let probe = InterceptProbe::new();
    let mut replayer = RecordReplayer::new();
    replayer.add_observer(Box::new(probe.clone()));
    let _ = replayer.replay(&record);

    let summary = probe.summary();
    assert!(summary.events.is_empty());
    assert_eq!(summary.total_ron_wins, 0);
    assert_eq!(summary.intercept_rate, 0.0);
}

#[test]
fn wrong_win_is_ignored_by_the_probe() {
    let mut record = intercept_record();
    record.actions[1].data = 0;
    record.win_flags = 0;
    record.win_data[1] = SeatWinData::default();

    let probe = InterceptProbe::new();
    let mut replayer = RecordReplayer::new();
    replayer.add_observer(Box::new(probe.clone()));
    let outcome = replayer.replay(&record);

    assert!(probe.summary().events.is_empty());
    assert!(outcome.game_log.win_analysis.is_none());
}
