//! Winning-shape detection and block decomposition.
//!
//! Standard hands decompose into sets and a pair via a pair-first DFS over
//! per-kind counts. The special shapes (seven pairs, thirteen orphans, the
//! knitted forms) are closed-form checks.

use crate::tile::{HONOR_START, NUM_TILE_KINDS};

/// One concealed block of a standard decomposition. The payload is the
/// lowest kind of a chow, or the shared kind of a pung / the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Chow(u8),
    Pung(u8),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    pub blocks: Vec<Block>,
    pub pair: u8,
}

/// All decompositions of `counts` into `sets_needed` blocks plus a pair.
pub fn decompose(counts: &[u8; NUM_TILE_KINDS], sets_needed: usize) -> Vec<Decomposition> {
    let total: u32 = counts.iter().map(|&c| c as u32).sum();
    if total != sets_needed as u32 * 3 + 2 {
        return Vec::new();
    }

    let mut results = Vec::new();
    let mut work = *counts;
    for pair in 0..NUM_TILE_KINDS as u8 {
        if work[pair as usize] < 2 {
            continue;
        }
        work[pair as usize] -= 2;
        let mut blocks = Vec::with_capacity(sets_needed);
        dfs_blocks(&mut work, &mut blocks, pair, sets_needed, &mut results);
        work[pair as usize] += 2;
    }
    results
}

fn dfs_blocks(
    counts: &mut [u8; NUM_TILE_KINDS],
    blocks: &mut Vec<Block>,
    pair: u8,
    sets_needed: usize,
    results: &mut Vec<Decomposition>,
) {
    if blocks.len() == sets_needed {
        if counts.iter().all(|&c| c == 0) {
            results.push(Decomposition {
                blocks: blocks.clone(),
                pair,
            });
        }
        return;
    }

    // First kind with tiles left anchors the next block; trying both block
    // shapes there covers every decomposition without duplicates.
    let Some(kind) = counts.iter().position(|&c| c > 0) else {
        return;
    };
    let kind = kind as u8;

    if counts[kind as usize] >= 3 {
        counts[kind as usize] -= 3;
        blocks.push(Block::Pung(kind));
        dfs_blocks(counts, blocks, pair, sets_needed, results);
        blocks.pop();
        counts[kind as usize] += 3;
    }

    if chow_possible(counts, kind) {
        for offset in 0..3 {
            counts[(kind + offset) as usize] -= 1;
        }
        blocks.push(Block::Chow(kind));
        dfs_blocks(counts, blocks, pair, sets_needed, results);
        blocks.pop();
        for offset in 0..3 {
            counts[(kind + offset) as usize] += 1;
        }
    }
}

#[inline]
fn chow_possible(counts: &[u8; NUM_TILE_KINDS], kind: u8) -> bool {
    kind < HONOR_START
        && kind % 9 <= 6
        && counts[kind as usize] > 0
        && counts[(kind + 1) as usize] > 0
        && counts[(kind + 2) as usize] > 0
}

/// True when the counts form a complete standard hand with `sets_needed`
/// concealed blocks. Cheaper than materializing every decomposition.
pub fn is_standard_win(counts: &[u8; NUM_TILE_KINDS], sets_needed: usize) -> bool {
    !decompose(counts, sets_needed).is_empty()
}

/// Seven pairs: fourteen concealed tiles, every kind an even count.
pub fn is_seven_pairs(counts: &[u8; NUM_TILE_KINDS]) -> bool {
    let total: u32 = counts.iter().map(|&c| c as u32).sum();
    total == 14 && counts.iter().all(|&c| c % 2 == 0)
}

/// Seven shifted pairs: seven consecutive pairs in one suit.
pub fn is_seven_shifted_pairs(counts: &[u8; NUM_TILE_KINDS]) -> bool {
    if !is_seven_pairs(counts) {
        return false;
    }
    for suit_start in [0u8, 9, 18] {
        for low in 0..=2u8 {
            let start = (suit_start + low) as usize;
            if (start..start + 7).all(|k| counts[k] == 2) {
                return true;
            }
        }
    }
    false
}

/// The thirteen terminal/honor kinds.
const ORPHAN_KINDS: [u8; 13] = [0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33];

/// Thirteen orphans: every orphan kind once, one of them paired.
pub fn is_thirteen_orphans(counts: &[u8; NUM_TILE_KINDS]) -> bool {
    let total: u32 = counts.iter().map(|&c| c as u32).sum();
    if total != 14 {
        return false;
    }
    let mut pairs = 0;
    for kind in 0..NUM_TILE_KINDS as u8 {
        let c = counts[kind as usize];
        if ORPHAN_KINDS.contains(&kind) {
            match c {
                1 => {}
                2 => pairs += 1,
                _ => return false,
            }
        } else if c != 0 {
            return false;
        }
    }
    pairs == 1
}

/// The three knitted sequences (147 / 258 / 369) assigned to the three
/// suits in some permutation. Returns the nine kinds of the first
/// assignment fully present in `counts`.
pub fn knitted_kinds(counts: &[u8; NUM_TILE_KINDS]) -> Option<[u8; 9]> {
    const SUIT_STARTS: [u8; 3] = [0, 9, 18];
    const ROWS: [[u8; 3]; 3] = [[0, 3, 6], [1, 4, 7], [2, 5, 8]];
    const PERMS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    for perm in PERMS {
        let mut kinds = [0u8; 9];
        let mut ok = true;
        for (suit, &row) in perm.iter().enumerate() {
            for (i, &offset) in ROWS[row].iter().enumerate() {
                let kind = SUIT_STARTS[suit] + offset;
                if counts[kind as usize] == 0 {
                    ok = false;
                    break;
                }
                kinds[suit * 3 + i] = kind;
            }
            if !ok {
                break;
            }
        }
        if ok {
            return Some(kinds);
        }
    }
    None
}

/// Lesser honors and knitted tiles: fourteen singles drawn from one
/// knitted assignment plus the seven honors.
pub fn is_lesser_knitted(counts: &[u8; NUM_TILE_KINDS]) -> bool {
    let total: u32 = counts.iter().map(|&c| c as u32).sum();
    if total != 14 || counts.iter().any(|&c| c > 1) {
        return false;
    }
    const SUIT_STARTS: [u8; 3] = [0, 9, 18];
    const ROWS: [[u8; 3]; 3] = [[0, 3, 6], [1, 4, 7], [2, 5, 8]];
    const PERMS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];
    'perm: for perm in PERMS {
        let mut allowed = [false; NUM_TILE_KINDS];
        for honor in HONOR_START..NUM_TILE_KINDS as u8 {
            allowed[honor as usize] = true;
        }
        for (suit, &row) in perm.iter().enumerate() {
            for &offset in &ROWS[row] {
                allowed[(SUIT_STARTS[suit] + offset) as usize] = true;
            }
        }
        for kind in 0..NUM_TILE_KINDS {
            if counts[kind] > 0 && !allowed[kind] {
                continue 'perm;
            }
        }
        return true;
    }
    false
}

/// Greater honors and knitted tiles: the lesser form with all seven honors.
pub fn is_greater_knitted(counts: &[u8; NUM_TILE_KINDS]) -> bool {
    is_lesser_knitted(counts)
        && (HONOR_START..NUM_TILE_KINDS as u8).all(|k| counts[k as usize] == 1)
}
