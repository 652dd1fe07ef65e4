//! Canonical textual hand forms.
//!
//! Two forms exist: the *group form* (free tiles grouped by suit, `m` then
//! `p` then `s`, honors appended as letters) and the *full hand form* fed
//! to the scoring backend (melds in brackets, concealed tiles, win tile
//! last, then the environment flag and optional flower segment).

use crate::tile::{Tile, TileClass, Suit, HONOR_SCORING_LETTERS};
use crate::types::{Meld, Wind};

/// One tile as it appears inside a textual group: a digit for suited
/// tiles, a letter for honors. Flowers have no group piece.
fn group_piece(tile: Tile) -> Option<String> {
    match tile.classify() {
        TileClass::Suited { number, .. } => Some(number.to_string()),
        TileClass::Honor { kind, .. } => Some(HONOR_SCORING_LETTERS[kind as usize].to_string()),
        TileClass::Flower { .. } => None,
    }
}

/// A standalone tile piece: digit + suit letter, or the honor letter.
fn tile_piece(tile: Tile) -> String {
    match tile.classify() {
        TileClass::Suited { suit, number, .. } => format!("{}{}", number, suit.letter()),
        TileClass::Honor { kind, .. } => HONOR_SCORING_LETTERS[kind as usize].to_string(),
        TileClass::Flower { .. } => String::new(),
    }
}

/// Groups free tiles by suit in `m`, `p`, `s` order, numbers sorted within
/// each suit, honors appended sorted by kind. Flowers are skipped.
pub fn group_form(tiles: &[Tile]) -> String {
    let mut by_suit: [Vec<u8>; 3] = Default::default();
    let mut honors: Vec<u8> = Vec::new();

    for &tile in tiles {
        match tile.classify() {
            TileClass::Suited { suit, number, .. } => by_suit[suit as usize].push(number),
            TileClass::Honor { kind, .. } => honors.push(kind),
            TileClass::Flower { .. } => {}
        }
    }

    let mut out = String::new();
    for suit in [Suit::Characters, Suit::Circles, Suit::Bamboos] {
        let numbers = &mut by_suit[suit as usize];
        if numbers.is_empty() {
            continue;
        }
        numbers.sort_unstable();
        for n in numbers.iter() {
            out.push((b'0' + n) as char);
        }
        out.push(suit.letter());
    }
    honors.sort_unstable();
    for h in honors {
        out.push(HONOR_SCORING_LETTERS[h as usize]);
    }
    out
}

/// Bracketed pack form: tile pieces in stored order, the suit letter once,
/// and the donor direction unless it is 0 or 4.
pub fn pack_form(meld: &Meld) -> String {
    let mut out = String::from("[");
    let mut suit_letter = None;
    for &tile in &meld.tiles {
        if let Some(piece) = group_piece(tile) {
            out.push_str(&piece);
        }
        if suit_letter.is_none() {
            if let TileClass::Suited { suit, .. } = tile.classify() {
                suit_letter = Some(suit.letter());
            }
        }
    }
    if let Some(letter) = suit_letter {
        out.push(letter);
    }
    if meld.direction > 0 && meld.direction != 4 {
        out.push(',');
        out.push_str(&meld.direction.to_string());
    }
    out.push(']');
    out
}

/// The full hand body: every pack, then the concealed tiles with the win
/// tile removed, then the win tile.
pub fn full_hand_form(hand: &[Tile], melds: &[Meld], win_tile: Tile, self_drawn: bool) -> String {
    let mut out = String::new();
    for meld in melds {
        if !meld.tiles.is_empty() {
            out.push_str(&pack_form(meld));
        }
    }

    let mut concealed: Vec<Tile> = hand.to_vec();
    if self_drawn {
        // The drawn win tile sits in the hand; pull it out so it can close
        // the string.
        if let Some(pos) = concealed.iter().position(|&t| t == win_tile) {
            concealed.remove(pos);
        }
    }
    concealed.sort();
    out.push_str(&group_form(&concealed));
    out.push_str(&tile_piece(win_tile));
    out
}

/// The 6-character environment flag: round wind, seat wind, then the
/// self-drawn / last-copy / sea-bottom / kong-rob bits.
pub fn env_flag(
    round_wind: Wind,
    seat_wind: Wind,
    self_drawn: bool,
    last_copy: bool,
    sea_bottom: bool,
    kong_rob: bool,
) -> String {
    let mut out = String::with_capacity(6);
    out.push(round_wind.letter());
    out.push(seat_wind.letter());
    for bit in [self_drawn, last_copy, sea_bottom, kong_rob] {
        out.push(if bit { '1' } else { '0' });
    }
    out
}

/// Flower segment: letters `a`..`h` when the specific tiles are known, the
/// bare count otherwise, empty for no flowers.
pub fn flower_segment(count: u8, flowers: &[Tile]) -> String {
    if count == 0 {
        return String::new();
    }
    if flowers.is_empty() {
        return count.to_string();
    }
    flowers
        .iter()
        .filter(|t| t.is_flower())
        .map(|t| ((b'a' + (t.index() - 136)) as char).to_string())
        .collect()
}

/// The complete scoring-backend input: body `|` env flag, plus `|` flowers
/// when present.
#[allow(clippy::too_many_arguments)]
pub fn scoring_string(
    hand: &[Tile],
    melds: &[Meld],
    win_tile: Tile,
    round_wind: Wind,
    seat_wind: Wind,
    self_drawn: bool,
    last_copy: bool,
    sea_bottom: bool,
    kong_rob: bool,
    flower_count: u8,
    flower_tiles: &[Tile],
) -> String {
    let mut out = full_hand_form(hand, melds, win_tile, self_drawn);
    out.push('|');
    out.push_str(&env_flag(
        round_wind, seat_wind, self_drawn, last_copy, sea_bottom, kong_rob,
    ));
    let flowers = flower_segment(flower_count, flower_tiles);
    if !flowers.is_empty() {
        out.push('|');
        out.push_str(&flowers);
    }
    out
}
