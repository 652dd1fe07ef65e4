//! The authoritative mutable replay state.
//!
//! All state is created fresh per record; the action processor in
//! [`event_handler`] is the only mutator, observers read only.

use crate::tile::{Tile, TileKind, NUM_TILE_KINDS};
use crate::types::Meld;

pub mod event_handler;
pub mod wall;

pub use wall::WallRing;

pub const NUM_SEATS: usize = 4;

/// Insert `tile` into a sorted hand, maintaining sort order.
#[inline]
pub fn sorted_insert(hand: &mut Vec<Tile>, tile: Tile) {
    let pos = hand.partition_point(|&t| t < tile);
    hand.insert(pos, tile);
}

/// Everything one seat owns during a replay.
#[derive(Debug, Clone, Default)]
pub struct SeatState {
    /// Concealed tiles, kept sorted ascending by packed index.
    pub hand: Vec<Tile>,
    pub melds: Vec<Meld>,
    /// Append-only, except the tail pops when the discard is claimed.
    pub discards: Vec<Tile>,
    pub flower_count: u8,
    pub flower_tiles: Vec<Tile>,
    /// Snapshot right after the deal.
    pub initial_hand: Vec<Tile>,
    pub last_draw: Option<Tile>,
}

impl SeatState {
    fn clear(&mut self) {
        self.hand.clear();
        self.melds.clear();
        self.discards.clear();
        self.flower_count = 0;
        self.flower_tiles.clear();
        self.initial_hand.clear();
        self.last_draw = None;
    }
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub seats: [SeatState; NUM_SEATS],
    pub wall: WallRing,
    pub current_seat: Option<u8>,
    pub dealer: u8,
    /// Most recent discard globally: `(seat, tile)`.
    pub last_discard: Option<(u8, Tile)>,
    pub last_action_was_kong: bool,
    pub last_action_was_add_kong: bool,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    pub fn new() -> Self {
        GameState {
            seats: Default::default(),
            wall: WallRing::default(),
            current_seat: None,
            dealer: 0,
            last_discard: None,
            last_action_was_kong: false,
            last_action_was_add_kong: false,
        }
    }

    /// Clears every per-seat field, the wall, and all latches.
    pub fn reset(&mut self) {
        for seat in &mut self.seats {
            seat.clear();
        }
        self.wall = WallRing::default();
        self.current_seat = None;
        self.dealer = 0;
        self.last_discard = None;
        self.last_action_was_kong = false;
        self.last_action_was_add_kong = false;
    }

    #[inline]
    pub fn seat(&self, seat: usize) -> &SeatState {
        &self.seats[seat & 3]
    }

    #[inline]
    pub fn seat_mut(&mut self, seat: usize) -> &mut SeatState {
        &mut self.seats[seat & 3]
    }

    pub fn last_discard_tile(&self) -> Option<Tile> {
        self.last_discard.map(|(_, t)| t)
    }

    pub fn last_discard_seat(&self) -> Option<u8> {
        self.last_discard.map(|(s, _)| s)
    }

    /// Per-kind count of every visible or owned non-flower tile: hands,
    /// melds, discards, and the undealt wall segment. Conservation against
    /// the wall multiplicity (4 per kind) is a replay invariant.
    pub fn kind_census(&self) -> [u8; NUM_TILE_KINDS] {
        let mut census = [0u8; NUM_TILE_KINDS];
        let mut bump = |tile: Tile| {
            if let Some(kind) = tile.kind() {
                census[kind.id() as usize] += 1;
            }
        };
        for seat in &self.seats {
            for &t in &seat.hand {
                bump(t);
            }
            for meld in &seat.melds {
                for &t in &meld.tiles {
                    bump(t);
                }
            }
            for &t in &seat.discards {
                bump(t);
            }
        }
        for &t in self.wall.undealt() {
            bump(t);
        }
        census
    }

    /// Count of exposed copies of `kind` across all melds and discards.
    pub fn exposed_copies(&self, kind: TileKind) -> u8 {
        let mut count = 0;
        for seat in &self.seats {
            for meld in &seat.melds {
                for &t in &meld.tiles {
                    if t.kind() == Some(kind) {
                        count += 1;
                    }
                }
            }
            for &t in &seat.discards {
                if t.kind() == Some(kind) {
                    count += 1;
                }
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_insert_keeps_order() {
        let t = |i: u8| Tile::new(i).unwrap();
        let mut hand = vec![t(4), t(9), t(40)];
        sorted_insert(&mut hand, t(10));
        sorted_insert(&mut hand, t(0));
        sorted_insert(&mut hand, t(143));
        let indices: Vec<u8> = hand.iter().map(|t| t.index()).collect();
        assert_eq!(indices, vec![0, 4, 9, 10, 40, 143]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut state = GameState::new();
        state.seat_mut(0).hand.push(Tile::new(3).unwrap());
        state.seat_mut(2).flower_count = 2;
        state.last_discard = Some((1, Tile::new(8).unwrap()));
        state.last_action_was_kong = true;
        state.last_action_was_add_kong = true;
        state.current_seat = Some(1);

        state.reset();

        assert!(state.seat(0).hand.is_empty());
        assert_eq!(state.seat(2).flower_count, 0);
        assert_eq!(state.last_discard, None);
        assert!(!state.last_action_was_kong);
        assert!(!state.last_action_was_add_kong);
        assert_eq!(state.current_seat, None);
    }
}
