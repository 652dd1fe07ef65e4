//! Wall ring, dice rotation, and the opening deal.

use tracing::warn;

use crate::state::{GameState, NUM_SEATS};
use crate::tile::{Tile, WALL_LEN};

/// The rotated wall with its two draw pointers. The front pointer advances
/// on normal draws; the back pointer advances (downward) on flower and
/// kong replacement draws. `front > back` is the sea-bottom terminal.
#[derive(Debug, Clone)]
pub struct WallRing {
    pub tiles: Vec<Tile>,
    pub front: usize,
    pub back: usize,
}

impl Default for WallRing {
    fn default() -> Self {
        WallRing {
            tiles: Vec::new(),
            front: 0,
            back: 0,
        }
    }
}

impl WallRing {
    /// Builds the ring as a rotation of `buffer` starting at `start`.
    pub fn rotated(buffer: &[Tile], start: usize) -> Self {
        let mut tiles = Vec::with_capacity(buffer.len());
        tiles.extend_from_slice(&buffer[start..]);
        tiles.extend_from_slice(&buffer[..start]);
        let back = tiles.len().saturating_sub(1);
        WallRing {
            tiles,
            front: 0,
            back,
        }
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.front > self.back
    }

    /// The undealt segment, empty once exhausted.
    pub fn undealt(&self) -> &[Tile] {
        if self.is_exhausted() {
            &[]
        } else {
            &self.tiles[self.front..=self.back]
        }
    }

    /// Takes the next tile off the front (deal path only).
    fn deal_front(&mut self) -> Option<Tile> {
        if self.is_exhausted() {
            return None;
        }
        let tile = self.tiles[self.front];
        self.front += 1;
        Some(tile)
    }

    /// Advances the front pointer for a normal draw.
    pub fn advance_front(&mut self) {
        if self.is_exhausted() {
            warn!(front = self.front, back = self.back, "front draw past sea bottom");
            return;
        }
        self.front += 1;
    }

    /// Advances the back pointer for a replacement draw.
    pub fn advance_back(&mut self) {
        if self.is_exhausted() || self.back == 0 {
            warn!(front = self.front, back = self.back, "back draw past sea bottom");
            return;
        }
        self.back -= 1;
    }
}

impl GameState {
    /// Rotates the wall from the dice and deals the opening hands.
    ///
    /// The break position and starting offset follow the table protocol:
    /// `break = (dealer - (d0 + d1 - 1) + 12) mod 4`, offset
    /// `(break * 36 + 2 * (d0 + d1 + d2 + d3)) mod 144`. Dealing is three
    /// rounds of four-tile blocks, one more tile each, then the dealer's
    /// extra tile; hands end sorted and snapshotted.
    pub fn setup_wall_and_deal(&mut self, buffer: &[Tile], dice: [u8; 4], dealer: u8) {
        debug_assert_eq!(buffer.len(), WALL_LEN);
        self.dealer = dealer & 3;

        let d: [i32; 4] = [
            dice[0] as i32,
            dice[1] as i32,
            dice[2] as i32,
            dice[3] as i32,
        ];
        let break_pos = (self.dealer as i32 - (d[0] + d[1] - 1) + 12).rem_euclid(4) as usize;
        let start = (break_pos * 36 + 2 * (d[0] + d[1] + d[2] + d[3]) as usize) % buffer.len();

        self.wall = WallRing::rotated(buffer, start);

        self.deal_initial_tiles();
        self.current_seat = Some(self.dealer);
    }

    fn deal_initial_tiles(&mut self) {
        let dealer = self.dealer as usize;

        // Three rounds of four-tile blocks.
        for _ in 0..3 {
            for offset in 0..NUM_SEATS {
                let seat = (dealer + offset) % NUM_SEATS;
                for _ in 0..4 {
                    if let Some(tile) = self.wall.deal_front() {
                        self.seats[seat].hand.push(tile);
                    }
                }
            }
        }

        // One more tile each.
        for offset in 0..NUM_SEATS {
            let seat = (dealer + offset) % NUM_SEATS;
            if let Some(tile) = self.wall.deal_front() {
                self.seats[seat].hand.push(tile);
            }
        }

        // The dealer's fourteenth.
        if let Some(tile) = self.wall.deal_front() {
            self.seats[dealer].hand.push(tile);
        }

        for seat in &mut self.seats {
            seat.hand.sort();
            seat.initial_hand = seat.hand.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_buffer() -> Vec<Tile> {
        (0..WALL_LEN as u8).map(|i| Tile::new(i).unwrap()).collect()
    }

    #[test]
    fn rotation_from_dice() {
        let mut state = GameState::new();
        state.setup_wall_and_deal(&identity_buffer(), [1, 1, 1, 1], 0);
        // break = (0 - 1 + 12) % 4 = 3, start = (108 + 8) % 144 = 116.
        assert_eq!(state.wall.tiles[0].index(), 116);
        assert_eq!(state.wall.tiles[27].index(), 143);
        assert_eq!(state.wall.tiles[28].index(), 0);
    }

    #[test]
    fn deal_counts_and_pointers() {
        let mut state = GameState::new();
        state.setup_wall_and_deal(&identity_buffer(), [1, 1, 1, 1], 0);
        assert_eq!(state.seat(0).hand.len(), 14);
        for seat in 1..4 {
            assert_eq!(state.seat(seat).hand.len(), 13);
        }
        assert_eq!(state.wall.front, 53);
        assert_eq!(state.wall.back, 143);
        assert_eq!(state.current_seat, Some(0));
        // Hands are sorted and snapshotted.
        for seat in 0..4 {
            let hand = &state.seat(seat).hand;
            assert!(hand.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(hand, &state.seat(seat).initial_hand);
        }
    }

    #[test]
    fn dealer_rotation_shifts_block_order() {
        let mut state = GameState::new();
        state.setup_wall_and_deal(&identity_buffer(), [2, 3, 1, 4], 1);
        // Seat 1 deals first and takes the extra tile.
        assert_eq!(state.seat(1).hand.len(), 14);
        assert_eq!(state.seat(0).hand.len(), 13);
        assert_eq!(state.current_seat, Some(1));
    }

    #[test]
    fn exhaustion_flags() {
        let mut ring = WallRing::rotated(&identity_buffer(), 0);
        ring.front = 143;
        ring.back = 143;
        assert!(!ring.is_exhausted());
        ring.advance_front();
        assert!(ring.is_exhausted());
        assert!(ring.undealt().is_empty());
        // Further advances are anomalies, not panics.
        ring.advance_front();
        ring.advance_back();
        assert_eq!(ring.front, 144);
        assert_eq!(ring.back, 143);
    }
}
