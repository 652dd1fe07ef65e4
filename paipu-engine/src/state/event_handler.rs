//! Applies decoded actions to the game state.
//!
//! This is the only mutation path during a replay. Invariant violations in
//! real records (a missing tile, an empty donor pile) are logged with
//! context and skipped; the replay keeps going, matching the platform's
//! own tolerance for spurious bytes.

use tracing::warn;

use crate::action::{self, ActionKind, KongForm, RawAction};
use crate::state::{GameState, NUM_SEATS};
use crate::tile::{Tile, TileKind};
use crate::types::{Meld, MeldKind};

pub trait RecordEventHandler {
    fn apply_action(&mut self, action: &RawAction);
}

impl RecordEventHandler for GameState {
    fn apply_action(&mut self, action: &RawAction) {
        let seat = (action.seat & 3) as usize;
        match action.action_kind() {
            Some(ActionKind::RoundBegin) => {}
            Some(ActionKind::FlowerReplace) => self.apply_flower(seat, action),
            Some(ActionKind::Discard) => self.apply_discard(seat, action),
            Some(ActionKind::Chow) => self.apply_chow(seat, action),
            Some(ActionKind::Pung) => self.apply_pung(seat, action),
            Some(ActionKind::Kong) => self.apply_kong(seat, action),
            Some(ActionKind::DeclareWin) => {
                self.current_seat = Some(seat as u8);
                self.last_action_was_kong = false;
            }
            Some(ActionKind::Draw) => self.apply_draw(seat, action),
            Some(ActionKind::Pass) | Some(ActionKind::Abandon) => {}
            None => {
                warn!(seat, kind = action.kind, "unknown action kind, skipped");
            }
        }
        self.seats[seat].hand.sort();
    }
}

impl GameState {
    fn apply_flower(&mut self, seat: usize, action: &RawAction) {
        let Some(flower) = action::decode_flower(action.data) else {
            warn!(seat, data = action.data, "undecodable flower replacement");
            return;
        };
        self.seats[seat].flower_count += 1;
        self.seats[seat].flower_tiles.push(flower.flower);
        self.remove_exact(seat, flower.flower);
        self.seats[seat].hand.push(flower.replacement);
        self.seats[seat].last_draw = Some(flower.replacement);
    }

    fn apply_discard(&mut self, seat: usize, action: &RawAction) {
        let Some(discard) = action::decode_discard(action.data) else {
            warn!(seat, data = action.data, "undecodable discard");
            return;
        };
        self.current_seat = Some(seat as u8);
        self.remove_exact(seat, discard.tile);
        self.seats[seat].discards.push(discard.tile);
        self.last_discard = Some((seat as u8, discard.tile));
        self.last_action_was_kong = false;
        self.last_action_was_add_kong = false;
    }

    fn apply_chow(&mut self, seat: usize, action: &RawAction) {
        self.current_seat = Some(seat as u8);
        let Some(chow) = action::decode_chow(action.data) else {
            return; // cancelled claim
        };
        let Some((_, offer_tile)) = self.last_discard else {
            warn!(seat, "chow with no discard on the table");
            return;
        };
        let Some(tiles) = chow.tiles(offer_tile) else {
            warn!(seat, data = action.data, "chow tiles out of range");
            return;
        };

        // The slot matching the discard by kind is the claimed one; the
        // other two leave the hand.
        let offer_seq = tiles
            .iter()
            .position(|t| t.same_kind(offer_tile))
            .unwrap_or(0);
        for (slot, tile) in tiles.iter().enumerate() {
            if slot != offer_seq {
                if let Some(kind) = tile.kind() {
                    self.remove_copies(seat, kind, 1);
                }
            }
        }

        self.seats[seat].melds.push(Meld {
            kind: MeldKind::Chow,
            tiles: tiles.to_vec(),
            direction: chow.direction,
            offer_seq,
        });
        self.pop_donor_discard(seat, chow.direction);
    }

    fn apply_pung(&mut self, seat: usize, action: &RawAction) {
        let Some(pung) = action::decode_pung(action.data) else {
            return; // cancelled claim
        };
        self.current_seat = Some(seat as u8);
        let Some(kind) = pung.tile.kind() else {
            warn!(seat, data = action.data, "pung on a flower index");
            return;
        };
        self.remove_copies(seat, kind, 2);
        self.seats[seat].melds.push(Meld {
            kind: MeldKind::Pung,
            tiles: vec![pung.tile; 3],
            direction: pung.direction,
            offer_seq: 0,
        });
        self.pop_donor_discard(seat, pung.direction);
    }

    fn apply_kong(&mut self, seat: usize, action: &RawAction) {
        let Some(kong) = action::decode_kong(action.data) else {
            return; // cancelled claim
        };
        self.current_seat = Some(seat as u8);
        self.last_action_was_kong = true;
        let Some(kind) = kong.tile.kind() else {
            warn!(seat, data = action.data, "kong on a flower index");
            return;
        };

        match kong.form {
            KongForm::Added => {
                self.remove_copies(seat, kind, 1);
                // The fourth tile is exposed like a discard so a rob can
                // claim it.
                self.last_discard = Some((seat as u8, kong.tile));
                self.last_action_was_add_kong = true;

                let upgraded = self.seats[seat].melds.iter_mut().find(|m| {
                    m.kind == MeldKind::Pung && m.base_kind() == Some(kind)
                });
                match upgraded {
                    Some(meld) => {
                        meld.kind = MeldKind::Kong;
                        meld.tiles.push(kong.tile);
                        meld.direction += 5;
                    }
                    None => {
                        warn!(seat, kind = kind.id(), "added kong found no pung to upgrade");
                    }
                }
            }
            KongForm::Concealed => {
                self.remove_copies(seat, kind, 4);
                self.seats[seat].melds.push(Meld {
                    kind: MeldKind::Kong,
                    tiles: vec![kong.tile; 4],
                    direction: 0,
                    offer_seq: 0,
                });
            }
            KongForm::Melded => {
                self.remove_copies(seat, kind, 3);
                self.seats[seat].melds.push(Meld {
                    kind: MeldKind::Kong,
                    tiles: vec![kong.tile; 4],
                    direction: kong.direction,
                    offer_seq: 0,
                });
                self.pop_donor_discard(seat, kong.direction);
            }
        }
    }

    fn apply_draw(&mut self, seat: usize, action: &RawAction) {
        let Some(draw) = action::decode_draw(action.data) else {
            warn!(seat, data = action.data, "undecodable draw");
            return;
        };
        self.current_seat = Some(seat as u8);
        self.seats[seat].hand.push(draw.tile);
        self.seats[seat].last_draw = Some(draw.tile);
    }

    /// Removes the exact tile instance; a miss is an anomaly, not an abort.
    fn remove_exact(&mut self, seat: usize, tile: Tile) {
        let hand = &mut self.seats[seat].hand;
        match hand.iter().position(|&t| t == tile) {
            Some(pos) => {
                hand.remove(pos);
            }
            None => {
                warn!(seat, tile = tile.index(), "tile to remove not in hand");
            }
        }
    }

    /// Removes up to `count` tiles of `kind` (any copy).
    fn remove_copies(&mut self, seat: usize, kind: TileKind, count: usize) {
        let hand = &mut self.seats[seat].hand;
        let mut removed = 0;
        hand.retain(|t| {
            if removed < count && t.kind() == Some(kind) {
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed < count {
            warn!(
                seat,
                kind = kind.id(),
                wanted = count,
                removed,
                "fewer copies in hand than the claim encodes"
            );
        }
    }

    /// Pops the claimed tile off the donor's discard pile. An empty pile is
    /// tolerated.
    fn pop_donor_discard(&mut self, seat: usize, direction: u8) {
        let donor = (seat + direction as usize) % NUM_SEATS;
        if self.seats[donor].discards.pop().is_none() {
            warn!(seat, donor, "donor discard pile already empty");
        }
    }
}
