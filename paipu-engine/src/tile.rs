//! Tile identity and the packed wall index.
//!
//! A physical tile is a packed index in 0..144. Indices 0-135 are the 136
//! wall tiles: four copies of each of 34 kinds, laid out as characters
//! (0-8), bamboos (9-17), circles (18-26), then the seven honors (27-33).
//! Indices 136-143 are the eight flower tiles, one copy each. The kind is
//! `index >> 2`; the low two bits select the copy and travel with the tile
//! through the whole replay, so the same physical tile flows between hand,
//! meld, discard and flower zones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of distinct non-flower tile kinds.
pub const NUM_TILE_KINDS: usize = 34;

/// Number of non-flower tiles in the wall (34 kinds x 4 copies).
pub const NUM_WALL_TILES: usize = 136;

/// Number of flower tiles.
pub const NUM_FLOWERS: usize = 8;

/// Full wall buffer length, flowers included.
pub const WALL_LEN: usize = 144;

// Kind range starts.
pub const CHARACTER_START: u8 = 0;
pub const BAMBOO_START: u8 = 9;
pub const CIRCLE_START: u8 = 18;
pub const HONOR_START: u8 = 27;

// Named honor kinds.
pub const EAST: u8 = 27;
pub const SOUTH: u8 = 28;
pub const WEST: u8 = 29;
pub const NORTH: u8 = 30;
pub const RED_DRAGON: u8 = 31;
pub const GREEN_DRAGON: u8 = 32;
pub const WHITE_DRAGON: u8 = 33;

// ---------------------------------------------------------------------------
// Suit
// ---------------------------------------------------------------------------

/// The three numbered suits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suit {
    /// 万 -- letter `m`.
    Characters = 0,
    /// 条 -- letter `s`.
    Bamboos = 1,
    /// 饼 -- letter `p`.
    Circles = 2,
}

impl Suit {
    /// Starting kind index for this suit.
    #[inline]
    pub const fn start(self) -> u8 {
        match self {
            Suit::Characters => CHARACTER_START,
            Suit::Bamboos => BAMBOO_START,
            Suit::Circles => CIRCLE_START,
        }
    }

    /// The letter used in textual hand forms.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Suit::Characters => 'm',
            Suit::Bamboos => 's',
            Suit::Circles => 'p',
        }
    }
}

// ---------------------------------------------------------------------------
// TileKind newtype
// ---------------------------------------------------------------------------

/// A non-flower tile kind in 0..34. Wraps a `u8` for type safety.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileKind(u8);

impl TileKind {
    /// Creates a `TileKind` if `id` is in range 0..34.
    #[inline]
    pub const fn new(id: u8) -> Option<Self> {
        if id < NUM_TILE_KINDS as u8 {
            Some(TileKind(id))
        } else {
            None
        }
    }

    /// Raw numeric id (0-33).
    #[inline]
    pub const fn id(self) -> u8 {
        self.0
    }

    /// Which suit this kind belongs to, or `None` for honors.
    #[inline]
    pub const fn suit(self) -> Option<Suit> {
        match self.0 {
            0..=8 => Some(Suit::Characters),
            9..=17 => Some(Suit::Bamboos),
            18..=26 => Some(Suit::Circles),
            _ => None,
        }
    }

    /// 1-based number within the suit (1-9), or `None` for honors.
    #[inline]
    pub const fn number(self) -> Option<u8> {
        if self.0 < HONOR_START {
            Some((self.0 % 9) + 1)
        } else {
            None
        }
    }

    #[inline]
    pub const fn is_suited(self) -> bool {
        self.0 < HONOR_START
    }

    #[inline]
    pub const fn is_honor(self) -> bool {
        self.0 >= HONOR_START
    }

    /// True for the four wind kinds.
    #[inline]
    pub const fn is_wind(self) -> bool {
        self.0 >= EAST && self.0 <= NORTH
    }

    /// True for the three dragon kinds.
    #[inline]
    pub const fn is_dragon(self) -> bool {
        self.0 >= RED_DRAGON
    }

    /// True for 1 or 9 of any suit.
    #[inline]
    pub const fn is_terminal(self) -> bool {
        if self.0 >= HONOR_START {
            return false;
        }
        let num = self.0 % 9;
        num == 0 || num == 8
    }

    #[inline]
    pub const fn is_terminal_or_honor(self) -> bool {
        self.is_terminal() || self.is_honor()
    }

    /// Display label, e.g. `5m`, `E`, `B`.
    #[inline]
    pub fn label(self) -> &'static str {
        KIND_LABELS[self.0 as usize]
    }
}

impl fmt::Debug for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TileKind({}={})", self.0, self.label())
    }
}

impl fmt::Display for TileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Tile newtype
// ---------------------------------------------------------------------------

/// A tagged view of a packed tile index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileClass {
    Suited { suit: Suit, number: u8, copy: u8 },
    Honor { kind: u8, copy: u8 },
    Flower { kind: u8 },
}

/// A physical tile: packed wall index in 0..144.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tile(u8);

impl Tile {
    /// Creates a `Tile` if `index` is in range 0..144.
    #[inline]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < WALL_LEN {
            Some(Tile(index))
        } else {
            None
        }
    }

    /// Packed wall index (0-143).
    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[inline]
    pub const fn is_flower(self) -> bool {
        self.0 as usize >= NUM_WALL_TILES
    }

    /// The kind of a non-flower tile; `None` for flowers.
    #[inline]
    pub const fn kind(self) -> Option<TileKind> {
        if self.is_flower() {
            None
        } else {
            Some(TileKind(self.0 >> 2))
        }
    }

    /// Copy index within the kind (0-3); 0 for flowers.
    #[inline]
    pub const fn copy(self) -> u8 {
        if self.is_flower() {
            0
        } else {
            self.0 & 3
        }
    }

    /// True when both tiles share a kind. Flowers only match themselves.
    #[inline]
    pub const fn same_kind(self, other: Tile) -> bool {
        if self.is_flower() || other.is_flower() {
            self.0 == other.0
        } else {
            (self.0 >> 2) == (other.0 >> 2)
        }
    }

    /// Tagged variant view; the packed index stays at the I/O boundary.
    pub fn classify(self) -> TileClass {
        if self.is_flower() {
            return TileClass::Flower {
                kind: self.0 - NUM_WALL_TILES as u8,
            };
        }
        let kind = TileKind(self.0 >> 2);
        match (kind.suit(), kind.number()) {
            (Some(suit), Some(number)) => TileClass::Suited {
                suit,
                number,
                copy: self.copy(),
            },
            _ => TileClass::Honor {
                kind: kind.id() - HONOR_START,
                copy: self.copy(),
            },
        }
    }

    /// Display label: `1m`..`9p`, `E`..`B`, `1f`..`8f`.
    pub fn label(self) -> &'static str {
        if self.is_flower() {
            FLOWER_LABELS[(self.0 as usize) - NUM_WALL_TILES]
        } else {
            KIND_LABELS[(self.0 >> 2) as usize]
        }
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tile({}={})", self.0, self.label())
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Label tables
// ---------------------------------------------------------------------------

const KIND_LABELS: [&str; NUM_TILE_KINDS] = [
    "1m", "2m", "3m", "4m", "5m", "6m", "7m", "8m", "9m", "1s", "2s", "3s", "4s", "5s", "6s", "7s",
    "8s", "9s", "1p", "2p", "3p", "4p", "5p", "6p", "7p", "8p", "9p", "E", "S", "W", "N", "C", "F",
    "B",
];

const FLOWER_LABELS: [&str; NUM_FLOWERS] = ["1f", "2f", "3f", "4f", "5f", "6f", "7f", "8f"];

/// Honor letters used in scoring-backend strings. Note the white dragon is
/// `P` here but `B` in display labels.
pub const HONOR_SCORING_LETTERS: [char; 7] = ['E', 'S', 'W', 'N', 'C', 'F', 'P'];

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
