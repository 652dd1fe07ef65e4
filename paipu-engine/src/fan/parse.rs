//! Parser for the canonical full-hand string.
//!
//! Grammar: `body|envflag(|flowers)`. The body is a sequence of bracketed
//! packs and free tile groups; the last free tile is the win tile.

use std::fmt;

use crate::tile::{TileKind, BAMBOO_START, CHARACTER_START, CIRCLE_START, HONOR_START};
use crate::types::MeldKind;

#[derive(Debug)]
pub struct HandParseError {
    pub input: String,
    pub message: String,
}

impl fmt::Display for HandParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hand parse error on '{}': {}", self.input, self.message)
    }
}

impl std::error::Error for HandParseError {}

/// One exposed pack as seen by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandMeld {
    pub kind: MeldKind,
    /// Lowest kind of a chow; the shared kind of a pung or kong.
    pub base: TileKind,
    /// Direction annotation from the string; absent reads as 0.
    pub direction: u8,
}

impl HandMeld {
    /// A kong with no claim direction is concealed.
    #[inline]
    pub fn is_concealed_kong(self) -> bool {
        self.kind == MeldKind::Kong && self.direction == 0
    }

    /// True for packs that expose the hand (anything but a concealed kong).
    #[inline]
    pub fn is_exposing(self) -> bool {
        !self.is_concealed_kong()
    }
}

/// The decoded 6-character environment flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvInfo {
    pub round_wind: u8,
    pub seat_wind: u8,
    pub self_drawn: bool,
    pub last_copy: bool,
    pub sea_bottom: bool,
    pub kong_rob: bool,
}

#[derive(Debug, Clone)]
pub struct ParsedHand {
    pub melds: Vec<HandMeld>,
    /// Concealed kinds excluding the win tile, in string order.
    pub concealed: Vec<TileKind>,
    pub win_tile: TileKind,
    pub env: EnvInfo,
    pub flower_count: u8,
}

impl ParsedHand {
    /// Counts of the concealed tiles plus the win tile.
    pub fn concealed_counts(&self) -> [u8; 34] {
        let mut counts = [0u8; 34];
        for k in &self.concealed {
            counts[k.id() as usize] += 1;
        }
        counts[self.win_tile.id() as usize] += 1;
        counts
    }

    /// Counts of every tile in the hand, meld tiles included (kongs
    /// contribute four copies).
    pub fn all_counts(&self) -> [u8; 34] {
        let mut counts = self.concealed_counts();
        for meld in &self.melds {
            match meld.kind {
                MeldKind::Chow => {
                    for offset in 0..3 {
                        counts[(meld.base.id() + offset) as usize] += 1;
                    }
                }
                MeldKind::Pung => counts[meld.base.id() as usize] += 3,
                MeldKind::Kong => counts[meld.base.id() as usize] += 4,
            }
        }
        counts
    }
}

fn err(input: &str, message: impl Into<String>) -> HandParseError {
    HandParseError {
        input: input.to_string(),
        message: message.into(),
    }
}

fn honor_kind(c: char) -> Option<TileKind> {
    let offset = match c {
        'E' => 0,
        'S' => 1,
        'W' => 2,
        'N' => 3,
        'C' => 4,
        'F' => 5,
        'P' => 6,
        _ => return None,
    };
    TileKind::new(HONOR_START + offset)
}

fn suit_start(c: char) -> Option<u8> {
    match c {
        'm' => Some(CHARACTER_START),
        's' => Some(BAMBOO_START),
        'p' => Some(CIRCLE_START),
        _ => None,
    }
}

/// Parses free tiles and bracketed packs from the body section.
fn parse_body(
    input: &str,
    body: &str,
) -> Result<(Vec<HandMeld>, Vec<TileKind>), HandParseError> {
    let mut melds = Vec::new();
    let mut tiles: Vec<TileKind> = Vec::new();
    let mut pending: Vec<u8> = Vec::new();

    let mut chars = body.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c == '[' {
            if !pending.is_empty() {
                return Err(err(input, "digits without a suit before a pack"));
            }
            chars.next();
            let mut content = String::new();
            loop {
                match chars.next() {
                    Some(']') => break,
                    Some(inner) => content.push(inner),
                    None => return Err(err(input, "unterminated pack bracket")),
                }
            }
            melds.push(parse_pack(input, &content)?);
        } else if c.is_ascii_digit() {
            chars.next();
            pending.push(c.to_digit(10).unwrap() as u8);
        } else if let Some(start) = suit_start(c) {
            chars.next();
            if pending.is_empty() {
                return Err(err(input, format!("suit '{}' with no digits", c)));
            }
            for digit in pending.drain(..) {
                if !(1..=9).contains(&digit) {
                    return Err(err(input, format!("digit {} out of range", digit)));
                }
                tiles.push(TileKind::new(start + digit - 1).unwrap());
            }
        } else if let Some(kind) = honor_kind(c) {
            chars.next();
            tiles.push(kind);
        } else if c.is_whitespace() {
            chars.next();
        } else {
            return Err(err(input, format!("unexpected character '{}'", c)));
        }
    }
    if !pending.is_empty() {
        return Err(err(input, "trailing digits without a suit"));
    }
    Ok((melds, tiles))
}

fn parse_pack(input: &str, content: &str) -> Result<HandMeld, HandParseError> {
    let (tiles_part, direction) = match content.split_once(',') {
        Some((t, d)) => {
            let dir: u8 = d
                .trim()
                .parse()
                .map_err(|_| err(input, format!("bad pack direction '{}'", d)))?;
            (t, dir)
        }
        None => (content, 0),
    };

    let mut kinds: Vec<TileKind> = Vec::new();
    let mut pending: Vec<u8> = Vec::new();
    for c in tiles_part.chars() {
        if c.is_ascii_digit() {
            pending.push(c.to_digit(10).unwrap() as u8);
        } else if let Some(start) = suit_start(c) {
            for digit in pending.drain(..) {
                if !(1..=9).contains(&digit) {
                    return Err(err(input, format!("digit {} out of range in pack", digit)));
                }
                kinds.push(TileKind::new(start + digit - 1).unwrap());
            }
        } else if let Some(kind) = honor_kind(c) {
            kinds.push(kind);
        } else if !c.is_whitespace() {
            return Err(err(input, format!("unexpected pack character '{}'", c)));
        }
    }
    if !pending.is_empty() {
        return Err(err(input, "pack digits without a suit"));
    }

    kinds.sort();
    match kinds.len() {
        3 => {
            if kinds[0] == kinds[1] && kinds[1] == kinds[2] {
                Ok(HandMeld {
                    kind: MeldKind::Pung,
                    base: kinds[0],
                    direction,
                })
            } else if kinds[0].is_suited()
                && kinds[1].id() == kinds[0].id() + 1
                && kinds[2].id() == kinds[0].id() + 2
                && kinds[2].suit() == kinds[0].suit()
            {
                Ok(HandMeld {
                    kind: MeldKind::Chow,
                    base: kinds[0],
                    direction,
                })
            } else {
                Err(err(input, "pack is neither a chow nor a pung"))
            }
        }
        4 => {
            if kinds.iter().all(|&k| k == kinds[0]) {
                Ok(HandMeld {
                    kind: MeldKind::Kong,
                    base: kinds[0],
                    direction,
                })
            } else {
                Err(err(input, "four-tile pack is not a kong"))
            }
        }
        n => Err(err(input, format!("pack has {} tiles", n))),
    }
}

fn parse_env(input: &str, env: &str) -> Result<EnvInfo, HandParseError> {
    let chars: Vec<char> = env.trim().chars().collect();
    if chars.len() < 6 {
        return Err(err(input, "environment flag shorter than 6 characters"));
    }
    let wind = |c: char| -> Result<u8, HandParseError> {
        match c {
            'E' => Ok(0),
            'S' => Ok(1),
            'W' => Ok(2),
            'N' => Ok(3),
            _ => Err(err(input, format!("bad wind letter '{}'", c))),
        }
    };
    let bit = |c: char| c == '1';
    Ok(EnvInfo {
        round_wind: wind(chars[0])?,
        seat_wind: wind(chars[1])?,
        self_drawn: bit(chars[2]),
        last_copy: bit(chars[3]),
        sea_bottom: bit(chars[4]),
        kong_rob: bit(chars[5]),
    })
}

fn parse_flowers(segment: &str) -> u8 {
    let trimmed = segment.trim();
    if trimmed.chars().all(|c| c.is_ascii_digit()) && !trimmed.is_empty() {
        trimmed.parse().unwrap_or(0)
    } else {
        trimmed.chars().filter(|c| ('a'..='h').contains(c)).count() as u8
    }
}

/// Parses a complete scoring string.
pub fn parse_hand(text: &str) -> Result<ParsedHand, HandParseError> {
    let mut sections = text.split('|');
    let body = sections.next().unwrap_or("");
    let env = match sections.next() {
        Some(e) => parse_env(text, e)?,
        None => EnvInfo::default(),
    };
    let flower_count = sections.next().map(parse_flowers).unwrap_or(0);

    let (melds, mut tiles) = parse_body(text, body)?;
    let win_tile = tiles
        .pop()
        .ok_or_else(|| err(text, "no free tiles: win tile missing"))?;

    let expected = 14usize;
    let have = melds.len() * 3 + tiles.len() + 1;
    if have != expected {
        return Err(err(
            text,
            format!("hand holds {} effective tiles, expected {}", have, expected),
        ));
    }

    let hand = ParsedHand {
        melds,
        concealed: tiles,
        win_tile,
        env,
        flower_count,
    };

    // No kind may exceed its wall multiplicity.
    for (kind, &count) in hand.all_counts().iter().enumerate() {
        if count > 4 {
            return Err(err(text, format!("kind {} appears {} times", kind, count)));
        }
    }
    Ok(hand)
}
