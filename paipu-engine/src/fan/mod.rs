//! The fan scoring backend.
//!
//! Consumes the canonical full-hand string produced by [`crate::format`]
//! and independently enumerates the winning hand's fan patterns. The core
//! pipeline only builds the input string and compares totals; everything
//! in here is the delegated scoring library.

mod decompose;
mod parse;
mod patterns;

pub use parse::{parse_hand, EnvInfo, HandMeld, HandParseError, ParsedHand};
pub use patterns::{evaluate, Fan, FanTally};

use crate::types::ScoredFan;

/// Parses a scoring string and evaluates it in one step. `None` when the
/// string does not describe a winning hand.
pub fn score_hand(text: &str) -> Result<Option<FanTally>, HandParseError> {
    let hand = parse_hand(text)?;
    Ok(evaluate(&hand))
}

impl FanTally {
    /// Per-pattern summary in report form.
    pub fn summary(&self) -> Vec<ScoredFan> {
        self.fans
            .iter()
            .map(|&(fan, count)| ScoredFan {
                name: fan.name().to_string(),
                points: fan.points(),
                count,
            })
            .collect()
    }
}
