//! Fan pattern enumeration.
//!
//! Every candidate winning shape is scored independently and the best
//! total wins. Exclusions follow the principal combination rules: when a
//! pattern fires it suppresses the patterns it implies.

use std::collections::BTreeSet;

use crate::fan::decompose::{
    self, Block, Decomposition,
};
use crate::fan::parse::{EnvInfo, HandMeld, ParsedHand};
use crate::tile::{TileKind, EAST, GREEN_DRAGON, HONOR_START, NUM_TILE_KINDS};
use crate::types::MeldKind;

// ---------------------------------------------------------------------------
// Fan table
// ---------------------------------------------------------------------------

macro_rules! fans {
    ($(($variant:ident, $name:literal, $points:literal),)+) => {
        /// The national-standard pattern list.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Fan {
            $($variant,)+
        }

        impl Fan {
            pub fn name(self) -> &'static str {
                match self {
                    $(Fan::$variant => $name,)+
                }
            }

            pub fn points(self) -> u32 {
                match self {
                    $(Fan::$variant => $points,)+
                }
            }
        }
    };
}

fans! {
    (BigFourWinds, "大四喜", 88),
    (BigThreeDragons, "大三元", 88),
    (AllGreen, "绿一色", 88),
    (NineGates, "九莲宝灯", 88),
    (FourKongs, "四杠", 88),
    (SevenShiftedPairs, "连七对", 88),
    (ThirteenOrphans, "十三幺", 88),
    (AllTerminals, "清幺九", 64),
    (LittleFourWinds, "小四喜", 64),
    (LittleThreeDragons, "小三元", 64),
    (AllHonors, "字一色", 64),
    (FourConcealedPungs, "四暗刻", 64),
    (PureTerminalChows, "一色双龙会", 64),
    (QuadrupleChow, "一色四同顺", 48),
    (FourPureShiftedPungs, "一色四节高", 48),
    (FourPureShiftedChows, "一色四步高", 32),
    (ThreeKongs, "三杠", 32),
    (AllTerminalsAndHonors, "混幺九", 32),
    (SevenPairs, "七对", 24),
    (GreaterKnitted, "七星不靠", 24),
    (AllEvenPungs, "全双刻", 24),
    (FullFlush, "清一色", 24),
    (PureTripleChow, "一色三同顺", 24),
    (PureShiftedPungs, "一色三节高", 24),
    (UpperTiles, "全大", 24),
    (MiddleTiles, "全中", 24),
    (LowerTiles, "全小", 24),
    (PureStraight, "清龙", 16),
    (ThreeSuitedTerminalChows, "三色双龙会", 16),
    (PureShiftedChows, "一色三步高", 16),
    (AllFives, "全带五", 16),
    (TriplePung, "三同刻", 16),
    (ThreeConcealedPungs, "三暗刻", 16),
    (LesserKnitted, "全不靠", 12),
    (KnittedStraight, "组合龙", 12),
    (UpperFour, "大于五", 12),
    (LowerFour, "小于五", 12),
    (BigThreeWinds, "三风刻", 12),
    (MixedStraight, "花龙", 8),
    (ReversibleTiles, "推不倒", 8),
    (MixedTripleChow, "三色三同顺", 8),
    (MixedShiftedPungs, "三色三节高", 8),
    (ChickenHand, "无番和", 8),
    (LastTileDraw, "妙手回春", 8),
    (LastTileClaim, "海底捞月", 8),
    (RobbingTheKong, "抢杠和", 8),
    (AllPungs, "碰碰和", 6),
    (HalfFlush, "混一色", 6),
    (MixedShiftedChows, "三色三步高", 6),
    (AllTypes, "五门齐", 6),
    (MeldedHand, "全求人", 6),
    (TwoConcealedKongs, "双暗杠", 6),
    (TwoDragonPungs, "双箭刻", 6),
    (OutsideHand, "全带幺", 4),
    (FullyConcealedHand, "不求人", 4),
    (TwoMeldedKongs, "双明杠", 4),
    (LastTile, "和绝张", 4),
    (DragonPung, "箭刻", 2),
    (PrevalentWind, "圈风刻", 2),
    (SeatWind, "门风刻", 2),
    (ConcealedHand, "门前清", 2),
    (AllChows, "平和", 2),
    (TileHog, "四归一", 2),
    (DoublePung, "双同刻", 2),
    (TwoConcealedPungs, "双暗刻", 2),
    (ConcealedKong, "暗杠", 2),
    (AllSimples, "断幺", 2),
    (PureDoubleChow, "一般高", 1),
    (MixedDoubleChow, "喜相逢", 1),
    (ShortStraight, "连六", 1),
    (TwoTerminalChows, "老少副", 1),
    (PungOfTerminalsOrHonors, "幺九刻", 1),
    (MeldedKong, "明杠", 1),
    (OneVoidedSuit, "缺一门", 1),
    (NoHonors, "无字", 1),
    (EdgeWait, "边张", 1),
    (ClosedWait, "坎张", 1),
    (SingleWait, "单钓将", 1),
    (SelfDrawn, "自摸", 1),
    (FlowerTiles, "花牌", 1),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanTally {
    pub total: u32,
    pub fans: Vec<(Fan, u32)>,
}

// ---------------------------------------------------------------------------
// Tally builder with suppression
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tally {
    fans: Vec<(Fan, u32)>,
    suppressed: BTreeSet<Fan>,
}

impl Tally {
    fn add(&mut self, fan: Fan) {
        self.add_count(fan, 1);
    }

    fn add_count(&mut self, fan: Fan, count: u32) {
        if count == 0 || self.suppressed.contains(&fan) {
            return;
        }
        if let Some(entry) = self.fans.iter_mut().find(|(f, _)| *f == fan) {
            entry.1 += count;
        } else {
            self.fans.push((fan, count));
        }
    }

    /// Blocks future adds of `fans` and drops any already counted.
    fn suppress(&mut self, fans: &[Fan]) {
        for &fan in fans {
            self.suppressed.insert(fan);
            self.fans.retain(|&(f, _)| f != fan);
        }
    }

    fn has(&self, fan: Fan) -> bool {
        self.fans.iter().any(|(f, _)| *f == fan)
    }

    fn finish(mut self, flower_count: u8) -> FanTally {
        if self.fans.is_empty() {
            self.fans.push((Fan::ChickenHand, 1));
        }
        if flower_count > 0 {
            self.fans.push((Fan::FlowerTiles, flower_count as u32));
        }
        let total = self
            .fans
            .iter()
            .map(|(f, c)| f.points() * c)
            .sum();
        FanTally {
            total,
            fans: self.fans,
        }
    }
}

// ---------------------------------------------------------------------------
// Set view of a candidate decomposition
// ---------------------------------------------------------------------------

/// One of the four sets of a standard hand, meld or concealed block.
#[derive(Debug, Clone, Copy)]
struct SetInfo {
    /// Lowest kind for a chow, shared kind otherwise.
    min: u8,
    chow: bool,
    kong: bool,
    /// Counted as concealed for the hidden-pung family.
    concealed: bool,
    melded: bool,
}

impl SetInfo {
    fn kind(&self) -> TileKind {
        TileKind::new(self.min).unwrap()
    }

    /// 1-based number of a suited pung, or of a chow's middle tile.
    fn pung_number(&self) -> Option<u8> {
        if self.chow {
            None
        } else {
            self.kind().number()
        }
    }

    fn suit_index(&self) -> Option<u8> {
        if self.min < HONOR_START {
            Some(self.min / 9)
        } else {
            None
        }
    }
}

/// How the win tile completed the hand, for the single-wait family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WaitShape {
    /// 12 waiting 3, or 89 waiting 7.
    Edge,
    /// The middle of a chow.
    Closed,
    /// The pair.
    Pair,
    /// A two-sided or triplet wait; never a single-wait fan.
    Open,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Evaluates a parsed hand; `None` when it is not a winning shape.
pub fn evaluate(hand: &ParsedHand) -> Option<FanTally> {
    let concealed = hand.concealed_counts();
    let melds = &hand.melds;
    let sets_needed = 4usize.saturating_sub(melds.len());

    let mut candidates: Vec<FanTally> = Vec::new();

    if melds.is_empty() {
        if decompose::is_thirteen_orphans(&concealed) {
            candidates.push(score_thirteen_orphans(hand));
        }
        if decompose::is_seven_pairs(&concealed) {
            candidates.push(score_seven_pairs(hand, &concealed));
        }
        if decompose::is_lesser_knitted(&concealed) {
            candidates.push(score_lesser_knitted(hand, &concealed));
        }
    }

    // Knitted straight: nine fixed tiles stand in for three sets.
    if melds.len() <= 1 {
        if let Some(kinds) = decompose::knitted_kinds(&concealed) {
            let mut rest = concealed;
            for &k in &kinds {
                rest[k as usize] -= 1;
            }
            for dec in decompose::decompose(&rest, sets_needed.saturating_sub(3)) {
                candidates.push(score_knitted_straight(hand, &dec));
            }
        }
    }

    for dec in decompose::decompose(&concealed, sets_needed) {
        candidates.extend(score_standard(hand, &dec));
    }

    candidates.into_iter().max_by_key(|t| t.total)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn has_melded_pack(melds: &[HandMeld]) -> bool {
    melds.iter().any(|m| m.is_exposing())
}

/// Concealment and environment fans shared by every shape.
fn add_env_fans(tally: &mut Tally, env: &EnvInfo, melds: &[HandMeld]) {
    if env.kong_rob && !env.self_drawn {
        tally.add(Fan::RobbingTheKong);
        tally.suppress(&[Fan::LastTile]);
    }
    if env.sea_bottom {
        if env.self_drawn {
            tally.add(Fan::LastTileDraw);
            tally.suppress(&[Fan::SelfDrawn]);
        } else {
            tally.add(Fan::LastTileClaim);
        }
    }
    if env.last_copy {
        tally.add(Fan::LastTile);
    }
    if !has_melded_pack(melds) {
        if env.self_drawn {
            tally.add(Fan::FullyConcealedHand);
            tally.suppress(&[Fan::SelfDrawn]);
        } else {
            tally.add(Fan::ConcealedHand);
        }
    }
    if env.self_drawn {
        tally.add(Fan::SelfDrawn);
    }
}

/// Whole-hand tile-set fans: flushes, bounds, and friends. Shape-free.
fn add_tile_set_fans(tally: &mut Tally, all: &[u8; NUM_TILE_KINDS]) {
    let mut suits_used = [false; 3];
    let mut has_honor = false;
    let mut has_wind = false;
    let mut has_dragon = false;
    let mut min_number = 10u8;
    let mut max_number = 0u8;
    let mut has_terminal = false;

    for kind in 0..NUM_TILE_KINDS as u8 {
        if all[kind as usize] == 0 {
            continue;
        }
        let k = TileKind::new(kind).unwrap();
        match k.number() {
            Some(n) => {
                suits_used[(kind / 9) as usize] = true;
                min_number = min_number.min(n);
                max_number = max_number.max(n);
                if n == 1 || n == 9 {
                    has_terminal = true;
                }
            }
            None => {
                has_honor = true;
                if k.is_wind() {
                    has_wind = true;
                } else {
                    has_dragon = true;
                }
            }
        }
    }
    let suit_count = suits_used.iter().filter(|&&u| u).count();

    // All green: 23468s plus the green dragon only.
    const GREEN: [u8; 6] = [10, 11, 12, 14, 16, GREEN_DRAGON];
    if (0..NUM_TILE_KINDS as u8)
        .all(|k| all[k as usize] == 0 || GREEN.contains(&k))
    {
        tally.add(Fan::AllGreen);
    }

    if suit_count == 1 && !has_honor {
        tally.add(Fan::FullFlush);
        tally.suppress(&[Fan::NoHonors, Fan::OneVoidedSuit]);
    } else if suit_count == 1 && has_honor {
        tally.add(Fan::HalfFlush);
        tally.suppress(&[Fan::OneVoidedSuit]);
    }

    if !has_honor && suit_count > 0 {
        match (min_number, max_number) {
            (7..=9, _) => {
                tally.add(Fan::UpperTiles);
                tally.suppress(&[Fan::UpperFour, Fan::NoHonors]);
            }
            (4..=9, 4..=6) => {
                tally.add(Fan::MiddleTiles);
                tally.suppress(&[Fan::AllSimples, Fan::NoHonors]);
            }
            (_, 1..=3) => {
                tally.add(Fan::LowerTiles);
                tally.suppress(&[Fan::LowerFour, Fan::NoHonors]);
            }
            _ => {}
        }
        if min_number >= 6 {
            tally.add(Fan::UpperFour);
            tally.suppress(&[Fan::NoHonors]);
        }
        if max_number <= 4 {
            tally.add(Fan::LowerFour);
            tally.suppress(&[Fan::NoHonors]);
        }
    }

    // Reversible tiles: vertically symmetric faces.
    const REVERSIBLE: [u8; 14] = [10, 12, 13, 14, 16, 17, 18, 19, 20, 21, 22, 25, 26, 33];
    if (0..NUM_TILE_KINDS as u8)
        .all(|k| all[k as usize] == 0 || REVERSIBLE.contains(&k))
    {
        tally.add(Fan::ReversibleTiles);
        tally.suppress(&[Fan::OneVoidedSuit]);
    }

    if suit_count == 3 && has_wind && has_dragon {
        tally.add(Fan::AllTypes);
    }
    if suit_count == 2 {
        tally.add(Fan::OneVoidedSuit);
    }
    if !has_honor && !has_terminal {
        tally.add(Fan::AllSimples);
        tally.suppress(&[Fan::NoHonors]);
    }
    if !has_honor {
        tally.add(Fan::NoHonors);
    }
}

/// Tile hog: four copies of a kind used without a kong.
fn add_tile_hog(tally: &mut Tally, all: &[u8; NUM_TILE_KINDS], melds: &[HandMeld]) {
    let mut hogs = 0;
    for kind in 0..NUM_TILE_KINDS as u8 {
        if all[kind as usize] == 4
            && !melds
                .iter()
                .any(|m| m.kind == MeldKind::Kong && m.base.id() == kind)
        {
            hogs += 1;
        }
    }
    tally.add_count(Fan::TileHog, hogs);
}

// ---------------------------------------------------------------------------
// Special shapes
// ---------------------------------------------------------------------------

fn score_thirteen_orphans(hand: &ParsedHand) -> FanTally {
    let mut tally = Tally::default();
    tally.add(Fan::ThirteenOrphans);
    tally.suppress(&[
        Fan::AllTypes,
        Fan::ConcealedHand,
        Fan::FullyConcealedHand,
        Fan::SingleWait,
    ]);
    add_env_fans(&mut tally, &hand.env, &hand.melds);
    tally.finish(hand.flower_count)
}

fn score_seven_pairs(hand: &ParsedHand, counts: &[u8; NUM_TILE_KINDS]) -> FanTally {
    let mut tally = Tally::default();
    if decompose::is_seven_shifted_pairs(counts) {
        tally.add(Fan::SevenShiftedPairs);
        tally.suppress(&[
            Fan::SevenPairs,
            Fan::FullFlush,
            Fan::ConcealedHand,
            Fan::FullyConcealedHand,
            Fan::SingleWait,
        ]);
    } else {
        tally.add(Fan::SevenPairs);
        tally.suppress(&[
            Fan::ConcealedHand,
            Fan::FullyConcealedHand,
            Fan::SingleWait,
        ]);
    }
    // All honors in pair form still scores the tile-set fan.
    if (0..HONOR_START).all(|k| counts[k as usize] == 0) {
        tally.add(Fan::AllHonors);
        tally.suppress(&[Fan::AllTerminalsAndHonors, Fan::OutsideHand]);
    }
    add_tile_set_fans(&mut tally, counts);
    add_tile_hog(&mut tally, counts, &hand.melds);
    add_env_fans(&mut tally, &hand.env, &hand.melds);
    tally.finish(hand.flower_count)
}

fn score_lesser_knitted(hand: &ParsedHand, counts: &[u8; NUM_TILE_KINDS]) -> FanTally {
    let mut tally = Tally::default();
    if decompose::is_greater_knitted(counts) {
        tally.add(Fan::GreaterKnitted);
        tally.suppress(&[Fan::LesserKnitted]);
    } else {
        tally.add(Fan::LesserKnitted);
    }
    tally.suppress(&[
        Fan::AllTypes,
        Fan::ConcealedHand,
        Fan::FullyConcealedHand,
        Fan::SingleWait,
        Fan::NoHonors,
        Fan::OneVoidedSuit,
    ]);
    if decompose::knitted_kinds(counts).is_some() {
        tally.add(Fan::KnittedStraight);
    }
    add_env_fans(&mut tally, &hand.env, &hand.melds);
    tally.finish(hand.flower_count)
}

fn score_knitted_straight(hand: &ParsedHand, dec: &Decomposition) -> FanTally {
    let mut tally = Tally::default();
    tally.add(Fan::KnittedStraight);
    // The knitted block spans all three suits.
    tally.suppress(&[Fan::OneVoidedSuit]);

    // The leftover set and pair still carry their own small fans.
    for block in &dec.blocks {
        if let Block::Pung(kind) = block {
            let k = TileKind::new(*kind).unwrap();
            add_single_pung_fans(&mut tally, k, &hand.env);
        }
    }
    for meld in &hand.melds {
        if meld.kind != MeldKind::Chow {
            add_single_pung_fans(&mut tally, meld.base, &hand.env);
        }
    }

    add_tile_set_fans(&mut tally, &hand.all_counts());
    add_env_fans(&mut tally, &hand.env, &hand.melds);
    tally.finish(hand.flower_count)
}

/// Dragon / wind / terminal fans of one isolated pung.
fn add_single_pung_fans(tally: &mut Tally, kind: TileKind, env: &EnvInfo) {
    if kind.is_dragon() {
        tally.add(Fan::DragonPung);
    } else if kind.is_wind() {
        let wind_offset = kind.id() - EAST;
        let mut counted = false;
        if wind_offset == env.round_wind {
            tally.add(Fan::PrevalentWind);
            counted = true;
        }
        if wind_offset == env.seat_wind {
            tally.add(Fan::SeatWind);
            counted = true;
        }
        if !counted {
            tally.add(Fan::PungOfTerminalsOrHonors);
        }
    } else if kind.is_terminal() {
        tally.add(Fan::PungOfTerminalsOrHonors);
    }
}

// ---------------------------------------------------------------------------
// Standard hands
// ---------------------------------------------------------------------------

/// Scores one decomposition under every plausible win-tile placement.
fn score_standard(hand: &ParsedHand, dec: &Decomposition) -> Vec<FanTally> {
    let mut sets: Vec<SetInfo> = Vec::with_capacity(4);
    for meld in &hand.melds {
        sets.push(SetInfo {
            min: meld.base.id(),
            chow: meld.kind == MeldKind::Chow,
            kong: meld.kind == MeldKind::Kong,
            concealed: meld.is_concealed_kong(),
            melded: meld.is_exposing(),
        });
    }
    let concealed_base = sets.len();
    for block in &dec.blocks {
        match block {
            Block::Chow(min) => sets.push(SetInfo {
                min: *min,
                chow: true,
                kong: false,
                concealed: false,
                melded: false,
            }),
            Block::Pung(kind) => sets.push(SetInfo {
                min: *kind,
                chow: false,
                kong: false,
                concealed: true,
                melded: false,
            }),
        }
    }

    let win = hand.win_tile.id();
    let unique_wait = has_unique_wait(hand);

    // Enumerate which concealed block absorbed the win tile.
    let mut placements: Vec<(Option<usize>, WaitShape)> = Vec::new();
    for (i, set) in sets.iter().enumerate().skip(concealed_base) {
        if set.chow {
            let offset = win.wrapping_sub(set.min);
            match offset {
                0 | 2 => {
                    let number = set.min % 9 + 1;
                    let edge = (offset == 2 && number == 1) || (offset == 0 && number == 7);
                    placements.push((Some(i), if edge { WaitShape::Edge } else { WaitShape::Open }));
                }
                1 => placements.push((Some(i), WaitShape::Closed)),
                _ => {}
            }
        } else if set.min == win {
            placements.push((Some(i), WaitShape::Open));
        }
    }
    if dec.pair == win {
        placements.push((None, WaitShape::Pair));
    }
    if placements.is_empty() {
        // Win tile only appears inside melds; treat as an open wait.
        placements.push((None, WaitShape::Open));
    }

    let mut tallies = Vec::with_capacity(placements.len());
    for (block_idx, wait) in placements {
        let mut sets = sets.clone();
        // A pung completed by a claimed tile is not concealed.
        if let Some(idx) = block_idx {
            if !sets[idx].chow && !hand.env.self_drawn {
                sets[idx].concealed = false;
            }
        }
        tallies.push(score_sets(hand, &sets, dec.pair, wait, unique_wait));
    }
    tallies
}

/// True when the pre-win hand waited on exactly one kind.
fn has_unique_wait(hand: &ParsedHand) -> bool {
    let mut counts = hand.concealed_counts();
    counts[hand.win_tile.id() as usize] -= 1;
    let sets_needed = 4usize.saturating_sub(hand.melds.len());

    let mut waits = 0;
    for kind in 0..NUM_TILE_KINDS {
        if counts[kind] == 4 {
            continue;
        }
        counts[kind] += 1;
        let wins = decompose::is_standard_win(&counts, sets_needed)
            || (hand.melds.is_empty()
                && (decompose::is_seven_pairs(&counts)
                    || decompose::is_thirteen_orphans(&counts)
                    || decompose::is_lesser_knitted(&counts)));
        counts[kind] -= 1;
        if wins {
            waits += 1;
            if waits > 1 {
                return false;
            }
        }
    }
    waits == 1
}

fn score_sets(
    hand: &ParsedHand,
    sets: &[SetInfo],
    pair: u8,
    wait: WaitShape,
    unique_wait: bool,
) -> FanTally {
    let env = &hand.env;
    let all = hand.all_counts();
    let mut tally = Tally::default();

    let pair_kind = TileKind::new(pair).unwrap();
    let chows: Vec<&SetInfo> = sets.iter().filter(|s| s.chow).collect();
    let pungs: Vec<&SetInfo> = sets.iter().filter(|s| !s.chow).collect();

    let wind_pungs: Vec<&&SetInfo> = pungs
        .iter()
        .filter(|s| s.kind().is_wind())
        .collect();
    let dragon_pungs: Vec<&&SetInfo> = pungs
        .iter()
        .filter(|s| s.kind().is_dragon())
        .collect();

    // -- 88-point patterns -------------------------------------------------
    if wind_pungs.len() == 4 {
        tally.add(Fan::BigFourWinds);
        tally.suppress(&[
            Fan::BigThreeWinds,
            Fan::LittleFourWinds,
            Fan::AllPungs,
            Fan::PrevalentWind,
            Fan::SeatWind,
            Fan::PungOfTerminalsOrHonors,
        ]);
    }
    if dragon_pungs.len() == 3 {
        tally.add(Fan::BigThreeDragons);
        tally.suppress(&[Fan::TwoDragonPungs, Fan::DragonPung]);
    }
    if hand.melds.is_empty() && nine_gates(&hand.concealed_counts()) {
        tally.add(Fan::NineGates);
        tally.suppress(&[
            Fan::FullFlush,
            Fan::ConcealedHand,
            Fan::FullyConcealedHand,
            Fan::NoHonors,
            Fan::PungOfTerminalsOrHonors,
        ]);
    }

    let melded_kongs = sets.iter().filter(|s| s.kong && s.melded).count();
    let concealed_kongs = sets.iter().filter(|s| s.kong && !s.melded).count();
    match melded_kongs + concealed_kongs {
        4 => {
            tally.add(Fan::FourKongs);
            tally.suppress(&[
                Fan::ThreeKongs,
                Fan::MeldedKong,
                Fan::ConcealedKong,
                Fan::TwoMeldedKongs,
                Fan::TwoConcealedKongs,
                Fan::SingleWait,
            ]);
        }
        3 => {
            tally.add(Fan::ThreeKongs);
            tally.suppress(&[
                Fan::MeldedKong,
                Fan::ConcealedKong,
                Fan::TwoMeldedKongs,
                Fan::TwoConcealedKongs,
            ]);
        }
        _ => {}
    }

    // -- 64-point patterns -------------------------------------------------
    let all_sets_terminal_pungs = pungs.len() == 4
        && pungs.iter().all(|s| s.kind().is_terminal())
        && pair_kind.is_terminal();
    if all_sets_terminal_pungs {
        tally.add(Fan::AllTerminals);
        tally.suppress(&[
            Fan::AllTerminalsAndHonors,
            Fan::AllPungs,
            Fan::OutsideHand,
            Fan::PungOfTerminalsOrHonors,
            Fan::NoHonors,
        ]);
    }
    if wind_pungs.len() == 3 && pair_kind.is_wind() {
        tally.add(Fan::LittleFourWinds);
        tally.suppress(&[Fan::BigThreeWinds, Fan::PungOfTerminalsOrHonors]);
    }
    if dragon_pungs.len() == 2 && pair_kind.is_dragon() {
        tally.add(Fan::LittleThreeDragons);
        tally.suppress(&[Fan::TwoDragonPungs, Fan::DragonPung]);
    }
    if sets.iter().all(|s| !s.chow && s.kind().is_honor()) && pair_kind.is_honor() {
        tally.add(Fan::AllHonors);
        tally.suppress(&[
            Fan::AllTerminalsAndHonors,
            Fan::AllPungs,
            Fan::OutsideHand,
            Fan::PungOfTerminalsOrHonors,
        ]);
    }
    let concealed_pungs = pungs.iter().filter(|s| s.concealed).count();
    match concealed_pungs {
        4 => {
            tally.add(Fan::FourConcealedPungs);
            tally.suppress(&[
                Fan::AllPungs,
                Fan::ThreeConcealedPungs,
                Fan::TwoConcealedPungs,
                Fan::ConcealedHand,
                Fan::FullyConcealedHand,
            ]);
        }
        3 => {
            tally.add(Fan::ThreeConcealedPungs);
            tally.suppress(&[Fan::TwoConcealedPungs]);
        }
        2 => tally.add(Fan::TwoConcealedPungs),
        _ => {}
    }
    if pure_terminal_chows(&chows, pair_kind) {
        tally.add(Fan::PureTerminalChows);
        tally.suppress(&[
            Fan::FullFlush,
            Fan::AllChows,
            Fan::PureDoubleChow,
            Fan::TwoTerminalChows,
            Fan::NoHonors,
        ]);
    }

    // -- chow architecture -------------------------------------------------
    add_chow_architecture(&mut tally, &chows);

    // -- pung architecture -------------------------------------------------
    add_pung_architecture(&mut tally, &pungs);

    // -- mixed straight / terminal chows ----------------------------------
    if mixed_straight(&chows) {
        tally.add(Fan::MixedStraight);
    }
    if three_suited_terminal_chows(&chows, pair_kind) {
        tally.add(Fan::ThreeSuitedTerminalChows);
        tally.suppress(&[
            Fan::MixedDoubleChow,
            Fan::TwoTerminalChows,
            Fan::AllChows,
            Fan::NoHonors,
        ]);
    }

    // -- whole-hand shape fans --------------------------------------------
    if pungs.len() == 4 {
        tally.add(Fan::AllPungs);
    }
    if chows.len() == 4 && !pair_kind.is_honor() {
        tally.add(Fan::AllChows);
        tally.suppress(&[Fan::NoHonors]);
    }
    if sets
        .iter()
        .all(|s| !s.chow && s.pung_number().map_or(false, |n| n % 2 == 0))
        && pair_kind.number().map_or(false, |n| n % 2 == 0)
    {
        tally.add(Fan::AllEvenPungs);
        tally.suppress(&[Fan::AllPungs, Fan::AllSimples, Fan::NoHonors]);
    }
    if all_terminals_and_honors(&pungs, pair_kind, sets) {
        tally.add(Fan::AllTerminalsAndHonors);
        tally.suppress(&[
            Fan::AllPungs,
            Fan::OutsideHand,
            Fan::PungOfTerminalsOrHonors,
        ]);
    }
    if outside_hand(sets, pair_kind) {
        tally.add(Fan::OutsideHand);
    }
    if all_fives(sets, pair_kind) {
        tally.add(Fan::AllFives);
        tally.suppress(&[Fan::AllSimples, Fan::NoHonors]);
    }

    // -- melded / kong bookkeeping ----------------------------------------
    if hand.melds.len() == 4 && has_melded_pack(&hand.melds) && !env.self_drawn {
        // Every set claimed and the pair completed off a discard.
        if hand.melds.iter().all(|m| m.is_exposing()) {
            tally.add(Fan::MeldedHand);
            tally.suppress(&[Fan::SingleWait]);
        }
    }
    match (melded_kongs, concealed_kongs) {
        (2, 0) => tally.add(Fan::TwoMeldedKongs),
        (0, 2) => {
            tally.add(Fan::TwoConcealedKongs);
            tally.suppress(&[Fan::ConcealedKong, Fan::TwoConcealedPungs]);
        }
        (1, 1) => {
            tally.add(Fan::MeldedKong);
            tally.add(Fan::ConcealedKong);
        }
        (1, 0) => tally.add(Fan::MeldedKong),
        (0, 1) => tally.add(Fan::ConcealedKong),
        _ => {}
    }

    // -- honor pungs -------------------------------------------------------
    if dragon_pungs.len() == 2 && !tally.has(Fan::LittleThreeDragons) {
        tally.add(Fan::TwoDragonPungs);
        tally.suppress(&[Fan::DragonPung]);
    }
    if dragon_pungs.len() == 1 {
        tally.add(Fan::DragonPung);
    }
    if wind_pungs.len() == 3 && !tally.has(Fan::LittleFourWinds) && !tally.has(Fan::BigFourWinds) {
        tally.add(Fan::BigThreeWinds);
    }
    for pung in &wind_pungs {
        let offset = pung.kind().id() - EAST;
        let mut counted = tally.has(Fan::BigFourWinds)
            || tally.has(Fan::LittleFourWinds)
            || tally.has(Fan::BigThreeWinds);
        if offset == env.round_wind {
            tally.add(Fan::PrevalentWind);
            counted = true;
        }
        if offset == env.seat_wind {
            tally.add(Fan::SeatWind);
            counted = true;
        }
        if !counted {
            tally.add(Fan::PungOfTerminalsOrHonors);
        }
    }
    for pung in &pungs {
        if pung.kind().is_terminal() {
            tally.add(Fan::PungOfTerminalsOrHonors);
        }
    }

    // -- pair-dependent fans -----------------------------------------------
    add_tile_set_fans(&mut tally, &all);
    add_tile_hog(&mut tally, &all, &hand.melds);

    // -- waits -------------------------------------------------------------
    if unique_wait {
        match wait {
            WaitShape::Edge => tally.add(Fan::EdgeWait),
            WaitShape::Closed => tally.add(Fan::ClosedWait),
            WaitShape::Pair => tally.add(Fan::SingleWait),
            WaitShape::Open => {}
        }
    }

    add_env_fans(&mut tally, env, &hand.melds);
    tally.finish(hand.flower_count)
}

// ---------------------------------------------------------------------------
// Shape predicates
// ---------------------------------------------------------------------------

fn nine_gates(counts: &[u8; NUM_TILE_KINDS]) -> bool {
    for suit_start in [0usize, 9, 18] {
        if (0..9).any(|i| counts[suit_start + i] == 0) {
            continue;
        }
        let in_suit: u32 = (0..9).map(|i| counts[suit_start + i] as u32).sum();
        if in_suit != 14 {
            continue;
        }
        let base_ok = counts[suit_start] >= 3
            && counts[suit_start + 8] >= 3
            && (1..8).all(|i| counts[suit_start + i] >= 1);
        if base_ok {
            return true;
        }
    }
    false
}

fn pure_terminal_chows(chows: &[&SetInfo], pair: TileKind) -> bool {
    if chows.len() != 4 {
        return false;
    }
    let Some(suit) = chows[0].suit_index() else {
        return false;
    };
    if chows.iter().any(|c| c.suit_index() != Some(suit)) {
        return false;
    }
    // The pair is the 5 of the same suit.
    if pair.number() != Some(5) || pair.id() / 9 != suit {
        return false;
    }
    let mut lows = 0;
    let mut highs = 0;
    for chow in chows {
        match chow.min % 9 {
            0 => lows += 1,
            6 => highs += 1,
            _ => return false,
        }
    }
    lows == 2 && highs == 2
}

fn three_suited_terminal_chows(chows: &[&SetInfo], pair: TileKind) -> bool {
    if chows.len() != 4 || pair.number() != Some(5) {
        return false;
    }
    let pair_suit = pair.id() / 9;
    let mut seen: Vec<(u8, u8)> = chows
        .iter()
        .filter_map(|c| c.suit_index().map(|s| (s, c.min % 9)))
        .collect();
    seen.sort_unstable();
    if seen.len() != 4 {
        return false;
    }
    let suits: BTreeSet<u8> = seen.iter().map(|&(s, _)| s).collect();
    if suits.len() != 2 || suits.contains(&pair_suit) {
        return false;
    }
    let mut by_suit = std::collections::BTreeMap::new();
    for (s, low) in seen {
        by_suit.entry(s).or_insert_with(Vec::new).push(low);
    }
    by_suit.values().all(|lows| lows.as_slice() == [0, 6])
}

fn mixed_straight(chows: &[&SetInfo]) -> bool {
    for a in chows {
        for b in chows {
            for c in chows {
                let (Some(sa), Some(sb), Some(sc)) =
                    (a.suit_index(), b.suit_index(), c.suit_index())
                else {
                    continue;
                };
                if sa != sb && sb != sc && sa != sc
                    && a.min % 9 == 0
                    && b.min % 9 == 3
                    && c.min % 9 == 6
                {
                    return true;
                }
            }
        }
    }
    false
}

fn all_terminals_and_honors(pungs: &[&SetInfo], pair: TileKind, sets: &[SetInfo]) -> bool {
    pungs.len() == 4
        && sets
            .iter()
            .all(|s| s.kind().is_terminal_or_honor())
        && pair.is_terminal_or_honor()
}

fn outside_hand(sets: &[SetInfo], pair: TileKind) -> bool {
    if !pair.is_terminal_or_honor() {
        return false;
    }
    sets.iter().all(|s| {
        if s.chow {
            let low = s.min % 9;
            low == 0 || low == 6
        } else {
            s.kind().is_terminal_or_honor()
        }
    })
}

fn all_fives(sets: &[SetInfo], pair: TileKind) -> bool {
    if pair.number() != Some(5) {
        return false;
    }
    sets.iter().all(|s| {
        if s.chow {
            let low = s.min % 9 + 1;
            (3..=5).contains(&low)
        } else {
            s.pung_number() == Some(5)
        }
    })
}

/// Chow-combination fans over the four (or fewer) chows. Each chow takes
/// part in at most one pairing, mirroring the non-repeat principle.
fn add_chow_architecture(tally: &mut Tally, chows: &[&SetInfo]) {
    // Same-suit architecture first: identical, shifted, straight.
    let mut by_suit: [Vec<u8>; 3] = Default::default();
    for chow in chows {
        if let Some(s) = chow.suit_index() {
            by_suit[s as usize].push(chow.min % 9);
        }
    }

    for lows in by_suit.iter_mut() {
        lows.sort_unstable();
        match lows.len() {
            4 => {
                if lows.iter().all(|&l| l == lows[0]) {
                    tally.add(Fan::QuadrupleChow);
                    tally.suppress(&[
                        Fan::PureTripleChow,
                        Fan::PureDoubleChow,
                        Fan::TileHog,
                        Fan::PureShiftedPungs,
                    ]);
                    return;
                }
                if shifted_by(lows, 1) || shifted_by(lows, 2) {
                    tally.add(Fan::FourPureShiftedChows);
                    tally.suppress(&[
                        Fan::PureShiftedChows,
                        Fan::ShortStraight,
                        Fan::TwoTerminalChows,
                    ]);
                    return;
                }
            }
            3 => {
                if lows.iter().all(|&l| l == lows[0]) {
                    tally.add(Fan::PureTripleChow);
                    tally.suppress(&[Fan::PureDoubleChow]);
                    continue;
                }
                if lows.as_slice() == [0, 3, 6] {
                    tally.add(Fan::PureStraight);
                    tally.suppress(&[Fan::ShortStraight, Fan::TwoTerminalChows]);
                    continue;
                }
                if shifted_by(lows, 1) || shifted_by(lows, 2) {
                    tally.add(Fan::PureShiftedChows);
                    continue;
                }
            }
            _ => {}
        }
    }
    // Cross-suit triples.
    if chows.len() >= 3 && !tally.has(Fan::QuadrupleChow) {
        let mut entries: Vec<(u8, u8)> = chows
            .iter()
            .filter_map(|c| c.suit_index().map(|s| (s, c.min % 9)))
            .collect();
        entries.sort_unstable();
        if mixed_triple(&entries) && !tally.has(Fan::PureTripleChow) {
            tally.add(Fan::MixedTripleChow);
            tally.suppress(&[Fan::MixedDoubleChow]);
        }
        if mixed_shifted(&entries) {
            tally.add(Fan::MixedShiftedChows);
        }
    }

    // Pairwise 1-point fans; each chow pairs at most once.
    let mut used = vec![false; chows.len()];
    let pair_fans: [(fn(&SetInfo, &SetInfo) -> bool, Fan); 4] = [
        (pure_double, Fan::PureDoubleChow),
        (two_terminal, Fan::TwoTerminalChows),
        (short_straight, Fan::ShortStraight),
        (mixed_double, Fan::MixedDoubleChow),
    ];
    for (check, fan) in pair_fans {
        for i in 0..chows.len() {
            for j in i + 1..chows.len() {
                if !used[i] && !used[j] && check(chows[i], chows[j]) {
                    tally.add(fan);
                    used[i] = true;
                    used[j] = true;
                }
            }
        }
    }
}

fn shifted_by(lows: &[u8], step: u8) -> bool {
    lows.windows(2).all(|w| w[1] == w[0] + step)
}

fn mixed_triple(entries: &[(u8, u8)]) -> bool {
    // Three chows, same low, three distinct suits.
    for low in 0..7u8 {
        let suits: BTreeSet<u8> = entries
            .iter()
            .filter(|&&(_, l)| l == low)
            .map(|&(s, _)| s)
            .collect();
        if suits.len() == 3 {
            return true;
        }
    }
    false
}

fn mixed_shifted(entries: &[(u8, u8)]) -> bool {
    for &(s0, l0) in entries {
        for &(s1, l1) in entries {
            for &(s2, l2) in entries {
                if s0 != s1
                    && s1 != s2
                    && s0 != s2
                    && l1 == l0 + 1
                    && l2 == l0 + 2
                {
                    return true;
                }
            }
        }
    }
    false
}

fn pure_double(a: &SetInfo, b: &SetInfo) -> bool {
    a.suit_index() == b.suit_index() && a.suit_index().is_some() && a.min == b.min
}

fn mixed_double(a: &SetInfo, b: &SetInfo) -> bool {
    a.suit_index() != b.suit_index()
        && a.suit_index().is_some()
        && b.suit_index().is_some()
        && a.min % 9 == b.min % 9
}

fn short_straight(a: &SetInfo, b: &SetInfo) -> bool {
    a.suit_index() == b.suit_index()
        && a.suit_index().is_some()
        && (a.min % 9).abs_diff(b.min % 9) == 3
}

fn two_terminal(a: &SetInfo, b: &SetInfo) -> bool {
    a.suit_index() == b.suit_index()
        && a.suit_index().is_some()
        && ((a.min % 9 == 0 && b.min % 9 == 6) || (a.min % 9 == 6 && b.min % 9 == 0))
}

/// Pung-combination fans: same-suit shifted runs and cross-suit triples.
fn add_pung_architecture(tally: &mut Tally, pungs: &[&SetInfo]) {
    let mut by_suit: [Vec<u8>; 3] = Default::default();
    for pung in pungs {
        if let Some(s) = pung.suit_index() {
            by_suit[s as usize].push(pung.min % 9);
        }
    }
    for lows in by_suit.iter_mut() {
        lows.sort_unstable();
        if lows.len() == 4 && shifted_by(lows, 1) {
            tally.add(Fan::FourPureShiftedPungs);
            tally.suppress(&[Fan::PureShiftedPungs, Fan::AllPungs]);
        } else if lows.len() == 3 && shifted_by(lows, 1) {
            tally.add(Fan::PureShiftedPungs);
        }
    }

    // Cross-suit: same number in three suits, or shifted across suits.
    let mut entries: Vec<(u8, u8)> = pungs
        .iter()
        .filter_map(|p| p.suit_index().map(|s| (s, p.min % 9)))
        .collect();
    entries.sort_unstable();
    if mixed_triple(&entries) {
        tally.add(Fan::TriplePung);
        tally.suppress(&[Fan::DoublePung]);
    } else if mixed_shifted(&entries) {
        tally.add(Fan::MixedShiftedPungs);
    }

    // Double pungs: same number, two suits; each pung pairs once.
    if !tally.has(Fan::TriplePung) {
        let mut used = vec![false; pungs.len()];
        for i in 0..pungs.len() {
            for j in i + 1..pungs.len() {
                if used[i] || used[j] {
                    continue;
                }
                let (Some(si), Some(sj)) = (pungs[i].suit_index(), pungs[j].suit_index()) else {
                    continue;
                };
                if si != sj && pungs[i].min % 9 == pungs[j].min % 9 {
                    tally.add(Fan::DoublePung);
                    used[i] = true;
                    used[j] = true;
                }
            }
        }
    }
}
