//! The record action ISA.
//!
//! Every action is a `(seat, kind, data, time)` tuple; `data` is a
//! kind-specific bit field. The decoders here are the only place the bit
//! layout is known -- state mutation consumes the decoded forms.
//!
//! Shared layout: `lo = data & 0xFF`, `hi = (data >> 8) & 0xFF`,
//! `tile_base = (data & 0x3F) << 2`, `direction = (data >> 6) & 3`.

use serde::Serialize;

use crate::tile::{Tile, NUM_WALL_TILES};

// ---------------------------------------------------------------------------
// Raw form
// ---------------------------------------------------------------------------

/// One undecoded action from the script stream.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RawAction {
    pub seat: u8,
    pub kind: u8,
    pub data: u32,
    pub time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    RoundBegin = 0,
    FlowerReplace = 1,
    Discard = 2,
    Chow = 3,
    Pung = 4,
    Kong = 5,
    DeclareWin = 6,
    Draw = 7,
    Pass = 8,
    Abandon = 9,
}

impl ActionKind {
    pub const fn from_u8(kind: u8) -> Option<Self> {
        match kind {
            0 => Some(ActionKind::RoundBegin),
            1 => Some(ActionKind::FlowerReplace),
            2 => Some(ActionKind::Discard),
            3 => Some(ActionKind::Chow),
            4 => Some(ActionKind::Pung),
            5 => Some(ActionKind::Kong),
            6 => Some(ActionKind::DeclareWin),
            7 => Some(ActionKind::Draw),
            8 => Some(ActionKind::Pass),
            9 => Some(ActionKind::Abandon),
            _ => None,
        }
    }
}

impl RawAction {
    #[inline]
    pub fn action_kind(&self) -> Option<ActionKind> {
        ActionKind::from_u8(self.kind)
    }

    /// True for the action kinds that put a tile into the actor's hand.
    #[inline]
    pub fn is_draw_like(&self) -> bool {
        matches!(
            self.action_kind(),
            Some(ActionKind::Draw) | Some(ActionKind::FlowerReplace)
        )
    }
}

// ---------------------------------------------------------------------------
// Per-kind decoders
// ---------------------------------------------------------------------------

#[inline]
fn lo(data: u32) -> u8 {
    (data & 0xFF) as u8
}

#[inline]
fn hi(data: u32) -> u8 {
    ((data >> 8) & 0xFF) as u8
}

#[inline]
fn tile_base(data: u32) -> u8 {
    ((data & 0x3F) << 2) as u8
}

#[inline]
fn direction(data: u32) -> u8 {
    ((data >> 6) & 3) as u8
}

#[derive(Debug, Clone, Copy)]
pub struct FlowerReplace {
    pub flower: Tile,
    pub replacement: Tile,
    pub auto: bool,
}

/// The flower sits in the low nibble of the high byte, offset into the
/// flower range; the replacement tile is the low byte.
pub fn decode_flower(data: u32) -> Option<FlowerReplace> {
    let flower = Tile::new((hi(data) & 0xF) + NUM_WALL_TILES as u8)?;
    let replacement = Tile::new(lo(data))?;
    Some(FlowerReplace {
        flower,
        replacement,
        auto: data & 0x1000 != 0,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct Discard {
    pub tile: Tile,
    /// Played from the standing hand rather than the tile just drawn.
    pub from_hand: bool,
}

pub fn decode_discard(data: u32) -> Option<Discard> {
    Some(Discard {
        tile: Tile::new(lo(data))?,
        from_hand: hi(data) & 1 != 0,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct ChowDecode {
    base: u8,
    pub direction: u8,
    offsets: [u8; 3],
}

/// `None` for `data == 0` -- a declared-but-cancelled claim.
pub fn decode_chow(data: u32) -> Option<ChowDecode> {
    if data == 0 {
        return None;
    }
    Some(ChowDecode {
        base: tile_base(data),
        direction: direction(data),
        offsets: [
            ((data >> 10) & 3) as u8,
            ((data >> 12) & 3) as u8,
            ((data >> 14) & 3) as u8,
        ],
    })
}

impl ChowDecode {
    /// Resolves the three chow tiles. The encoding corner where the donated
    /// tile is the lowest of the chow underflows `base - 4`; the donor's
    /// discard value substitutes for the base in that case.
    pub fn tiles(&self, last_discard: Tile) -> Option<[Tile; 3]> {
        let mut base = self.base as i16;
        if base - 4 + (self.offsets[0] as i16) < 0 {
            base = last_discard.index() as i16;
        }
        let c1 = Tile::new((base - 4 + self.offsets[0] as i16) as u8)?;
        let c2 = Tile::new((base + self.offsets[1] as i16) as u8)?;
        let c3 = Tile::new((base + 4 + self.offsets[2] as i16) as u8)?;
        Some([c1, c2, c3])
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PungDecode {
    pub tile: Tile,
    pub direction: u8,
}

pub fn decode_pung(data: u32) -> Option<PungDecode> {
    if data == 0 {
        return None;
    }
    Some(PungDecode {
        tile: Tile::new(tile_base(data))?,
        direction: direction(data),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KongForm {
    /// Upgrades an existing pung; the fourth tile is robbable.
    Added,
    Concealed,
    Melded,
}

#[derive(Debug, Clone, Copy)]
pub struct KongDecode {
    pub tile: Tile,
    pub direction: u8,
    pub form: KongForm,
}

/// The added sub-form is flagged by bits 8-9 both set; otherwise a zero
/// direction means concealed. Known fragility of the source encoding.
pub fn decode_kong(data: u32) -> Option<KongDecode> {
    if data == 0 {
        return None;
    }
    let dir = direction(data);
    let form = if data & 0x0300 == 0x0300 {
        KongForm::Added
    } else if dir == 0 {
        KongForm::Concealed
    } else {
        KongForm::Melded
    };
    Some(KongDecode {
        tile: Tile::new(tile_base(data))?,
        direction: dir,
        form,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct WinDecode {
    pub auto: bool,
    /// Zero declares an invalid win ("wrong win"); replay continues.
    pub declared_fan: u32,
}

pub fn decode_win(data: u32) -> WinDecode {
    WinDecode {
        auto: data & 1 != 0,
        declared_fan: data >> 1,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawDecode {
    pub tile: Tile,
    /// Kong/flower replacement draws come from the back of the wall.
    pub from_back: bool,
}

pub fn decode_draw(data: u32) -> Option<DrawDecode> {
    Some(DrawDecode {
        tile: Tile::new(lo(data))?,
        from_back: hi(data) != 0,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    Manual,
    Auto,
    Forced,
}

pub fn decode_pass(data: u32) -> PassMode {
    match data & 3 {
        0 => PassMode::Manual,
        1 => PassMode::Auto,
        _ => PassMode::Forced,
    }
}

// ---------------------------------------------------------------------------
// Step descriptions
// ---------------------------------------------------------------------------

/// Human-readable description of an action, in the platform's own terms.
pub fn describe(action: &RawAction, last_discard: Option<Tile>) -> String {
    let data = action.data;
    match action.action_kind() {
        Some(ActionKind::RoundBegin) => "开始出牌".to_string(),
        Some(ActionKind::FlowerReplace) => match decode_flower(data) {
            Some(f) => format!(
                "{}补花 {} -> {}",
                if f.auto { "自动" } else { "手动" },
                f.flower,
                f.replacement
            ),
            None => "补花(数据异常)".to_string(),
        },
        Some(ActionKind::Discard) => match decode_discard(data) {
            Some(d) => format!("{} {}", if d.from_hand { "手打" } else { "摸打" }, d.tile),
            None => "出牌(数据异常)".to_string(),
        },
        Some(ActionKind::Chow) => match last_discard {
            _ if data == 0 => "动作无效".to_string(),
            Some(t) => format!("吃 {}", t),
            None => "吃".to_string(),
        },
        Some(ActionKind::Pung) => match decode_pung(data) {
            Some(p) => format!("碰 {}", p.tile),
            None => "动作无效".to_string(),
        },
        Some(ActionKind::Kong) => match decode_kong(data) {
            Some(k) => format!("杠 {}", k.tile),
            None => "动作无效".to_string(),
        },
        Some(ActionKind::DeclareWin) => {
            let w = decode_win(data);
            let mut desc = format!("{}和", if w.auto { "自动" } else { "手动" });
            if w.declared_fan > 0 {
                desc.push_str(&format!(" {}番", w.declared_fan));
            }
            desc
        }
        Some(ActionKind::Draw) => match decode_draw(data) {
            Some(d) => format!("{} {}", if d.from_back { "逆向摸牌" } else { "摸牌" }, d.tile),
            None => "摸牌(数据异常)".to_string(),
        },
        Some(ActionKind::Pass) => "过".to_string(),
        Some(ActionKind::Abandon) => "弃".to_string(),
        None => format!("未知动作({})", action.kind),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
