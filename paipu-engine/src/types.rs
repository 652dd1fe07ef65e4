use serde::{Deserialize, Serialize};

use crate::tile::{Tile, TileKind};

// ---------------------------------------------------------------------------
// Winds
// ---------------------------------------------------------------------------

/// Seat and round winds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Wind {
    #[default]
    East = 0,
    South = 1,
    West = 2,
    North = 3,
}

impl From<u8> for Wind {
    fn from(val: u8) -> Self {
        match val % 4 {
            0 => Wind::East,
            1 => Wind::South,
            2 => Wind::West,
            _ => Wind::North,
        }
    }
}

impl Wind {
    /// Single-letter form used in environment flags.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Wind::East => 'E',
            Wind::South => 'S',
            Wind::West => 'W',
            Wind::North => 'N',
        }
    }

    /// Chinese label used in step logs.
    #[inline]
    pub const fn glyph(self) -> &'static str {
        match self {
            Wind::East => "东",
            Wind::South => "南",
            Wind::West => "西",
            Wind::North => "北",
        }
    }
}

// ---------------------------------------------------------------------------
// Melds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeldKind {
    Chow,
    Pung,
    Kong,
}

/// An exposed pack of 3 (chow, pung) or 4 (kong) tiles.
///
/// `direction` is the relative seat of the tile donor: 0 means self
/// (concealed kong), 1-3 a claim from that many seats downstream, and
/// `5 + d` marks a pung upgraded to a kong that originally came from
/// direction `d`. `offer_seq` is the slot within `tiles` occupied by the
/// claimed tile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meld {
    pub kind: MeldKind,
    pub tiles: Vec<Tile>,
    pub direction: u8,
    pub offer_seq: usize,
}

impl Meld {
    /// Kind of the meld's base tile. Chows report the kind of the slot the
    /// meld was built from; all tiles of a pung or kong share it anyway.
    pub fn base_kind(&self) -> Option<TileKind> {
        self.tiles.first().and_then(|t| t.kind())
    }

    #[inline]
    pub fn is_kong(&self) -> bool {
        self.kind == MeldKind::Kong
    }

    #[inline]
    pub fn is_concealed_kong(&self) -> bool {
        self.kind == MeldKind::Kong && self.direction == 0
    }

    #[inline]
    pub fn is_added_kong(&self) -> bool {
        self.kind == MeldKind::Kong && self.direction >= 5
    }
}

// ---------------------------------------------------------------------------
// Replay outputs
// ---------------------------------------------------------------------------

/// One applied action, with the actor's position snapshot taken right after.
#[derive(Debug, Clone, Serialize)]
pub struct StepLog {
    pub step_number: u32,
    pub seat: u8,
    pub name: String,
    pub wind: String,
    pub action_kind: u8,
    pub description: String,
    pub elapsed_ms: u64,
    pub hand_tiles: Vec<String>,
    pub pack_tiles: Vec<String>,
    pub discard_tiles: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GameLog {
    pub title: String,
    pub player_names: Vec<String>,
    pub dealer: u8,
    pub steps: Vec<StepLog>,
    pub win_analysis: Option<WinAnalysis>,
}

/// One entry of the record's declared fan map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanDetail {
    pub fan_id: u16,
    pub name: String,
    pub points: u32,
    pub count: u32,
}

/// One pattern reported by the scoring backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredFan {
    pub name: String,
    pub points: u32,
    pub count: u32,
}

/// The analysis of a declared win: what the record claims next to what the
/// scoring backend computes. Agreement is reported, never enforced.
#[derive(Debug, Clone, Serialize)]
pub struct WinAnalysis {
    pub winner: u8,
    pub winner_name: String,
    pub winner_wind: char,
    pub declared_total_fan: u32,
    pub declared_base_fan: u32,
    pub computed_total_fan: u32,
    pub flower_count: u8,
    pub formatted_hand: String,
    pub declared_fans: Vec<FanDetail>,
    pub computed_fans: Vec<ScoredFan>,
    pub scoring_input: String,
    pub env_flag: String,
}

// ---------------------------------------------------------------------------
// Declared fan name table
// ---------------------------------------------------------------------------

/// Platform fan-name table indexed by declared fan id. Ids 1-76 follow the
/// national-standard list in descending point order; 77-88 are the
/// platform's wait/penalty extensions. Id 83 is a legacy duplicate of the
/// flower entry and is filtered during extraction.
pub const FAN_NAMES: [&str; 89] = [
    "无",
    "大四喜",
    "大三元",
    "绿一色",
    "九莲宝灯",
    "四杠",
    "连七对",
    "十三幺",
    "清幺九",
    "小四喜",
    "小三元",
    "字一色",
    "四暗刻",
    "一色双龙会",
    "一色四同顺",
    "一色四节高",
    "一色四步高",
    "三杠",
    "混幺九",
    "七对",
    "七星不靠",
    "全双刻",
    "清一色",
    "一色三同顺",
    "一色三节高",
    "全大",
    "全中",
    "全小",
    "清龙",
    "三色双龙会",
    "一色三步高",
    "全带五",
    "三同刻",
    "三暗刻",
    "全不靠",
    "组合龙",
    "大于五",
    "小于五",
    "三风刻",
    "花龙",
    "推不倒",
    "三色三同顺",
    "三色三节高",
    "无番和",
    "妙手回春",
    "海底捞月",
    "杠上开花",
    "抢杠和",
    "碰碰和",
    "混一色",
    "三色三步高",
    "五门齐",
    "全求人",
    "双暗杠",
    "双箭刻",
    "全带幺",
    "不求人",
    "双明杠",
    "和绝张",
    "箭刻",
    "圈风刻",
    "门风刻",
    "门前清",
    "平和",
    "四归一",
    "双同刻",
    "双暗刻",
    "暗杠",
    "断幺",
    "一般高",
    "喜相逢",
    "连六",
    "老少副",
    "幺九刻",
    "明杠",
    "缺一门",
    "无字",
    "明暗杠",
    "报听",
    "独听・边张",
    "独听・嵌张",
    "独听・单钓",
    "自摸",
    "花牌",
    "错和",
    "漏和",
    "查大叫",
    "包牌",
    "流局",
];

/// Name for a declared fan id, tolerating out-of-table ids.
pub fn fan_name(fan_id: u16) -> String {
    FAN_NAMES
        .get(fan_id as usize)
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("Unknown({})", fan_id))
}
