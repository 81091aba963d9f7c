//! High-level AST for one script *before* it is lowered to ops.

use crate::model::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Branch {
    ThenElse(Vec<Cmd>, Vec<Cmd>),
    Then(Vec<Cmd>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Lt,
    Gt,
}

impl Comparison {
    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            Comparison::Eq => lhs == rhs,
            Comparison::Lt => lhs < rhs,
            Comparison::Gt => lhs > rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    FlagSet(String),   // `flag_X`
    FlagClear(String), // `!flag_X`
    /// `choice n`: the last `ask` was answered with option `n` (0-based).
    Choice(usize),
    /// The last dialog, shop or battle was closed without finishing.
    Cancelled,
    Won,
    Lost,
    /// `stat NAME (=|<|>) n` on the NPC's own statistics.
    Stat {
        stat: String,
        cmp: Comparison,
        value: i32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceTarget {
    Dir(Direction),
    Player,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopItem {
    pub item: String,
    pub price: u32,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuyBonus {
    pub item: String,
    pub percent: u32,
}

/// Everything a shop session needs to open: who trades, what they sell and
/// which items they pay extra for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShopDescriptor {
    pub trader: String,
    pub selling: Vec<ShopItem>,
    pub buy_bonuses: Vec<BuyBonus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// `log {text}`
    Log { text: String },

    /// `say {text}` – suspends until the dialog is dismissed.
    Say { text: String },

    /// `ask {question} {opt}…` – suspends until an option is picked.
    Ask {
        question: String,
        options: Vec<String>,
    },

    /// `shop {trader} … endshop` – suspends until the shop closes.
    Shop(ShopDescriptor),

    /// `battle` – suspends until the fight is won or lost.
    Battle,

    /// `give {item} count`
    Give { item: String, count: u32 },

    Sound { name: String },
    Music { name: String },

    /// `move dir` – queue one step for the NPC.
    Move { dir: Direction },

    Face { target: FaceTarget },

    /// `speed n` – ticks per grid step.
    Speed { ticks: u32 },

    SetStat { stat: String, value: i32 },
    AddStat { stat: String, delta: i32 },

    /// `setflag flag_X`
    SetFlag { flag: String },

    /// `unsetflag flag_X`
    UnsetFlag { flag: String },

    /// `if <condition> then … [else …] endif`.
    If {
        condition: Condition,
        branches: Branch,
    },

    /// `fail {message}` – abort the script with a runtime error.
    Fail { message: String },

    /// Script terminator (implicit if omitted).
    End,
}

/// One complete script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub name: String,
    pub body: Vec<Cmd>,
}
