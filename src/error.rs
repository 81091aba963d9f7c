//! Error taxonomy for the engine core.
//!
//! Resource and format errors travel back to whoever asked for the load.
//! Script errors never leave the scheduler; they end one context and get logged.

use std::path::PathBuf;

use thiserror::Error;

use crate::content::ContentKind;
use crate::script::vm::Suspension;

/// Missing or unreadable content.
#[derive(Debug, Error)]
pub enum ResourceLoadError {
    #[error("{kind} `{name}` not found at {}", path.display())]
    Missing {
        kind: ContentKind,
        name: String,
        path: PathBuf,
    },

    #[error("failed to access {kind} `{name}`: {source}")]
    Io {
        kind: ContentKind,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} `{name}` is not valid JSON: {source}")]
    Malformed {
        kind: ContentKind,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("map `{map}` does not name a tileset")]
    EmptyTilesetName { map: String },
}

/// Structurally invalid map data. A map that fails with this is never installed.
#[derive(Debug, Error)]
pub enum MapFormatError {
    #[error("map `{map}`: malformed document: {source}")]
    Json {
        map: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("map `{map}`: size must be non-zero, got {x}x{y}")]
    ZeroSize { map: String, x: u32, y: u32 },

    #[error("map `{map}`: expected 3 tile layers, found {found}")]
    LayerCount { map: String, found: usize },

    #[error("map `{map}`: layer {layer} has {found} columns, expected {expected}")]
    LayerWidth {
        map: String,
        layer: usize,
        found: usize,
        expected: u32,
    },

    #[error("map `{map}`: layer {layer} column {x} has {found} rows, expected {expected}")]
    LayerHeight {
        map: String,
        layer: usize,
        x: usize,
        found: usize,
        expected: u32,
    },

    #[error("map `{map}`: {source}")]
    Tile {
        map: String,
        #[source]
        source: TileError,
    },

    #[error("map `{map}`: {what} at ({x}, {y}) lies outside the map")]
    OutOfBounds {
        map: String,
        what: &'static str,
        x: u32,
        y: u32,
    },
}

/// Any part of a failed map load.
#[derive(Debug, Error)]
pub enum MapLoadError {
    #[error(transparent)]
    Resource(#[from] ResourceLoadError),

    #[error(transparent)]
    Format(#[from] MapFormatError),

    /// The tileset document itself is invalid; the error names the tileset.
    #[error(transparent)]
    Tileset(#[from] TileError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TileError {
    #[error("tile id {id} is not defined in tileset `{tileset}` (valid ids are 1..={max})")]
    InvalidTileId { id: u32, tileset: String, max: u32 },

    #[error("tile {id} in tileset `{tileset}` has an animation with zero frames or zero speed")]
    InvalidAnimation { id: u32, tileset: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    /// A query or move addressed a cell outside the grid. This is a bug in the caller.
    #[error("collision invariant violated: ({x}, {y}) is outside the {width}x{height} map")]
    CollisionInvariantViolation {
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    },

    #[error("no NPC with handle {0}")]
    UnknownNpc(usize),

    #[error("only NPC actors can be added to a map")]
    NotAnNpc,

    #[error("layer {0} does not exist")]
    UnknownLayer(usize),

    #[error(transparent)]
    Tile(#[from] TileError),
}

/// Why a running script stopped abnormally.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeFault {
    #[error("unknown statistic `{0}`")]
    UnknownStat(String),

    #[error("`choice` read before any question was answered")]
    NoChoice,

    #[error("statistic `{0}` overflowed")]
    StatOverflow(String),

    #[error("movement speed must be at least 1 tick")]
    ZeroSpeed,

    #[error("{0}")]
    Raised(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("script `{script}` failed at op {pc}: {fault}")]
pub struct ScriptRuntimeError {
    pub script: String,
    pub pc: usize,
    pub fault: RuntimeFault,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("script `{script}`: {message}")]
    Parse { script: String, message: String },

    #[error(transparent)]
    Runtime(#[from] ScriptRuntimeError),
}

/// Failure to obtain a runnable program for an NPC.
#[derive(Debug, Error)]
pub enum ScriptLoadError {
    #[error(transparent)]
    Resource(#[from] ResourceLoadError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("continuation token {0} is not bound to a suspended script")]
    UnknownToken(u64),

    #[error("token {token} is awaiting {expected:?}, cannot resume with a {got} result")]
    ResultMismatch {
        token: u64,
        expected: Suspension,
        got: &'static str,
    },

    #[error("token {token}: choice {choice} is out of range for {options} options")]
    ChoiceOutOfRange {
        token: u64,
        choice: usize,
        options: usize,
    },
}

/// Anything the game session can fail with while driving a tick, an
/// interaction or a map change.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    MapLoad(#[from] MapLoadError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Resource(#[from] ResourceLoadError),

    #[error("position ({x}, {y}) lies outside map `{map}`")]
    PlayerOutOfBounds { map: String, x: u32, y: u32 },
}
