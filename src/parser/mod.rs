//! JSON documents → typed model.
//!
//! Every loader takes the content name so errors can say which file broke.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::content::ContentKind;
use crate::error::{MapFormatError, MapLoadError, ResourceLoadError};
use crate::model::{MapFile, SaveFile, TilesetFile};
use crate::world::tile::Tileset;

/// Parse a map document. Structural checks against the tileset happen in
/// `Map::from_file`; this only deals with the JSON shape.
pub fn load_map_file(name: &str, json: &str) -> Result<MapFile, MapFormatError> {
    let file: MapFile = serde_json::from_str(json).map_err(|source| MapFormatError::Json {
        map: name.to_string(),
        source,
    })?;
    debug!(
        map = name,
        bytes = json.len(),
        layers = file.map_data.tile.len(),
        npcs = file.map_data.npcs.len(),
        connections = file.map_data.connections.len(),
        "map document parsed"
    );
    Ok(file)
}

/// Parse a tileset document. The tileset is known by `name`, the name maps
/// refer to it with; a different `name` declared inside the file is ignored.
pub fn load_tileset(name: &str, json: &str) -> Result<Tileset, MapLoadError> {
    let file: TilesetFile =
        serde_json::from_str(json).map_err(|source| ResourceLoadError::Malformed {
            kind: ContentKind::Tileset,
            name: name.to_string(),
            source,
        })?;
    if file.name != name {
        warn!(
            tileset = name,
            declared = %file.name,
            "tileset file declares a different name"
        );
    }
    let file = TilesetFile {
        name: name.to_string(),
        ..file
    };
    Ok(Tileset::from_file(file)?)
}

/// Savefiles never fail a load: a malformed document is logged and replaced
/// by the defaults.
pub fn parse_savefile(json: &str) -> SaveFile {
    match serde_json::from_str(json) {
        Ok(save) => save,
        Err(err) => {
            warn!(error = %err, "savefile is malformed, starting from defaults");
            SaveFile::default()
        }
    }
}

/// The item catalog is an object keyed by item id; values are opaque to the core.
pub fn load_item_catalog(name: &str, json: &str) -> Result<BTreeMap<String, Value>, ResourceLoadError> {
    let root: Value = serde_json::from_str(json).map_err(|source| ResourceLoadError::Malformed {
        kind: ContentKind::Catalog,
        name: name.to_string(),
        source,
    })?;

    let entries = match root {
        Value::Object(entries) => entries,
        other => {
            warn!(catalog = name, found = %type_name(&other), "item catalog is not an object");
            return Ok(BTreeMap::new());
        }
    };

    debug!(catalog = name, items = entries.len(), "item catalog parsed");
    Ok(entries.into_iter().collect())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
