//! Savefile writer.

use tracing::info;

use crate::content::{ContentKind, ContentSource};
use crate::error::ResourceLoadError;
use crate::model::SaveFile;

pub fn emit(
    save: &SaveFile,
    name: &str,
    content: &mut dyn ContentSource,
) -> Result<(), ResourceLoadError> {
    let json = serde_json::to_string_pretty(save).map_err(|source| ResourceLoadError::Malformed {
        kind: ContentKind::Savefile,
        name: name.to_string(),
        source,
    })?;
    content.write(ContentKind::Savefile, name, &json)?;
    info!(savefile = name, "game saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemorySource;
    use crate::model::GridPos;
    use crate::parser::parse_savefile;

    #[test]
    fn test_written_savefile_parses_back() {
        let mut content = MemorySource::new();
        let mut save = SaveFile {
            current_map: Some("house".into()),
            player_current_pos: Some(GridPos::new(3, 4)),
            ..SaveFile::default()
        };
        save.flags.insert("flag_met".into());
        emit(&save, "Savegame.json", &mut content).unwrap();

        let text = content.get(ContentKind::Savefile, "Savegame.json").unwrap();
        assert!(text.contains("\"currentMap\""));
        assert_eq!(parse_savefile(text), save);
    }
}
