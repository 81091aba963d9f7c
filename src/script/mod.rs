//! NPC behaviour scripts: source → AST → op list → suspendable context.
pub mod assembler;
pub mod ast;
pub mod capability;
pub mod lexer;
pub mod parser;
pub mod scheduler;
pub mod vm;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::content::{ContentKind, ContentSource};
use crate::error::ScriptLoadError;
use assembler::Program;

/// Compile a script source in one go.
pub fn compile(name: &str, src: &str) -> Result<Program, ScriptLoadError> {
    let script = parser::parse_script(name, src)?;
    Ok(assembler::assemble(&script))
}

/// Compiled programs by script name. A failed load is not cached, so a fixed
/// file is picked up on the next interaction.
#[derive(Debug, Default)]
pub struct ScriptLibrary {
    programs: HashMap<String, Arc<Program>>,
}

impl ScriptLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(
        &mut self,
        name: &str,
        content: &dyn ContentSource,
    ) -> Result<Arc<Program>, ScriptLoadError> {
        if let Some(program) = self.programs.get(name) {
            return Ok(Arc::clone(program));
        }
        let src = content.read(ContentKind::Script, name)?;
        let program = Arc::new(compile(name, &src)?);
        debug!(script = name, ops = program.len(), "script compiled");
        self.programs.insert(name.to_string(), Arc::clone(&program));
        Ok(program)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Forget every compiled program.
    pub fn clear(&mut self) {
        self.programs.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemorySource;
    use crate::error::{ResourceLoadError, ScriptError};

    #[test]
    fn test_library_caches_programs() {
        let mut content = MemorySource::new().with(ContentKind::Script, "greeter", "say {hi}");
        let mut library = ScriptLibrary::new();
        let first = library.load("greeter", &content).unwrap();

        content.insert(ContentKind::Script, "greeter", "say {changed}");
        let second = library.load("greeter", &content).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_library_errors() {
        let content = MemorySource::new().with(ContentKind::Script, "broken", "dance");
        let mut library = ScriptLibrary::new();
        assert!(matches!(
            library.load("missing", &content),
            Err(ScriptLoadError::Resource(ResourceLoadError::Missing { .. }))
        ));
        assert!(matches!(
            library.load("broken", &content),
            Err(ScriptLoadError::Script(ScriptError::Parse { .. }))
        ));
        assert!(library.is_empty());
    }
}
