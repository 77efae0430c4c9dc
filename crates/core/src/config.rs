//! Engine configuration
//!
//! Settings can be built in code or read from a TOML file:
//!
//! ```toml
//! # Maximum number of elements on the data stack (omit for unbounded)
//! stack_limit = 100
//! # Maximum nesting of defined-function calls
//! max_call_depth = 256
//! ```
//!
//! ```rust,ignore
//! let config = EngineConfig::new().with_stack_limit(100);
//! let mut stack = config.stack();
//! let mut engine = config.engine(Registry::with_builtins());
//! ```

use crate::engine::{DEFAULT_MAX_CALL_DEPTH, Engine, Registry};
use crate::error::{LanguageError, Result};
use crate::stack::Stack;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Data stack capacity; `None` is unbounded
    pub stack_limit: Option<usize>,
    /// Bound on nested defined-function invocations
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            stack_limit: None,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the data stack (builder pattern)
    pub fn with_stack_limit(mut self, limit: usize) -> Self {
        self.stack_limit = Some(limit);
        self
    }

    /// Bound call nesting (builder pattern)
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| LanguageError::argument(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML settings file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LanguageError::argument(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(LanguageError::argument(
                "max_call_depth must be at least 1.",
            ));
        }
        Ok(())
    }

    /// An empty stack with the configured capacity
    pub fn stack(&self) -> Stack {
        match self.stack_limit {
            Some(limit) => Stack::bounded(limit),
            None => Stack::new(),
        }
    }

    /// An engine over `registry` with the configured call bound
    pub fn engine(&self, registry: Registry) -> Engine {
        Engine::new(registry).with_max_call_depth(self.max_call_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.stack_limit, None);
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
        assert_eq!(config.stack().capacity(), usize::MAX);
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::new()
            .with_stack_limit(10)
            .with_max_call_depth(5);
        assert_eq!(config.stack().capacity(), 10);
        assert_eq!(config.engine(Registry::new()).max_call_depth(), 5);
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml("stack_limit = 3\n").unwrap();
        assert_eq!(config.stack_limit, Some(3));
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);

        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_from_toml_rejects_bad_input() {
        let err = EngineConfig::from_toml("stack_limit = \"lots\"").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Argument);
        assert!(EngineConfig::from_toml("colour = true").is_err());
        assert!(EngineConfig::from_toml("max_call_depth = 0").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_call_depth = 64").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.max_call_depth, 64);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = EngineConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Argument);
    }
}
