//! Command string parsing.
//!
//! Commands are whitespace-separated `-name=value` or `-name` tokens,
//! e.g. `-metadata=async -hash -scanAnnotated=com.example`.

use crate::core::{Error, Result};
use std::collections::BTreeMap;

/// Command controlling where metadata is resolved.
pub const METADATA_COMMAND: &str = "metadata";

/// Command enabling content hashes on dispatched events.
pub const HASH_COMMAND: &str = "hash";

/// When metadata providers are consulted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MetadataMode {
    /// On the calling task, inside its request scope
    #[default]
    Sync,
    /// On the dispatch worker
    Async,
}

/// Parsed command set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Commands {
    values: BTreeMap<String, Option<String>>,
}

impl Commands {
    /// Parse a command string. Later tokens override earlier ones.
    pub fn parse(input: &str) -> Result<Self> {
        let mut values = BTreeMap::new();

        for token in input.split_whitespace() {
            let body = token
                .strip_prefix('-')
                .ok_or_else(|| Error::InvalidCommand(format!("expected leading '-': {}", token)))?;

            let (name, value) = match body.split_once('=') {
                Some((name, value)) => (name, Some(value.to_string())),
                None => (body, None),
            };

            if name.is_empty() {
                return Err(Error::InvalidCommand(format!("empty command name: {}", token)));
            }
            values.insert(name.to_string(), value);
        }

        Ok(Self { values })
    }

    /// Value of `-name=value`; `None` for absent or bare flags.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(|v| v.as_deref())
    }

    /// Whether `name` appears at all.
    pub fn is_set(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of distinct commands.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no commands were given.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Metadata mode selected by `-metadata=`.
    pub fn metadata_mode(&self) -> Result<MetadataMode> {
        match self.get(METADATA_COMMAND) {
            None | Some("sync") => Ok(MetadataMode::Sync),
            Some("async") => Ok(MetadataMode::Async),
            Some(other) => Err(Error::InvalidCommand(format!(
                "unknown metadata mode: {}",
                other
            ))),
        }
    }

    /// Whether `-hash` (or `-hash=true`) asks for content hashes.
    pub fn hash_events(&self) -> Result<bool> {
        if !self.is_set(HASH_COMMAND) {
            return Ok(false);
        }
        match self.get(HASH_COMMAND) {
            None | Some("true") => Ok(true),
            Some("false") => Ok(false),
            Some(other) => Err(Error::InvalidCommand(format!("invalid hash flag: {}", other))),
        }
    }
}
