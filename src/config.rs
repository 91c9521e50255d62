use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use crate::model::{
    CommandTypeTable, FlagTable, IdentifierTable, Registries, USER_COMMAND_OFFSET, VariableTable,
};
use crate::processor::LookaheadConfig;

/// Host extension tables plus parser tunables, read from JSON.
///
/// Every field is optional; a missing table is empty and a missing
/// `lookahead` block uses the default buffer sizes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub commands: CommandTypeTable,
    pub identifiers: IdentifierTable,
    pub variables: VariableTable,
    pub flags: FlagTable,
    pub lookahead: LookaheadConfig,
}

impl HostConfig {
    /// Host tables merged over the built-in command names.
    pub fn registries(&self) -> Registries {
        Registries::with_overrides(
            &self.commands,
            &self.identifiers,
            &self.variables,
            &self.flags,
        )
    }
}

pub fn load_from_json(json: &str) -> Result<HostConfig> {
    let config: HostConfig = serde_json::from_str(json).context("Failed to parse host config")?;

    let mut zero_flags: Vec<&str> = config
        .flags
        .iter()
        .filter(|(_, flag)| flag.0 == 0)
        .map(|(name, _)| name.as_str())
        .collect();
    zero_flags.sort_unstable();
    for name in zero_flags {
        warn!(flag = name, "flag has handle 0 and can never test true");
    }

    let mut shadowing: Vec<(&str, u32)> = config
        .commands
        .iter()
        .filter(|(_, ty)| **ty < USER_COMMAND_OFFSET)
        .map(|(name, ty)| (name.as_str(), ty.0))
        .collect();
    shadowing.sort_unstable();
    for (name, ty) in shadowing {
        warn!(command = name, handle = ty, "host command uses a built-in handle");
    }

    if config.lookahead.capacity <= config.lookahead.batch {
        warn!(
            batch = config.lookahead.batch,
            capacity = config.lookahead.capacity,
            "lookahead capacity does not exceed the batch size"
        );
    }

    debug!(
        commands = config.commands.len(),
        identifiers = config.identifiers.len(),
        variables = config.variables.len(),
        flags = config.flags.len(),
        "host config loaded"
    );
    Ok(config)
}

pub fn load(path: &Path) -> Result<HostConfig> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Reading config {}", path.display()))?;
    load_from_json(&json).with_context(|| format!("Loading config {}", path.display()))
}
