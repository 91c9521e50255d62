//! Handle types and the name→handle registries shared by the parser and
//! the VM.
//!
//! Every namespace (commands, identifiers, variables, flags) is a separate
//! newtype so a `Variable(3)` can never be mistaken for a `Flag(3)`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u32);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

handle!(
    /// Index into the VM dispatch table.
    CommandType
);
handle!(
    /// Opaque host-defined name (a stat, a side, an ailment, ...).
    Identifier
);
handle!(
    /// Host-owned integer slot, read and written through the environment.
    Variable
);
handle!(
    /// Bit mask applied to a variable's stored value.
    Flag
);

impl CommandType {
    pub const NONE: CommandType = CommandType(0);
    pub const NOP: CommandType = CommandType(1);
    pub const HOST_CALL: CommandType = CommandType(2);
    pub const GOTO: CommandType = CommandType(3);
    pub const SET: CommandType = CommandType(4);
    pub const COPY: CommandType = CommandType(5);
    pub const SET_FLAG: CommandType = CommandType(6);
    pub const CLEAR_FLAG: CommandType = CommandType(7);
    pub const ADD: CommandType = CommandType(8);
    pub const CALL: CommandType = CommandType(9);
    pub const RET: CommandType = CommandType(10);
    pub const JUMP_IF: CommandType = CommandType(11);
    pub const JUMP_IF_FLAG: CommandType = CommandType(12);
    pub const JUMP_IF_NOT_FLAG: CommandType = CommandType(13);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Exact argument count of a built-in command.
    ///
    /// `None` for `none`, for `hostCall` (any number of arguments) and for
    /// every host command, whose handlers check their own arguments.
    pub fn arity(self) -> Option<usize> {
        match self {
            Self::NOP | Self::RET => Some(0),
            Self::GOTO | Self::CALL => Some(1),
            Self::SET | Self::COPY | Self::SET_FLAG | Self::CLEAR_FLAG | Self::ADD => Some(2),
            Self::JUMP_IF | Self::JUMP_IF_FLAG | Self::JUMP_IF_NOT_FLAG => Some(3),
            _ => None,
        }
    }
}

/// First command type available to the host; everything below is built in.
pub const USER_COMMAND_OFFSET: CommandType = CommandType(14);

impl Identifier {
    /// Substituted for an optional identifier argument that was not supplied.
    pub const MISSING: Identifier = Identifier(u32::MAX);
}

impl Variable {
    /// Substituted for an optional variable argument that was not supplied.
    pub const MISSING: Variable = Variable(u32::MAX);
}

/// Simple array whose order matches the built-in command handles
/// (index == handle).
pub const BUILTIN_COMMAND_NAMES: &[&str] = &[
    "none",
    "nop",
    "hostCall",
    "goto",
    "set",
    "copy",
    "setFlag",
    "clearFlag",
    "add",
    "call",
    "ret",
    "jumpIf",
    "jumpIfFlag",
    "jumpIfNotFlag",
];

pub type CommandTypeTable = HashMap<String, CommandType>;
pub type IdentifierTable = HashMap<String, Identifier>;
pub type VariableTable = HashMap<String, Variable>;
pub type FlagTable = HashMap<String, Flag>;

/// Built-in command names and their handles.
pub fn base_command_types() -> CommandTypeTable {
    BUILTIN_COMMAND_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| (name.to_string(), CommandType(i as u32)))
        .collect()
}

/// Merge `tables` into `dst` in order; a later table replaces the handle of
/// any name it shares with an earlier one.
pub fn merge_tables<T: Copy>(
    mut dst: HashMap<String, T>,
    tables: &[&HashMap<String, T>],
) -> HashMap<String, T> {
    for table in tables {
        for (name, handle) in table.iter() {
            dst.insert(name.clone(), *handle);
        }
    }
    dst
}

/// The four lookup tables the parser resolves names against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registries {
    pub commands: CommandTypeTable,
    pub identifiers: IdentifierTable,
    pub variables: VariableTable,
    pub flags: FlagTable,
}

impl Registries {
    /// Built-in commands only; the other three namespaces start empty.
    pub fn builtin() -> Self {
        Self {
            commands: base_command_types(),
            ..Self::default()
        }
    }

    /// Built-ins with the host tables merged over them.
    pub fn with_overrides(
        commands: &CommandTypeTable,
        identifiers: &IdentifierTable,
        variables: &VariableTable,
        flags: &FlagTable,
    ) -> Self {
        Self {
            commands: merge_tables(base_command_types(), &[commands]),
            identifiers: merge_tables(IdentifierTable::new(), &[identifiers]),
            variables: merge_tables(VariableTable::new(), &[variables]),
            flags: merge_tables(FlagTable::new(), &[flags]),
        }
    }

    pub fn command_type(&self, name: &str) -> Option<CommandType> {
        self.commands.get(name).copied()
    }

    pub fn identifier(&self, name: &str) -> Option<Identifier> {
        self.identifiers.get(name).copied()
    }

    pub fn variable(&self, name: &str) -> Option<Variable> {
        self.variables.get(name).copied()
    }

    pub fn flag(&self, name: &str) -> Option<Flag> {
        self.flags.get(name).copied()
    }

    /// Reverse lookup used by the listing writer. When several names map to
    /// the same handle the alphabetically first one is returned.
    pub fn command_name(&self, ty: CommandType) -> Option<&str> {
        self.commands
            .iter()
            .filter(|(_, v)| **v == ty)
            .map(|(k, _)| k.as_str())
            .min()
    }

    /// Largest command handle any name maps to.
    pub fn max_command_type(&self) -> CommandType {
        self.commands
            .values()
            .copied()
            .max()
            .unwrap_or(CommandType::NONE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names_match_handles() {
        let table = base_command_types();
        let test_cases = vec![
            ("none", CommandType::NONE),
            ("nop", CommandType::NOP),
            ("hostCall", CommandType::HOST_CALL),
            ("goto", CommandType::GOTO),
            ("set", CommandType::SET),
            ("copy", CommandType::COPY),
            ("setFlag", CommandType::SET_FLAG),
            ("clearFlag", CommandType::CLEAR_FLAG),
            ("add", CommandType::ADD),
            ("call", CommandType::CALL),
            ("ret", CommandType::RET),
            ("jumpIf", CommandType::JUMP_IF),
            ("jumpIfFlag", CommandType::JUMP_IF_FLAG),
            ("jumpIfNotFlag", CommandType::JUMP_IF_NOT_FLAG),
        ];
        for (name, expected) in test_cases {
            assert_eq!(table.get(name), Some(&expected), "{name}");
        }
        assert_eq!(table.len(), USER_COMMAND_OFFSET.index());
    }

    #[test]
    fn test_builtin_arity() {
        let test_cases = vec![
            (CommandType::NONE, None),
            (CommandType::NOP, Some(0)),
            (CommandType::HOST_CALL, None),
            (CommandType::GOTO, Some(1)),
            (CommandType::COPY, Some(2)),
            (CommandType::CALL, Some(1)),
            (CommandType::RET, Some(0)),
            (CommandType::JUMP_IF_NOT_FLAG, Some(3)),
            (USER_COMMAND_OFFSET, None),
        ];
        for (ty, expected) in test_cases {
            assert_eq!(ty.arity(), expected, "{ty}");
        }
    }

    #[test]
    fn test_merge_later_table_wins() {
        let mut a = VariableTable::new();
        a.insert("hp".into(), Variable(1));
        a.insert("mp".into(), Variable(2));
        let mut b = VariableTable::new();
        b.insert("hp".into(), Variable(7));

        let merged = merge_tables(VariableTable::new(), &[&a, &b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["hp"], Variable(7));
        assert_eq!(merged["mp"], Variable(2));
    }

    #[test]
    fn test_override_replaces_builtin_command() {
        let mut commands = CommandTypeTable::new();
        commands.insert("goto".into(), CommandType(20));
        commands.insert("print".into(), USER_COMMAND_OFFSET);

        let reg = Registries::with_overrides(
            &commands,
            &IdentifierTable::new(),
            &VariableTable::new(),
            &FlagTable::new(),
        );
        assert_eq!(reg.command_type("goto"), Some(CommandType(20)));
        assert_eq!(reg.command_type("print"), Some(USER_COMMAND_OFFSET));
        assert_eq!(reg.command_type("set"), Some(CommandType::SET));
        assert_eq!(reg.max_command_type(), CommandType(20));
    }

    #[test]
    fn test_command_name_reverse_lookup() {
        let reg = Registries::builtin();
        assert_eq!(reg.command_name(CommandType::JUMP_IF), Some("jumpIf"));
        assert_eq!(reg.command_name(CommandType(99)), None);
    }
}
