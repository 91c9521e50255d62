//! Machine-readable dump of a compiled script.

use crate::processor::ast::Script;
use std::io::{self, Write};

pub fn emit(script: &Script, mut out: impl Write) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, script)?;
    writeln!(out)
}
