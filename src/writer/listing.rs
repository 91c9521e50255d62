//! Human-readable listing: one line per command, labels on their own line
//! above the address they name.

use crate::model::Registries;
use crate::processor::ast::Script;
use std::io::{self, Write};

pub fn emit(script: &Script, registries: &Registries, mut out: impl Write) -> io::Result<()> {
    for (pc, cmd) in script.commands().iter().enumerate() {
        labels(script, pc, &mut out)?;

        let name = match registries.command_name(cmd.ty) {
            Some(name) => name.to_string(),
            None => format!("cmd({})", cmd.ty),
        };
        let args: Vec<String> = cmd.args.iter().map(|a| a.to_string()).collect();
        if args.is_empty() {
            writeln!(out, "{pc:04}  {name}")?;
        } else {
            writeln!(out, "{pc:04}  {name} {}", args.join(", "))?;
        }
    }
    // Labels on the end-of-script address.
    labels(script, script.end_of_script(), &mut out)?;
    writeln!(out, "{:04}  <end>", script.end_of_script())
}

fn labels(script: &Script, pc: usize, out: &mut impl Write) -> io::Result<()> {
    for name in script.labels_at(pc) {
        writeln!(out, "{name}:")?;
    }
    Ok(())
}
