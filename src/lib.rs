//! Small embeddable command-script engine.
//!
//! Source text is compiled by [`processor`] into a flat [`Script`] of
//! commands and then executed by a [`vm::Runtime`] against a host
//! [`vm::Environment`]. Hosts extend the language with their own command,
//! identifier, variable and flag names (see [`config`]) and bind a handler
//! to every command type they add.

pub mod cli;
pub mod config;
pub mod model;
pub mod processor;
pub mod vm;
pub mod writer;

pub use model::Registries;
pub use processor::{Script, SyntaxError, compile};
pub use vm::{Environment, Flow, Frame, MemoryEnvironment, Runtime, RuntimeBuilder, RuntimeError};

use anyhow::Context;
use clap::Parser;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Emit;
use crate::model::{CommandType, USER_COMMAND_OFFSET};

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_logging(args.verbose);

    // 1. ── Load ───────────────────────────────────────────────────────
    let source = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Reading {}", args.input.display()))?;
    let config = match &args.config {
        Some(path) => config::load(path)?,
        None => config::HostConfig::default(),
    };
    let registries = config.registries();

    // 2. ── Compile ────────────────────────────────────────────────────
    let script = compile(&source, &registries, config.lookahead)
        .with_context(|| format!("Compiling {}", args.input.display()))?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    if args.emit.is_some() || args.run.is_none() {
        let mut out: Box<dyn Write> = match &args.output {
            Some(path) => Box::new(BufWriter::new(
                File::create(path).with_context(|| format!("Creating {}", path.display()))?,
            )),
            None => Box::new(io::stdout().lock()),
        };
        let written = match args.emit.unwrap_or(Emit::Listing) {
            Emit::Listing => writer::listing::emit(&script, &registries, &mut out),
            Emit::Json => writer::json::emit(&script, &mut out),
        };
        written
            .and_then(|()| out.flush())
            .with_context(|| "Writing compiled script")?;
    }

    // 4. ── Execute ────────────────────────────────────────────────────
    if let Some(entry) = &args.run {
        execute(script, &registries, entry.as_deref())?;
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

/// Run against an in-memory environment. Host commands only log their
/// evaluated arguments.
fn execute(script: Script, registries: &Registries, entry: Option<&str>) -> anyhow::Result<()> {
    let mut builder = RuntimeBuilder::<MemoryEnvironment>::new(script);
    for raw in USER_COMMAND_OFFSET.0..=registries.max_command_type().0 {
        let ty = CommandType(raw);
        let name = registries.command_name(ty).unwrap_or("?").to_string();
        builder.register(ty, move |frame, args| {
            let values = frame.evaluate(args)?;
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            info!(pc = frame.pc(), command = %name, args = %rendered.join(", "), "dry run");
            Ok(Flow::Next)
        });
    }
    let runtime = builder.build().context("Building dispatch table")?;

    let mut env = MemoryEnvironment::new();
    let outcome = match entry {
        Some(label) => runtime.call(label, &mut env),
        None => runtime.start(0, &mut env),
    };
    outcome.context("Running script")?;

    let mut names: Vec<(&str, i32)> = env
        .values()
        .iter()
        .map(|(var, value)| {
            let name = registries
                .variables
                .iter()
                .filter(|(_, v)| *v == var)
                .map(|(n, _)| n.as_str())
                .min()
                .unwrap_or("?");
            (name, *value)
        })
        .collect();
    names.sort_unstable();
    for (name, value) in names {
        println!("{name} = {value}");
    }
    Ok(())
}
