use std::fs;
use std::path::Path;

use fxscript::config::{self, load_from_json};
use fxscript::model::{CommandType, Flag, Identifier, Variable};

#[test]
fn loads_host_tables() {
    let json = fs::read_to_string("tests/host_tables.json").unwrap();
    let config = load_from_json(&json).expect("valid config");

    assert_eq!(config.commands.len(), 3);
    assert_eq!(config.lookahead.batch, 8);
    assert_eq!(config.lookahead.capacity, 64);

    let reg = config.registries();
    assert_eq!(reg.command_type("print"), Some(CommandType(14)));
    assert_eq!(reg.command_type("damage"), Some(CommandType(15)));
    assert_eq!(reg.command_type("jump"), Some(CommandType::GOTO));
    assert_eq!(reg.command_type("setFlag"), Some(CommandType::SET_FLAG));
    assert_eq!(reg.identifier("TARGET"), Some(Identifier(1)));
    assert_eq!(reg.variable("turns"), Some(Variable(2)));
    assert_eq!(reg.flag("ASLEEP"), Some(Flag(2)));
    assert_eq!(reg.max_command_type(), CommandType(15));
}

#[test]
fn load_by_path_matches_load_from_json() {
    let path = Path::new("tests/host_tables.json");
    let from_path = config::load(path).unwrap();
    let from_str = load_from_json(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(from_path, from_str);
}

#[test]
fn compiles_with_host_names() {
    let json = fs::read_to_string("tests/host_tables.json").unwrap();
    let config = load_from_json(&json).unwrap();
    let reg = config.registries();

    let src = "damage TARGET, hp, 5\nsetFlag status, POISONED\njump done\nprint \"skipped\"\ndone:";
    let script = fxscript::compile(src, &reg, config.lookahead).unwrap();
    assert_eq!(script.len(), 4);
    assert_eq!(script.commands()[0].ty, CommandType(15));
    assert_eq!(script.commands()[2].ty, CommandType::GOTO);
    assert_eq!(script.label("done"), Some(4));
}
