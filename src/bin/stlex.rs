//! Command-line interface for stlex
//! Tokenizes files with a bundled or user-supplied grammar, and checks grammars for errors.
//!
//! Usage:
//!   stlex tokenize [`<path>`] [--grammar `<grammar>`] [--start `<state>`] [--format text|json] [--config `<file>`]
//!   stlex check `<grammar>`                                    - Load a grammar file and report problems
//!   stlex states [--grammar `<grammar>`]                        - List the named states of a grammar
//!
//! `<grammar>` is either the id of a bundled grammar (e.g. `stringtemplate`) or
//! a path to a `.json`, `.yaml` or `.yml` rule set.

use clap::{Arg, ArgMatches, Command};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use stlex::grammars::BundledGrammar;
use stlex::settings::Loader;
use stlex::{load_rule_set, CompiledRuleSet, RawRuleSet, Session, Token, Tokenizer};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let grammar_arg = || {
        Arg::new("grammar")
            .long("grammar")
            .short('g')
            .help("Bundled grammar id or path to a rule set file")
            .default_value("stringtemplate")
    };

    let matches = Command::new("stlex")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A rule-based lexer for syntax highlighting")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("tokenize")
                .about("Tokenize a file (or stdin) and print the tokens of each line")
                .arg(
                    Arg::new("path")
                        .help("File to tokenize; reads stdin when omitted")
                        .index(1),
                )
                .arg(grammar_arg())
                .arg(
                    Arg::new("start")
                        .long("start")
                        .help("Named state to start in (e.g. '#angle')"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .short('c')
                        .help("Settings file layered over the built-in defaults"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Load a grammar and report errors")
                .arg(
                    Arg::new("grammar")
                        .help("Bundled grammar id or path to a rule set file")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("states")
                .about("List the named states of a grammar")
                .arg(grammar_arg()),
        )
        .get_matches();

    let result = match matches.subcommand() {
        Some(("tokenize", sub)) => handle_tokenize_command(sub),
        Some(("check", sub)) => handle_check_command(arg(sub, "grammar")),
        Some(("states", sub)) => handle_states_command(arg(sub, "grammar")),
        _ => unreachable!(),
    };

    if let Err(message) = result {
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }
}

fn arg<'m>(matches: &'m ArgMatches, name: &str) -> &'m str {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .unwrap_or_default()
}

/// A grammar picked on the command line: bundled ones are `'static`, files
/// are loaded and owned here.
enum LoadedGrammar {
    Bundled(&'static CompiledRuleSet),
    File(CompiledRuleSet),
}

impl LoadedGrammar {
    fn rules(&self) -> &CompiledRuleSet {
        match self {
            LoadedGrammar::Bundled(rules) => *rules,
            LoadedGrammar::File(rules) => rules,
        }
    }
}

fn load_grammar(spec: &str) -> Result<LoadedGrammar, String> {
    if let Some(bundled) = BundledGrammar::from_id(spec) {
        return bundled
            .rules()
            .map(LoadedGrammar::Bundled)
            .map_err(|e| format!("bundled grammar '{}': {}", spec, e));
    }

    let source =
        std::fs::read_to_string(spec).map_err(|e| format!("reading grammar '{}': {}", spec, e))?;
    let raw = match Path::new(spec).extension().and_then(|ext| ext.to_str()) {
        Some("yaml") | Some("yml") => RawRuleSet::from_yaml(&source),
        _ => RawRuleSet::from_json(&source),
    }
    .map_err(|e| format!("{}: {}", spec, e))?;

    load_rule_set(&raw)
        .map(LoadedGrammar::File)
        .map_err(|e| format!("{}: {}", spec, e))
}

#[derive(Serialize)]
struct LineOutput<'a> {
    line: usize,
    tokens: &'a [Token],
}

/// Handle the tokenize command
fn handle_tokenize_command(matches: &ArgMatches) -> Result<(), String> {
    let grammar = load_grammar(arg(matches, "grammar"))?;

    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    let settings = loader
        .build()
        .map_err(|e| format!("loading settings: {}", e))?;

    let source = match matches.get_one::<String>("path") {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("reading '{}': {}", path, e))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("reading stdin: {}", e))?;
            buffer
        }
    };

    let tokenizer = Tokenizer::with_settings(grammar.rules(), settings.tokenizer);
    let mut session = match matches.get_one::<String>("start") {
        Some(state) => Session::starting_at(tokenizer, state)
            .ok_or_else(|| format!("grammar has no state named '{}'", state))?,
        None => Session::new(tokenizer),
    };
    let lines = session.tokenize_document(&source);

    match arg(matches, "format") {
        "json" => {
            let output: Vec<LineOutput> = lines
                .iter()
                .enumerate()
                .map(|(i, tokens)| LineOutput {
                    line: i + 1,
                    tokens,
                })
                .collect();
            let json = serde_json::to_string_pretty(&output)
                .map_err(|e| format!("serializing tokens: {}", e))?;
            println!("{}", json);
        }
        _ => {
            for (i, tokens) in lines.iter().enumerate() {
                println!("{}:", i + 1);
                for token in tokens {
                    println!("  {:<60} {:?}", token.kind(), token.value);
                }
            }
        }
    }

    let stats = session.stats();
    if stats.totals.stalls > 0 {
        eprintln!(
            "note: {} character(s) matched no rule and no default token",
            stats.totals.stalls
        );
    }
    Ok(())
}

/// Handle the check command
fn handle_check_command(spec: &str) -> Result<(), String> {
    let grammar = load_grammar(spec)?;
    let rules = grammar.rules();
    println!(
        "{}: ok ({} named states, {} states in total, {} patterns)",
        spec,
        rules.state_names().count(),
        rules.state_count(),
        rules.pattern_count()
    );
    Ok(())
}

/// Handle the states command
fn handle_states_command(spec: &str) -> Result<(), String> {
    let grammar = load_grammar(spec)?;
    let rules = grammar.rules();
    for name in rules.state_names() {
        let rule_count = rules
            .state_id(name)
            .map(|id| rules.state(id).rules.len())
            .unwrap_or_default();
        println!("{:<32} {} rules", name, rule_count);
    }
    Ok(())
}
