//! Command-line interface for cligram
//! Compiles a grammar file, then prints it, or matches, completes and evaluates lines against it.
//!
//! Usage:
//!   cligram `<grammar>` --print | --brief | --dump | --list-trees   - Show the compiled grammar
//!   cligram `<grammar>` --match `<line>` [--json]                     - Match a line, no callbacks run
//!   cligram `<grammar>` --complete `<line>` [--json]                  - List completion candidates
//!   cligram `<grammar>` < script                                      - Evaluate every line of stdin

mod report;

use clap::{Arg, ArgAction, ArgMatches, Command};
use cligram_config::{CligramConfig, Loader};
use cligram_engine::printing::{dump_tree, print_trees};
use cligram_engine::{
    complete, eval, match_line, CallbackResult, CgVar, Compiler, Cvec, Grammar, MatchOptions,
    Registry,
};
use report::LineReport;
use std::io::BufRead;
use tracing::{debug, info, Level};

fn cli() -> Command {
    Command::new("cligram")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile a command-line grammar and run lines against it")
        .arg(
            Arg::new("grammar")
                .help("Path to the grammar file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .short('t')
                .help("Tree to match against (default: session.tree from the configuration)"),
        )
        .arg(
            Arg::new("print")
                .long("print")
                .help("Print the compiled grammar in full")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("brief")
                .long("brief")
                .help("Print the compiled grammar without types, help and callbacks")
                .action(ArgAction::SetTrue)
                .conflicts_with("print"),
        )
        .arg(
            Arg::new("dump")
                .long("dump")
                .help("Dump the structure of every tree")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-trees")
                .long("list-trees")
                .help("List the tree names")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("match")
                .long("match")
                .short('m')
                .value_name("LINE")
                .help("Match a line without running its callbacks (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("complete")
                .long("complete")
                .value_name("LINE")
                .help("List completions for the end of a line (repeatable)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Report --match and --complete results as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("Configuration file layered over the defaults"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log to stderr: -v for debug, -vv for trace")
                .action(ArgAction::Count),
        )
}

fn main() {
    let matches = cli().get_matches();

    let level = match matches.get_count("verbose") {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&matches);
    let path = matches
        .get_one::<String>("grammar")
        .expect("grammar is a required argument");
    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path, e);
        std::process::exit(1);
    });
    let grammar = Compiler::new(registry()).compile(&source).unwrap_or_else(|e| {
        eprintln!("{}: {}", path, e.with_context(&source));
        std::process::exit(1);
    });
    info!(path = %path, trees = grammar.len(), "loaded grammar");

    let mut acted = false;
    if matches.get_flag("print") || matches.get_flag("brief") {
        print!("{}", print_trees(&grammar, matches.get_flag("brief")));
        acted = true;
    }
    if matches.get_flag("dump") {
        for tree in grammar.trees() {
            print!("{}", dump_tree(tree));
        }
        acted = true;
    }
    if matches.get_flag("list-trees") {
        for name in grammar.tree_names() {
            println!("{}", name);
        }
        acted = true;
    }

    let tree = config.session.tree.as_str();
    let opts = config.match_options();
    let lines = |id: &str| -> Vec<String> {
        matches
            .get_many::<String>(id)
            .map(|values| values.cloned().collect())
            .unwrap_or_default()
    };
    let to_match = lines("match");
    let to_complete = lines("complete");

    let ok = if to_match.is_empty() && to_complete.is_empty() {
        if acted {
            true
        } else {
            let prompt = grammar.global("prompt").unwrap_or(config.session.prompt.as_str());
            run_script(&grammar, tree, prompt, &opts)
        }
    } else {
        handle_queries(&grammar, tree, &opts, &to_match, &to_complete, matches.get_flag("json"))
    };

    if !ok {
        std::process::exit(1);
    }
}

/// Defaults, then `--config`, then `CLIGRAM_*` variables, then `--tree`.
fn load_config(matches: &ArgMatches) -> CligramConfig {
    let mut loader = Loader::new();
    if let Some(file) = matches.get_one::<String>("config") {
        loader = loader.with_file(file);
    }
    let loader = loader.with_env();
    let loaded = match matches.get_one::<String>("tree") {
        Some(tree) => loader.with_tree(tree).and_then(Loader::build),
        None => loader.build(),
    };
    loaded.unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    })
}

/// Built-in types plus the `print` and `echo` callbacks.
fn registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .register_callback("print", |vars: &Cvec, _: &Cvec| -> CallbackResult {
            print!("{}", vars);
            Ok(())
        })
        .register_callback("echo", |_: &Cvec, args: &Cvec| -> CallbackResult {
            let words: Vec<String> = args.iter().map(CgVar::to_text).collect();
            println!("{}", words.join(" "));
            Ok(())
        });
    registry
}

/// Evaluate stdin line by line, echoing each command after the prompt. Blank lines and `#`
/// comments are skipped. Returns whether every line succeeded.
fn run_script(grammar: &Grammar, tree: &str, prompt: &str, opts: &MatchOptions) -> bool {
    let mut ok = true;
    for (number, line) in std::io::stdin().lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                eprintln!("Error reading stdin: {}", e);
                return false;
            }
        };
        let command = line.trim();
        if command.is_empty() || command.starts_with('#') {
            continue;
        }
        println!("{}{}", prompt, command);
        match eval(grammar, tree, command, opts) {
            Ok(m) => debug!(line = number + 1, callbacks = m.callbacks.len(), "evaluated"),
            Err(e) => {
                eprintln!("line {}: {}", number + 1, e);
                ok = false;
            }
        }
    }
    ok
}

fn handle_queries(
    grammar: &Grammar,
    tree: &str,
    opts: &MatchOptions,
    to_match: &[String],
    to_complete: &[String],
    json: bool,
) -> bool {
    let mut reports = Vec::new();
    for line in to_match {
        reports.push(match match_line(grammar, tree, line, opts) {
            Ok(m) => LineReport::matched(line, &m),
            Err(e) => LineReport::failed(line, &e),
        });
    }
    for line in to_complete {
        reports.push(match complete(grammar, tree, line, opts) {
            Ok(c) => LineReport::completed(line, &c),
            Err(e) => LineReport::failed(line, &e),
        });
    }
    let ok = !reports
        .iter()
        .any(|r| matches!(r, LineReport::Failed { .. }));

    if json {
        match serde_json::to_string_pretty(&reports) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error formatting results: {}", e);
                return false;
            }
        }
        return ok;
    }

    for report in &reports {
        match report {
            LineReport::Matched { path, vars, .. } => {
                println!("{}", path.join(" "));
                for (i, var) in vars.iter().enumerate() {
                    println!("  {} : {} = {}", i, var.name.as_deref().unwrap_or(""), var.value);
                }
            }
            LineReport::Completed { candidates, .. } => {
                for candidate in candidates {
                    match &candidate.help {
                        Some(help) => println!("{:<20} {}", candidate.text, help),
                        None => println!("{}", candidate.text),
                    }
                }
            }
            LineReport::Failed { line, error, .. } => eprintln!("{}: {}", line, error),
        }
    }
    ok
}
