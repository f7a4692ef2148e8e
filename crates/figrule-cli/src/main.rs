use clap::{Parser, Subcommand};
use figrule_engine::{ConflictThresholds, EngineError, Evaluator};
use figrule_rules::{load_rules, Framework, Rule};
use figrule_tree::{normalize_root, parse_document, NormalizeContext, RawNode, DEFAULT_ICON_MAX_SIZE};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "figrule")]
#[command(about = "figrule: design tree normalizer and mapping rule engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize a design tree and print it as JSON
    Normalize {
        /// Design document (.json)
        tree: String,

        /// Largest width/height at which a vector counts as an icon
        #[arg(long, default_value_t = DEFAULT_ICON_MAX_SIZE)]
        icon_max_size: f64,
    },

    /// Evaluate mapping rules against every node of a design tree
    Evaluate {
        /// Design document (.json)
        tree: String,

        /// Rule files, concatenated in the order given
        #[arg(long, required = true, num_args = 1..)]
        rules: Vec<String>,

        /// Target framework (react-tailwind, react-tailwind-v4, html-css, ...)
        #[arg(long)]
        framework: String,

        /// Only print the result for this node id
        #[arg(long)]
        node: Option<String>,

        /// Contributors per property at which a conflict is reported
        #[arg(long, default_value_t = 2)]
        moderate_at: usize,

        /// Contributors per property at which a conflict is severe
        #[arg(long, default_value_t = 3)]
        severe_at: usize,
    },

    /// Validate rule files without evaluating anything
    CheckRules {
        /// Rule files (.json)
        #[arg(required = true)]
        files: Vec<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Normalize {
            tree,
            icon_max_size,
        } => cmd_normalize(&tree, icon_max_size),
        Command::Evaluate {
            tree,
            rules,
            framework,
            node,
            moderate_at,
            severe_at,
        } => cmd_evaluate(&tree, &rules, &framework, node.as_deref(), moderate_at, severe_at),
        Command::CheckRules { files } => cmd_check_rules(&files),
    }
}

fn read_source(path: &str) -> String {
    let p = Path::new(path);
    if !p.exists() {
        eprintln!("Error: file not found: {path}");
        std::process::exit(1);
    }
    match std::fs::read_to_string(p) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            std::process::exit(1);
        }
    }
}

fn read_tree(path: &str) -> RawNode {
    match parse_document(&read_source(path)) {
        Ok(raw) => raw,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error serializing output: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_normalize(path: &str, icon_max_size: f64) {
    let raw = read_tree(path);
    let mut ctx = NormalizeContext::new().with_icon_max_size(icon_max_size);
    let root = normalize_root(&raw, &mut ctx);

    print_json(&root);

    let stats = ctx.stats();
    eprintln!(
        "Normalized: {} nodes ({} hidden skipped, {} groups inlined, {} icons)",
        stats.nodes, stats.hidden_skipped, stats.groups_inlined, stats.icons
    );
}

fn cmd_evaluate(
    path: &str,
    rule_files: &[String],
    framework: &str,
    node: Option<&str>,
    moderate_at: usize,
    severe_at: usize,
) {
    let framework: Framework = match framework.parse() {
        Ok(fw) => fw,
        Err(e) => {
            let known: Vec<&str> = Framework::ALL.iter().map(|fw| fw.as_str()).collect();
            eprintln!(
                "Error: {} (expected one of: {})",
                EngineError::from(e),
                known.join(", ")
            );
            std::process::exit(1);
        }
    };

    let thresholds = match ConflictThresholds::new(moderate_at, severe_at) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", EngineError::from(e));
            std::process::exit(1);
        }
    };

    let mut rules: Vec<Rule> = Vec::new();
    for file in rule_files {
        match load_rules(&read_source(file)) {
            Ok(load) => {
                tracing::debug!(file = %file, accepted = load.rules.len(), "loaded rule file");
                if !load.rejected.is_empty() {
                    eprintln!("Warning: {file}: {} rule(s) rejected", load.rejected.len());
                }
                rules.extend(load.rules);
            }
            Err(e) => {
                eprintln!("Rule error in {file}: {e}");
                std::process::exit(1);
            }
        }
    }

    let raw = read_tree(path);
    let Some(root) = figrule_tree::transform(&raw) else {
        eprintln!("Error: root node of {path} is hidden; nothing to evaluate");
        std::process::exit(1);
    };

    let evaluator = Evaluator::new(&rules, framework).with_thresholds(thresholds);

    match node {
        Some(id) => match root.find_with_parent(id) {
            Some((target, parent)) => print_json(&evaluator.evaluate_node(target, parent)),
            None => {
                eprintln!("Error: no visible node with id {id}");
                std::process::exit(1);
            }
        },
        None => print_json(&evaluator.evaluate_tree(&root)),
    }

    eprintln!(
        "Evaluated {} nodes against {} enabled rules for {framework}",
        root.count(),
        evaluator.rule_count()
    );
}

fn cmd_check_rules(files: &[String]) {
    let mut failed = false;

    for file in files {
        match load_rules(&read_source(file)) {
            Ok(load) => {
                for rejected in &load.rejected {
                    let id = rejected.id.as_deref().unwrap_or("<no id>");
                    eprintln!("{file}[{}] {id}: {}", rejected.index, rejected.error);
                }
                for rule in &load.rules {
                    if let Some(name) = rule.selector.name.as_ref().filter(|n| !n.is_valid()) {
                        eprintln!(
                            "{file}: warning: {}: name pattern '{}' does not compile and never matches",
                            rule.id,
                            name.source()
                        );
                    }
                }
                eprintln!(
                    "{file}: {} accepted, {} rejected",
                    load.rules.len(),
                    load.rejected.len()
                );
                failed |= !load.is_clean();
            }
            Err(e) => {
                eprintln!("{file}: {e}");
                failed = true;
            }
        }
    }

    if failed {
        std::process::exit(1);
    }
}
