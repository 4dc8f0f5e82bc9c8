//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use search_tree_explorer::core::config::Config;
use search_tree_explorer::core::errors::StxError;
use search_tree_explorer::explorer::commands::{COMMANDS, Command as ExplorerCommand};
use search_tree_explorer::explorer::model::{
    ExplorerModel, ExplorerMsg, ExplorerSettings, ExplorerSnapshot,
};
use search_tree_explorer::explorer::update::update;
use search_tree_explorer::logger::activity::{ActivityEvent, ActivityLog, outcome_label};
use search_tree_explorer::navigation::solution::{BranchKind, classify};
use search_tree_explorer::playback::controller::{Direction, PlaybackReport};
use search_tree_explorer::playback::runner::{PlaybackObserver, PlaybackRunner};
use search_tree_explorer::playback::signals::cancel_on_signals;
use search_tree_explorer::tree::index::TreeIndex;
use search_tree_explorer::tree::node::{Core, NodeId};
use search_tree_explorer::tree::synthetic::{GeneratorOptions, generate as generate_tree};

/// Search Tree Explorer: inspect, navigate and play back solver search trees.
#[derive(Debug, Parser)]
#[command(
    name = "stx",
    author,
    version,
    about = "Search Tree Explorer - solver search tree navigation and playback",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Quiet mode (results and errors only).
    #[arg(short, long, global = true)]
    quiet: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Show tree aggregates: size, solvability, solution path, failed branches.
    Inspect(InspectArgs),
    /// Apply navigation commands and print each selection.
    Navigate(NavigateArgs),
    /// Play the selection toward the solution (or back to the root).
    Play(PlayArgs),
    /// List the command registry with default key bindings.
    Commands,
    /// Emit a synthetic solver tree as JSON.
    Generate(GenerateArgs),
    /// Show the effective configuration.
    Config,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct InspectArgs {
    /// Solver tree JSON file (`-` for stdin).
    #[arg(value_name = "CORE")]
    core: PathBuf,
}

#[derive(Debug, Clone, Args)]
struct NavigateArgs {
    /// Solver tree JSON file (`-` for stdin).
    #[arg(value_name = "CORE")]
    core: PathBuf,
    /// Command names (`goLeft`, `next-failed`, …) or default keys (`s`, `w`, …).
    #[arg(value_name = "COMMAND")]
    commands: Vec<String>,
    /// Start from this node instead of the root.
    #[arg(long, value_name = "ID")]
    from: Option<NodeId>,
}

#[derive(Debug, Clone, Args)]
struct PlayArgs {
    /// Solver tree JSON file (`-` for stdin).
    #[arg(value_name = "CORE")]
    core: PathBuf,
    /// Play back toward the root.
    #[arg(long)]
    reverse: bool,
    /// Pause between steps in milliseconds (normalized to the configured floor).
    #[arg(long, value_name = "MILLISECONDS", allow_negative_numbers = true)]
    duration_ms: Option<i64>,
    /// Start from this node instead of the root.
    #[arg(long, value_name = "ID")]
    from: Option<NodeId>,
}

const MAX_DEPTH: i64 = 64;
const MAX_BRANCHING: i64 = 32;

#[derive(Debug, Clone, Args)]
struct GenerateArgs {
    /// Maximum depth below the root.
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(..=MAX_DEPTH))]
    depth: u32,
    /// Maximum children per node.
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u32).range(..=MAX_BRANCHING))]
    branching: u32,
    /// RNG seed; equal seeds give equal trees.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Do not mark a solution.
    #[arg(long)]
    unsolvable: bool,
    /// Write to a file instead of stdout.
    #[arg(long, short, value_name = "PATH")]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Library failure, already carrying its STX code.
    #[error(transparent)]
    Stx(#[from] StxError),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Inspect(args) => run_inspect(cli, args),
        Command::Navigate(args) => run_navigate(cli, args),
        Command::Play(args) => run_play(cli, args),
        Command::Commands => run_commands(cli),
        Command::Generate(args) => run_generate(cli, args),
        Command::Config => run_config(cli),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── session setup ────────────────────

/// Loaded configuration plus the activity log it describes.
struct Session {
    config: Config,
    log: ActivityLog,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let mut log = ActivityLog::open(&config);
        log.record(&ActivityEvent::ConfigLoaded {
            config_hash: config.stable_hash()?,
            path: config.paths.config_file.display().to_string(),
        });
        Ok(Self { config, log })
    }

    /// Read a core and build a model, logging the outcome either way.
    fn load_model(&mut self, source: &Path) -> Result<ExplorerModel, CliError> {
        let core = read_core(source).inspect_err(|e| self.log.record(&ActivityEvent::error(e)))?;
        match ExplorerModel::new(core, ExplorerSettings::from_config(&self.config)) {
            Ok(model) => {
                self.log
                    .record(&ActivityEvent::tree_loaded(&model.snapshot()));
                Ok(model)
            }
            Err(e) => {
                self.log.record(&ActivityEvent::tree_rejected(&e));
                Err(e.into())
            }
        }
    }
}

fn read_core(source: &Path) -> Result<Core, StxError> {
    if source.as_os_str() == "-" {
        Core::from_reader(io::stdin().lock())
    } else {
        Core::from_path(source)
    }
}

/// Move the selection to `from` (revealing it) or fail if it is not in the tree.
fn select_start(model: &mut ExplorerModel, from: Option<NodeId>) -> Result<(), CliError> {
    let Some(id) = from else {
        return Ok(());
    };
    if !model.index.contains(id) {
        return Err(CliError::User(format!(
            "node {id} is not in tree {:?}",
            model.tree_id()
        )));
    }
    update(model, ExplorerMsg::Select(id));
    Ok(())
}

/// Resolve a command by name first, then by default key.
fn resolve_command(raw: &str) -> Result<ExplorerCommand, StxError> {
    ExplorerCommand::from_name(raw).or_else(|err| ExplorerCommand::from_key(raw).ok_or(err))
}

fn node_label(index: &TreeIndex, id: NodeId) -> String {
    index.get(id).map_or_else(String::new, |node| {
        if node.pretty_label.is_empty() {
            node.label.clone()
        } else {
            node.pretty_label.clone()
        }
    })
}

// ──────────────────── inspect ────────────────────

fn run_inspect(cli: &Cli, args: &InspectArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let model = session.load_model(&args.core)?;
    let snapshot = model.snapshot();

    match output_mode(cli) {
        OutputMode::Human => print_snapshot_human(&snapshot),
        OutputMode::Json => {
            let payload = json!({
                "command": "inspect",
                "tree": serde_json::to_value(&snapshot)?,
                "solution_leaf": model.summary.solution_leaf,
            });
            write_json_line(&payload)?;
        }
    }
    session.log.flush();
    Ok(())
}

fn print_snapshot_human(snapshot: &ExplorerSnapshot) {
    println!("{} {}", "Tree".bold(), snapshot.tree_id);
    println!("  Nodes:            {}", snapshot.total_node_count);
    let solveable = if snapshot.solveable {
        "yes".green()
    } else {
        "no".red()
    };
    println!("  Solveable:        {solveable}");
    println!(
        "  Solution path:    {}",
        join_ids(&snapshot.sol_ancestor_ids)
    );
    println!("  Solution nodes:   {}", join_ids(&snapshot.sol_node_ids));
    println!("  Failed branches:  {}", snapshot.failed_branch_count);
    println!("  Min size:         {}", snapshot.minsize);
    println!(
        "  Weight domain:    [{}, {}]",
        snapshot.scale.min, snapshot.scale.max
    );
}

fn join_ids(ids: &[NodeId]) -> String {
    if ids.is_empty() {
        return "-".to_string();
    }
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" → ")
}

// ──────────────────── navigate ────────────────────

fn run_navigate(cli: &Cli, args: &NavigateArgs) -> Result<(), CliError> {
    // Names are resolved before any I/O so a typo fails fast.
    let commands = args
        .commands
        .iter()
        .map(|raw| resolve_command(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut session = Session::open(cli)?;
    let mut model = session.load_model(&args.core)?;
    select_start(&mut model, args.from)?;
    let mode = output_mode(cli);

    let mut steps = Vec::with_capacity(commands.len());
    for command in commands {
        let from = model.selected;
        update(&mut model, ExplorerMsg::Command(command));
        let to = model.selected;
        session.log.record(&ActivityEvent::CommandApplied {
            tree_id: model.tree_id().to_string(),
            command: command.name().to_string(),
            from,
            to,
        });

        if mode == OutputMode::Human && !cli.quiet {
            let arrow = if from == to {
                "·".dimmed().to_string()
            } else {
                "→".green().to_string()
            };
            println!(
                "{:<14} {from:>4} {arrow} {to:<4} {}",
                command.name(),
                node_label(&model.index, to).dimmed()
            );
        }
        steps.push(json!({
            "command": command.name(),
            "from": from,
            "to": to,
            "revision": model.index.revision(),
        }));
    }

    match mode {
        OutputMode::Human => {
            let kind = match classify(&model.index, model.selected) {
                Some(BranchKind::Solution) => "solution",
                Some(BranchKind::SolutionPath) => "solution path",
                Some(BranchKind::Failed) => "failed",
                Some(BranchKind::Open) => "open",
                None => "",
            };
            println!(
                "{} {} {}",
                "selected".bold(),
                model.selected,
                kind.dimmed()
            );
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "navigate",
                "tree_id": model.tree_id(),
                "steps": steps,
                "selected": model.selected,
                "kind": classify(&model.index, model.selected),
                "revision": model.index.revision(),
            });
            write_json_line(&payload)?;
        }
    }
    session.log.flush();
    Ok(())
}

// ──────────────────── play ────────────────────

/// Prints steps as they happen and records them in the activity log.
struct CliObserver<'a> {
    mode: OutputMode,
    quiet: bool,
    labels: TreeIndex,
    log: &'a mut ActivityLog,
    steps: Vec<NodeId>,
}

impl PlaybackObserver for CliObserver<'_> {
    fn on_step(&mut self, selected: NodeId) {
        self.steps.push(selected);
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => {
                println!(
                    "  {:>4} {} {}",
                    self.steps.len(),
                    selected.to_string().bold(),
                    node_label(&self.labels, selected).dimmed()
                );
            }
            OutputMode::Json => {
                let payload = json!({"event": "step", "step": self.steps.len(), "selected": selected});
                if let Err(e) = write_json_line(&payload) {
                    eprintln!("[STX-CLI] failed to write step: {e}");
                }
            }
        }
    }

    fn on_complete(&mut self, report: &PlaybackReport) {
        if !self.quiet && self.mode == OutputMode::Human {
            println!(
                "{} {} after {} step(s)",
                "playback".bold(),
                outcome_label(report.outcome),
                report.steps
            );
        }
    }

    fn on_rejected(&mut self, error: &StxError) {
        self.log.record(&ActivityEvent::tree_rejected(error));
    }
}

fn run_play(cli: &Cli, args: &PlayArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let mut model = session.load_model(&args.core)?;
    select_start(&mut model, args.from)?;
    if let Some(millis) = args.duration_ms {
        update(&mut model, ExplorerMsg::SetStepDuration(millis));
    }
    let direction = Direction::from_reverse_flag(args.reverse || session.config.playback.reverse);
    let mode = output_mode(cli);

    let tree_id = model.tree_id().to_string();
    let start = model.selected;
    session.log.record(&ActivityEvent::PlaybackStarted {
        tree_id: tree_id.clone(),
        direction: direction.label().to_string(),
        from: start,
    });
    if mode == OutputMode::Human && !cli.quiet {
        println!(
            "{} {} from {start} on {tree_id} (Ctrl-C to stop)",
            "playing".bold(),
            direction.label()
        );
    }

    let _signals = cancel_on_signals(&model.playback.cancel_token());
    let runner = PlaybackRunner::new();
    let started = Instant::now();
    let mut observer = CliObserver {
        mode,
        quiet: cli.quiet,
        labels: model.index.clone(),
        log: &mut session.log,
        steps: Vec::new(),
    };
    let result = runner.run(&mut model, direction, &mut observer);
    let steps = std::mem::take(&mut observer.steps);
    let report = match result {
        Ok(report) => report,
        Err(e) => {
            session.log.record(&ActivityEvent::error(&e));
            return Err(e.into());
        }
    };

    session.log.record(&ActivityEvent::PlaybackFinished {
        tree_id: tree_id.clone(),
        report,
        selected: model.selected,
        elapsed: started.elapsed(),
    });

    if mode == OutputMode::Json {
        let payload = json!({
            "command": "play",
            "tree_id": tree_id,
            "direction": report.direction,
            "outcome": report.outcome,
            "steps": report.steps,
            "path": steps,
            "selected": model.selected,
        });
        write_json_line(&payload)?;
    } else if cli.quiet {
        println!("{}", model.selected);
    }
    session.log.flush();
    Ok(())
}

// ──────────────────── commands / generate / config ────────────────────

fn run_commands(cli: &Cli) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            for spec in &COMMANDS {
                let keys = if spec.keys.is_empty() {
                    "-".to_string()
                } else {
                    spec.keys.join(", ")
                };
                println!(
                    "{:<14} {:<22} {}",
                    spec.name.bold(),
                    keys,
                    spec.description.dimmed()
                );
            }
        }
        OutputMode::Json => {
            let entries: Vec<Value> = COMMANDS
                .iter()
                .map(|spec| {
                    json!({
                        "name": spec.name,
                        "keys": spec.keys,
                        "description": spec.description,
                    })
                })
                .collect();
            write_json_line(&json!({"command": "commands", "commands": entries}))?;
        }
    }
    Ok(())
}

fn run_generate(cli: &Cli, args: &GenerateArgs) -> Result<(), CliError> {
    let core = generate_tree(&GeneratorOptions {
        depth: args.depth,
        branching: args.branching,
        seed: args.seed,
        solvable: !args.unsolvable,
    });
    let rendered = core.to_json_string()?;

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{rendered}\n")).map_err(|e| StxError::io(path, e))?;
            if !cli.quiet && output_mode(cli) == OutputMode::Human {
                println!(
                    "wrote {} nodes to {}",
                    core.nodes.len(),
                    path.display()
                );
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{rendered}")?;
        }
    }
    Ok(())
}

fn run_config(cli: &Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let hash = config.stable_hash()?;

    match output_mode(cli) {
        OutputMode::Human => {
            println!("# source: {}", config.paths.config_file.display());
            println!("# hash: {hash}");
            println!("{}", config.to_toml_string()?);
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config",
                "source": config.paths.config_file.to_string_lossy(),
                "hash": hash,
                "config": serde_json::to_value(&config)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("STX_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn output_mode_resolution_honors_precedence() {
        assert_eq!(
            resolve_output_mode(true, Some("human"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("json"), true),
            OutputMode::Json
        );
        assert_eq!(
            resolve_output_mode(false, Some("human"), false),
            OutputMode::Human
        );
        assert_eq!(resolve_output_mode(false, None, true), OutputMode::Human);
        assert_eq!(resolve_output_mode(false, None, false), OutputMode::Json);
        assert_eq!(
            resolve_output_mode(false, Some("bogus"), true),
            OutputMode::Human
        );
    }

    #[test]
    fn commands_resolve_by_name_or_key() {
        assert_eq!(resolve_command("goLeft").unwrap(), ExplorerCommand::GoLeft);
        assert_eq!(resolve_command("s").unwrap(), ExplorerCommand::GoLeft);
        assert_eq!(
            resolve_command("next-failed").unwrap(),
            ExplorerCommand::NextFailed
        );
        assert_eq!(resolve_command("fly").unwrap_err().code(), "STX-2002");
    }

    #[test]
    fn play_accepts_negative_duration() {
        let cli = Cli::try_parse_from(["stx", "play", "tree.json", "--duration-ms", "-5"]).unwrap();
        match cli.command {
            Command::Play(args) => assert_eq!(args.duration_ms, Some(-5)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generate_shape_is_range_checked() {
        let depth = MAX_DEPTH.to_string();
        let cli = Cli::try_parse_from(["stx", "generate", "--depth", depth.as_str()]).unwrap();
        match cli.command {
            Command::Generate(args) => assert_eq!(i64::from(args.depth), MAX_DEPTH),
            other => panic!("unexpected {other:?}"),
        }

        let too_deep = (MAX_DEPTH + 1).to_string();
        assert!(Cli::try_parse_from(["stx", "generate", "--depth", too_deep.as_str()]).is_err());
        let too_wide = (MAX_BRANCHING + 1).to_string();
        assert!(
            Cli::try_parse_from(["stx", "generate", "--branching", too_wide.as_str()]).is_err()
        );
    }
}
