use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pairwise_core::{Session, Stage, Step, Task, TaskId};
use pairwise_exchange::{
    export_json, export_text, import_json, read_bulk_file, read_bulk_reader, JSON_EXPORT_FILE,
    TEXT_EXPORT_FILE,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod compare;
mod config;
mod state;

use compare::Exit;
use config::Config;
use state::JsonFileStore;

#[derive(Parser, Debug)]
#[command(
    name = "pairwise",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PAIRWISE_BUILD_SHA"), ")"),
    about = "Rank a task list by deciding between two tasks at a time"
)]
struct Cli {
    /// State file to use instead of the configured one
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add one task
    Add {
        /// Task label
        text: String,
    },

    /// Add one task per line from a file (.txt, .csv) or stdin
    Import {
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Show tasks for the current stage
    List,

    /// Remove a task (before prioritization starts)
    Remove { id: u64 },

    /// Remove all tasks (before prioritization starts)
    Clear,

    /// Start prioritizing the current task list
    Start,

    /// Interactive comparison screen (TTY required)
    Compare,

    /// Pick the task with this id from the current pair
    Choose { id: u64 },

    /// Can't decide: move on without scoring
    Skip,

    /// Abandon the run and go back to editing tasks
    Cancel,

    /// Stage, progress and the current pair
    Status,

    /// Mark a prioritized task as done
    Complete { id: u64 },

    /// Move a completed task back into the prioritized list
    Restore { id: u64 },

    /// Write the results as plain text or JSON (stdout unless --out)
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,

        /// Output file, or a directory to write the default file name into
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Load results from a JSON save file
    Load { path: PathBuf },

    /// Clear every task, result and run
    Reset,

    /// Manage ~/.pairwise/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ExportFormat {
    Text,
    Json,
}

impl ExportFormat {
    fn default_file_name(self) -> &'static str {
        match self {
            ExportFormat::Text => TEXT_EXPORT_FILE,
            ExportFormat::Json => JSON_EXPORT_FILE,
        }
    }
}

/// Whether the session should be written back after a command.
#[derive(Debug, PartialEq, Eq)]
enum Persist {
    Save,
    Skip,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config()?;
    init_logging(&cfg.logging.level);

    if let Command::Config { command } = &cli.command {
        return run_config(command, &cfg);
    }

    let path = match cli.state {
        Some(p) => p,
        None => cfg.state_path()?,
    };
    let mut store = JsonFileStore::open(&path)?;
    let mut session = Session::load(&store);

    if run(cli.command, &cfg, &mut session, &mut store)? == Persist::Save {
        session.save(&mut store)?;
    }
    Ok(())
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_config(command: &ConfigCommand, cfg: &Config) -> Result<()> {
    match command {
        ConfigCommand::Init => {
            let p = config::config_path()?;
            if config::write_default_config(&p)? {
                println!("Wrote {}", p.display());
            } else {
                println!("Config already exists: {}", p.display());
            }
            Ok(())
        }
        ConfigCommand::Show => {
            println!("# {}", config::config_path()?.display());
            print!("{}", toml::to_string_pretty(cfg).context("serialize config")?);
            Ok(())
        }
    }
}

fn run(
    command: Command,
    cfg: &Config,
    session: &mut Session,
    store: &mut JsonFileStore,
) -> Result<Persist> {
    match command {
        Command::Add { text } => {
            ensure_stage(session, Stage::Input, "add tasks")?;
            check_task_len(&text, cfg.input.max_task_len)?;
            let Some(id) = session.add_task(&text) else {
                bail!("task text is empty");
            };
            println!("Added task {id}");
        }

        Command::Import { file } => {
            ensure_stage(session, Stage::Input, "import tasks")?;
            let raw = match &file {
                Some(p) => read_bulk_file(p)?,
                None => read_bulk_reader(std::io::stdin().lock())?,
            };
            let ids = session.add_tasks_bulk(&raw);
            println!("Imported {} tasks ({} total)", ids.len(), session.tasks().len());
        }

        Command::List => print!("{}", render_list(session)),

        Command::Remove { id } => {
            ensure_stage(session, Stage::Input, "remove tasks")?;
            if !session.remove_task(TaskId(id)) {
                bail!("no task with id {id}");
            }
            println!("Removed task {id}");
        }

        Command::Clear => {
            ensure_stage(session, Stage::Input, "clear tasks")?;
            let n = session.tasks().len();
            session.clear_all();
            println!("Removed {n} tasks");
        }

        Command::Start => {
            session.start()?;
            println!(
                "Comparing {} tasks in {} rounds. Run `pairwise compare` or `pairwise status`.",
                session.tasks().len(),
                session.engine().total()
            );
        }

        Command::Compare => {
            if session.stage() == Stage::Input {
                session.start()?;
            }
            ensure_stage(session, Stage::Comparing, "compare tasks")?;
            match compare::run_compare(session, store)? {
                Exit::Finished => {
                    println!("Done. Your prioritized list:\n");
                    print!("{}", render_list(session));
                }
                Exit::Cancelled => println!("Run cancelled; your tasks are kept."),
                Exit::Paused => println!(
                    "Paused at {} of {}. Run `pairwise compare` to continue.",
                    session.engine().cursor(),
                    session.engine().total()
                ),
            }
        }

        Command::Choose { id } => {
            ensure_stage(session, Stage::Comparing, "choose")?;
            let in_pair = session
                .engine()
                .current_pair_ids()
                .is_some_and(|pair| pair.contains(TaskId(id)));
            if !in_pair {
                bail!("task {id} is not in the current pair (see `pairwise status`)");
            }
            let step = session.choose(TaskId(id));
            report_step(session, step);
        }

        Command::Skip => {
            ensure_stage(session, Stage::Comparing, "skip")?;
            let step = session.skip();
            report_step(session, step);
        }

        Command::Cancel => {
            ensure_stage(session, Stage::Comparing, "cancel")?;
            session.cancel();
            println!("Run cancelled; your tasks are kept.");
        }

        Command::Status => print!("{}", render_status(session)),

        Command::Complete { id } => {
            ensure_stage(session, Stage::Results, "complete tasks")?;
            if !session.complete_task(TaskId(id)) {
                bail!("no prioritized task with id {id}");
            }
            println!("Completed task {id}");
        }

        Command::Restore { id } => {
            ensure_stage(session, Stage::Results, "restore tasks")?;
            if !session.restore_task(TaskId(id)) {
                bail!("no completed task with id {id}");
            }
            println!("Restored task {id}");
        }

        Command::Export { format, out } => {
            ensure_stage(session, Stage::Results, "export")?;
            let body = match format {
                ExportFormat::Text => export_text(session),
                ExportFormat::Json => export_json(session)?,
            };
            match out {
                Some(p) => {
                    let p = if p.is_dir() { p.join(format.default_file_name()) } else { p };
                    fs::write(&p, &body).with_context(|| format!("write {}", p.display()))?;
                    println!("Wrote {}", p.display());
                }
                None => println!("{body}"),
            }
        }

        Command::Load { path } => {
            let raw =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            let n = import_json(session, &raw)
                .with_context(|| format!("import {}", path.display()))?;
            println!("Loaded {n} tasks from {}", path.display());
        }

        Command::Reset => {
            session.reset();
            Session::clear_store(store)?;
            println!("Cleared all tasks and results in {}", store.path().display());
            return Ok(Persist::Skip);
        }

        Command::Config { command } => {
            run_config(&command, cfg)?;
            return Ok(Persist::Skip);
        }
    }

    Ok(Persist::Save)
}

fn ensure_stage(session: &Session, expected: Stage, what: &str) -> Result<()> {
    let stage = session.stage();
    if stage == expected {
        return Ok(());
    }
    let hint = match stage {
        Stage::Input => "run `pairwise start` first",
        Stage::Comparing => "finish with `pairwise compare` or `pairwise cancel`",
        Stage::Results => "run `pairwise reset` to start over",
    };
    bail!("cannot {what} in the {stage} stage; {hint}");
}

fn check_task_len(text: &str, max: usize) -> Result<()> {
    let len = text.trim().chars().count();
    if len > max {
        bail!("task is {len} characters long; the limit is {max} (input.max_task_len)");
    }
    Ok(())
}

fn report_step(session: &Session, step: Step) {
    match step {
        Step::Finished => {
            println!("Done. Your prioritized list:\n");
            print!("{}", render_list(session));
        }
        _ => print!("{}", render_status(session)),
    }
}

fn task_lines(tasks: &[Task], with_score: bool) -> String {
    tasks
        .iter()
        .enumerate()
        .map(|(i, t)| {
            if with_score {
                format!("{:>3}. [{}] {} (score {})\n", i + 1, t.id, t.text, t.score)
            } else {
                format!("{:>3}. [{}] {}\n", i + 1, t.id, t.text)
            }
        })
        .collect()
}

fn render_list(session: &Session) -> String {
    match session.stage() {
        Stage::Input | Stage::Comparing => {
            if session.tasks().is_empty() {
                return "No tasks yet. Add some with `pairwise add` or `pairwise import`.\n"
                    .to_string();
            }
            format!("Tasks:\n{}", task_lines(session.tasks(), false))
        }
        Stage::Results => {
            let mut out = format!("Prioritized:\n{}", task_lines(session.prioritized(), true));
            if !session.completed().is_empty() {
                out.push_str(&format!(
                    "\nCompleted:\n{}",
                    task_lines(session.completed(), true)
                ));
            }
            out
        }
    }
}

fn render_status(session: &Session) -> String {
    let engine = session.engine();
    let mut out = format!("Stage: {}\n", session.stage());
    match session.stage() {
        Stage::Input => {
            out.push_str(&format!("Tasks: {}\n", session.tasks().len()));
        }
        Stage::Comparing => {
            out.push_str(&format!(
                "Progress: {}/{} ({}%)\n",
                engine.cursor(),
                engine.total(),
                session.percent_done()
            ));
            match session.current_pair() {
                Some((a, b)) => out.push_str(&format!(
                    "Which first?\n  [{}] {}\n  [{}] {}\n",
                    a.id, a.text, b.id, b.text
                )),
                None => out.push_str("Current pair cannot be resolved; run `pairwise skip`.\n"),
            }
        }
        Stage::Results => {
            out.push_str(&format!(
                "Prioritized: {}  Completed: {}\n",
                session.prioritized().len(),
                session.completed().len()
            ));
        }
    }
    out
}
