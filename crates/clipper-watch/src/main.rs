//! clipper-watch: submit video edits to the clipper job server and follow
//! them to completion from the terminal.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;

use clipper_tasks::{
    ClientConfig, CutForm, MergeForm, PlaybackSink, Submission, TaskId, TaskSession, ViewOutcome,
};

mod render;
mod sink;

use render::ProgressBoard;
use sink::{BrowserSink, PrintSink};

/// Follow video clipper jobs from the terminal
#[derive(Parser)]
#[command(name = "clipper-watch")]
#[command(about = "Submit video edits and follow their progress", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Job server URL
    #[arg(long, env = "CLIPPER_BASE_URL", global = true)]
    url: Option<String>,

    /// Delay between two status polls of a task, in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Print playback URLs instead of opening them
    #[arg(long, global = true)]
    print_only: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Restore the server's task list and follow every running task
    Watch,

    /// List the videos in the server's directory
    Videos {
        /// Play this video after listing
        #[arg(long)]
        play: Option<String>,
    },

    /// Point the server at another video directory
    SetDir {
        /// Directory on the server
        dir: String,
    },

    /// Cut a clip out of a video
    Cut {
        /// Source video file name
        #[arg(long)]
        input: String,

        /// Start time (HH:MM:SS)
        #[arg(long)]
        start: String,

        /// End time (HH:MM:SS)
        #[arg(long)]
        end: String,

        /// Output file name (defaults to cut_<input>)
        #[arg(long)]
        output: Option<String>,
    },

    /// Concatenate videos
    Merge {
        /// Output file name
        #[arg(long)]
        output: String,

        /// Source videos, in order
        videos: Vec<String>,
    },

    /// Play the result of a finished task
    Play {
        /// Task id as reported by the server
        task_id: TaskId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    clipper_tasks::logging::init_logging_with(directive)?;

    let config = resolve_config(&cli)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(execute_command(cli, config))
}

fn resolve_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    }
    .with_env_overrides()?;

    if let Some(url) = &cli.url {
        config.base_url = url.clone();
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.poll_interval_ms = interval_ms;
    }
    config.validate()?;
    Ok(config)
}

fn sinks(print_only: bool) -> (Arc<dyn PlaybackSink>, Arc<dyn PlaybackSink>) {
    if print_only {
        (
            Arc::new(PrintSink::new("player")),
            Arc::new(PrintSink::new("merge-preview")),
        )
    } else {
        (
            Arc::new(BrowserSink::new("player")),
            Arc::new(BrowserSink::new("merge-preview")),
        )
    }
}

async fn execute_command(cli: Cli, config: ClientConfig) -> Result<()> {
    let (player, merge_preview) = sinks(cli.print_only);
    let session = TaskSession::connect(&config, player, merge_preview)
        .with_context(|| format!("Failed to set up client for {}", config.base_url))?;
    let board = Arc::new(ProgressBoard::new());
    session.subscribe(board.clone());

    let result = tokio::select! {
        result = run(&session, &board, cli.command) => result,
        _ = tokio::signal::ctrl_c() => {
            board.println("Interrupted");
            Ok(())
        }
    };

    session.poller().shutdown().await;
    result
}

async fn run(session: &TaskSession, board: &ProgressBoard, command: Commands) -> Result<()> {
    match command {
        Commands::Watch => {
            let report = session.bootstrap().await?;
            board.println(format!(
                "{} tasks restored, {} running, {} failed, {} unreadable",
                report.restored.len(),
                report.armed.len(),
                report.failed.len(),
                report.skipped
            ));
            session.wait_idle().await;
            for id in session.dispatcher().viewable() {
                board.println(format!("{} clipper-watch play {}", "view:".green(), id));
            }
        },
        Commands::Videos { play } => {
            let listing = session.list_videos().await?;
            println!("{}", listing.video_dir.bold());
            if listing.videos.is_empty() {
                println!("  (no videos)");
            }
            for video in &listing.videos {
                println!("  {}", video);
            }
            if let Some(name) = play {
                session.play_video(&name)?;
            }
        },
        Commands::SetDir { dir } => {
            let applied = session.set_video_dir(&dir).await?;
            println!("Video directory is now {}", applied);
        },
        Commands::Cut {
            input,
            start,
            end,
            output,
        } => {
            let mut form = CutForm::new(input, start, end);
            if let Some(output) = output {
                form = form.with_output(output);
            }
            let submission = session.submit_cut(&form)?;
            follow(session, board, submission).await?;
        },
        Commands::Merge { output, videos } => {
            let submission = session.submit_merge(&MergeForm::new(videos, output))?;
            follow(session, board, submission).await?;
        },
        Commands::Play { task_id } => {
            session.bootstrap().await?;
            if session.poller().is_armed(task_id) {
                board.println(format!("Task {} is still running, waiting", task_id));
                session.poller().arm(task_id).stopped().await;
            }
            report_view(board, task_id, session.view_result(task_id))?;
        },
    }
    Ok(())
}

/// Waits for a submitted job to finish, then plays its result.
async fn follow(session: &TaskSession, board: &ProgressBoard, submission: Submission) -> Result<()> {
    let task_id = submission.task_id;
    board.println(format!("Submitted task {}", task_id));

    submission
        .request
        .await
        .context("Submission task panicked")?
        .with_context(|| format!("Task {} failed on the server", task_id))?;

    submission.poll.stopped().await;
    report_view(board, task_id, session.view_result(task_id))
}

fn report_view(board: &ProgressBoard, task_id: TaskId, outcome: ViewOutcome) -> Result<()> {
    match outcome {
        ViewOutcome::Played(target) => {
            board.println(format!("Task {} sent to {}", task_id, target));
        },
        ViewOutcome::UnknownKind => {
            board.println(format!("Task {} has no playable result", task_id));
        },
        ViewOutcome::MissingOutput => {
            board.println(format!("Task {} did not report an output file", task_id));
        },
        ViewOutcome::NotReady => bail!("Task {} has not completed", task_id),
        ViewOutcome::UnknownTask => bail!("No task with id {}", task_id),
    }
    Ok(())
}
