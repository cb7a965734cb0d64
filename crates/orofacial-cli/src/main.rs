//! oro: command-line interface for the orofacial exercise tracker.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use orofacial_core::clock::system_time;
use orofacial_core::frames::{self, FrameMessage};
use orofacial_core::{
    logging, storage, BlobStore, BundledFile, ExerciseCatalog, FileStore, ImportMode,
    ManualTimeSource, MetricsEngine, NoBundle, Recorder, Session, SessionStore, TimeSource,
    TrackerConfig,
};
use orofacial_server::{serve, AppState, ServerConfig};

#[derive(Parser)]
#[command(
    name = "oro",
    about = "Orofacial exercise tracker: sessions, exercises and facial metrics",
    version,
    author
)]
struct Cli {
    /// Tracker configuration file (YAML). Missing files use the defaults.
    #[arg(long, global = true, default_value = "orofacial.yaml")]
    config: PathBuf,
    /// Override the data directory from the configuration
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port to bind to
        #[arg(long, short, default_value_t = 8000)]
        port: u16,
    },
    /// List recorded sessions, most recent first
    Sessions {
        /// Only sessions of this exercise
        #[arg(long, short)]
        exercise: Option<String>,
        /// Show at most this many sessions
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },
    /// Show aggregate statistics over the session history
    Stats,
    /// Show one session with its metrics
    Show { session_id: String },
    /// Delete a session from the history
    Delete { session_id: String },
    /// List the exercise catalog
    Exercises,
    /// Export the exercise catalog as JSON
    ExportExercises {
        /// Output file (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import exercises from a JSON export
    ImportExercises {
        file: PathBuf,
        /// Replace the catalog or merge into it
        #[arg(long, value_parser = ["replace", "merge"])]
        mode: String,
    },
    /// Export the data points of a session
    ExportSession {
        session_id: String,
        /// Output format
        #[arg(long, short, default_value = "csv", value_parser = ["csv", "json", "parquet"])]
        format: String,
        /// Output file (default: stdout; required for parquet)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Record a session from landmark frames on stdin
    Live {
        /// Exercise to perform
        #[arg(long, short)]
        exercise: String,
    },
    /// Replay a recorded frame stream into a new session
    Replay {
        /// Newline-delimited JSON frame stream
        file: PathBuf,
        /// Exercise the recording belongs to
        #[arg(long, short)]
        exercise: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = TrackerConfig::load(&cli.config)?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let _log_guard = logging::init(&config.log)?;

    match cli.command {
        Commands::Serve { host, port } => cmd_serve(&config, host, port)?,
        Commands::Sessions { exercise, limit } => cmd_sessions(&config, exercise, limit)?,
        Commands::Stats => cmd_stats(&config)?,
        Commands::Show { session_id } => cmd_show(&config, &session_id)?,
        Commands::Delete { session_id } => cmd_delete(&config, &session_id)?,
        Commands::Exercises => cmd_exercises(&config)?,
        Commands::ExportExercises { output } => cmd_export_exercises(&config, output)?,
        Commands::ImportExercises { file, mode } => cmd_import_exercises(&config, &file, &mode)?,
        Commands::ExportSession {
            session_id,
            format,
            output,
        } => cmd_export_session(&config, &session_id, &format, output)?,
        Commands::Live { exercise } => cmd_live(&config, &exercise)?,
        Commands::Replay { file, exercise } => cmd_replay(&config, &file, &exercise)?,
    }

    Ok(())
}

// ─── Store helpers ────────────────────────────────────────────────────────────

fn open_store(config: &TrackerConfig) -> Result<Arc<dyn BlobStore>> {
    Ok(Arc::new(FileStore::open(&config.data_dir)?))
}

fn open_catalog(
    config: &TrackerConfig,
    store: Arc<dyn BlobStore>,
    time: Arc<dyn TimeSource>,
) -> ExerciseCatalog {
    match &config.bundled_exercises {
        Some(path) => ExerciseCatalog::open(store, &BundledFile::new(path), time),
        None => ExerciseCatalog::open(store, &NoBundle, time),
    }
}

fn open_sessions(config: &TrackerConfig) -> Result<SessionStore> {
    Ok(SessionStore::open(open_store(config)?, system_time()))
}

// ─── Command implementations ──────────────────────────────────────────────────

fn cmd_serve(config: &TrackerConfig, host: String, port: u16) -> Result<()> {
    println!("Orofacial tracker API");
    println!("   Data: {}", config.data_dir.display());
    println!("   URL:  http://{}:{}/api", host, port);
    println!();

    let state = AppState::from_config(config)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(ServerConfig { host, port }, state))
}

fn cmd_sessions(
    config: &TrackerConfig,
    exercise: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let sessions = open_sessions(config)?;
    let mut list = match &exercise {
        Some(id) => sessions.sessions_by_exercise(id),
        None => sessions.all_sessions(),
    };
    if let Some(n) = limit {
        list.truncate(n);
    }

    if list.is_empty() {
        match exercise {
            Some(id) => println!("No sessions recorded for exercise '{}'", id),
            None => println!("No sessions recorded"),
        }
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Session", "Exercise", "Status", "Started", "Duration", "Completion"]);
    for s in &list {
        table.add_row([
            s.id.as_str(),
            s.exercise_name.as_str(),
            &s.status.to_string(),
            &s.start_time.format("%Y-%m-%d %H:%M:%S").to_string(),
            &format!(
                "{} / {}",
                s.actual_duration.map(format_duration).unwrap_or_else(|| "-".into()),
                format_duration(u64::from(s.duration))
            ),
            &format!("{}%", s.metrics.completion_percentage),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn cmd_stats(config: &TrackerConfig) -> Result<()> {
    let stats = open_sessions(config)?.stats();

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Statistic", "Value"]);
    table.add_row(["Total sessions", &stats.total_sessions.to_string()]);
    table.add_row(["Completed sessions", &stats.completed_sessions.to_string()]);
    table.add_row(["Completion rate", &format!("{}%", stats.avg_completion_rate)]);
    table.add_row(["Practice time", &format!("{} min", stats.total_time_minutes)]);
    println!("{}", table);
    Ok(())
}

fn cmd_show(config: &TrackerConfig, session_id: &str) -> Result<()> {
    let session = open_sessions(config)?
        .session_by_id(session_id)
        .ok_or_else(|| anyhow!("Session not found: {}", session_id))?;
    print_session(&session);
    Ok(())
}

fn print_session(session: &Session) {
    println!("Session: {}", session.id);
    println!("Exercise: {} ({})", session.exercise_name, session.exercise_type);
    println!("Status: {}", session.status);
    println!("Started: {}", session.start_time.format("%Y-%m-%d %H:%M:%S"));
    if let Some(secs) = session.actual_duration {
        println!(
            "Duration: {} of {}",
            format_duration(secs),
            format_duration(u64::from(session.duration))
        );
    }
    println!();

    let m = &session.metrics;
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Metric", "Value"]);
    table.add_row(["Samples", &session.data_points.len().to_string()]);
    table.add_row(["Avg mouth opening", &m.avg_mouth_opening.to_string()]);
    table.add_row(["Max mouth opening", &format!("{:.1}", m.max_mouth_opening)]);
    table.add_row(["Avg lateral movement", &m.avg_lateral_movement.to_string()]);
    table.add_row(["Max lateral movement", &format!("{:.1}", m.max_lateral_movement)]);
    table.add_row(["Completion", &format!("{}%", m.completion_percentage)]);
    println!("{}", table);
}

fn cmd_delete(config: &TrackerConfig, session_id: &str) -> Result<()> {
    let mut sessions = open_sessions(config)?;
    if !sessions.delete_session(session_id) {
        bail!("Session not found: {}", session_id);
    }
    println!("✓ Deleted session {}", session_id);
    Ok(())
}

fn cmd_exercises(config: &TrackerConfig) -> Result<()> {
    let catalog = open_catalog(config, open_store(config)?, system_time());

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["ID", "Name", "Type", "Duration", "Description"]);
    for e in catalog.list() {
        table.add_row([
            e.id.as_str(),
            e.name.as_str(),
            e.exercise_type.as_str(),
            &format_duration(u64::from(e.duration)),
            e.description.as_deref().unwrap_or("-"),
        ]);
    }
    println!("{}", table);
    Ok(())
}

fn cmd_export_exercises(config: &TrackerConfig, output: Option<PathBuf>) -> Result<()> {
    let catalog = open_catalog(config, open_store(config)?, system_time());
    let content = catalog.export_json()?;
    match output {
        Some(path) => {
            std::fs::write(&path, &content)?;
            println!(
                "Exported {} exercises to {}",
                catalog.list().len(),
                path.display()
            );
        }
        None => println!("{}", content),
    }
    Ok(())
}

fn cmd_import_exercises(config: &TrackerConfig, file: &Path, mode: &str) -> Result<()> {
    let mode = match mode {
        "replace" => ImportMode::Replace,
        "merge" => ImportMode::Merge,
        other => bail!("Unknown import mode: {}", other),
    };
    let content = std::fs::read_to_string(file)?;
    let mut catalog = open_catalog(config, open_store(config)?, system_time());
    let added = catalog.import_json(&content, mode)?;
    println!(
        "✓ Imported {} exercise(s); catalog now has {}",
        added,
        catalog.list().len()
    );
    Ok(())
}

fn cmd_export_session(
    config: &TrackerConfig,
    session_id: &str,
    format: &str,
    output: Option<PathBuf>,
) -> Result<()> {
    let session = open_sessions(config)?
        .session_by_id(session_id)
        .ok_or_else(|| anyhow!("Session not found: {}", session_id))?;
    let points = &session.data_points;

    let content = match format {
        "parquet" => {
            let path = output.ok_or_else(|| anyhow!("--output is required for parquet"))?;
            storage::write_data_points(&path, points)?;
            println!("Exported {} data points to {}", points.len(), path.display());
            return Ok(());
        }
        "json" => serde_json::to_string_pretty(points)?,
        "csv" => {
            let mut out = String::from("timestamp,mouthOpening,lateralMovement,jawX,jawY\n");
            for p in points {
                out += &format!(
                    "{},{},{},{},{}\n",
                    p.timestamp, p.mouth_opening, p.lateral_movement, p.jaw_position.x, p.jaw_position.y
                );
            }
            out
        }
        _ => bail!("Unknown format: {}", format),
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &content)?;
            println!("Exported {} data points to {}", points.len(), path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn cmd_live(config: &TrackerConfig, exercise_id: &str) -> Result<()> {
    let time = system_time();
    let store = open_store(config)?;
    let exercise = open_catalog(config, store.clone(), time.clone())
        .get(exercise_id)
        .ok_or_else(|| anyhow!("Exercise not found: {}", exercise_id))?;

    let recorder = Recorder::new(
        SessionStore::open(store, time),
        MetricsEngine::new(config.calibration),
    )?;
    recorder
        .start(exercise.clone())?
        .ok_or_else(|| anyhow!("A session is already in progress"))?;

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:40}] {pos}%")?.progress_chars("=> "),
    );
    bar.set_message(exercise.name.clone());

    let stdin = std::io::stdin();
    for (n, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        match frames::parse_line(&line) {
            Ok(Some(FrameMessage::Frame { landmarks, .. })) => recorder.submit_frame(landmarks),
            Ok(Some(FrameMessage::Pause { .. })) => {
                recorder.pause()?;
            }
            Ok(Some(FrameMessage::Resume { .. })) => {
                recorder.resume()?;
            }
            Ok(Some(FrameMessage::Stop { .. })) => break,
            Ok(None) => continue,
            Err(e) => {
                warn!(line = n + 1, "Skipping malformed frame message: {}", e);
                continue;
            }
        }
        let status = recorder.status()?;
        bar.set_position(status.progress.round() as u64);
    }

    let session = recorder
        .stop()?
        .ok_or_else(|| anyhow!("No session was in progress"))?;
    bar.finish_and_clear();
    print_session(&session);
    Ok(())
}

fn cmd_replay(config: &TrackerConfig, file: &Path, exercise_id: &str) -> Result<()> {
    let store = open_store(config)?;
    let exercise = open_catalog(config, store.clone(), system_time())
        .get(exercise_id)
        .ok_or_else(|| anyhow!("Exercise not found: {}", exercise_id))?;

    let reader = std::io::BufReader::new(std::fs::File::open(file)?);
    let messages = frames::read_messages(reader)?;

    let time = Arc::new(ManualTimeSource::new(Utc::now()));
    let mut sessions = SessionStore::open(store, time.clone());
    let outcome = frames::replay(
        &messages,
        &exercise,
        &mut sessions,
        &time,
        &MetricsEngine::new(config.calibration),
    )?;

    println!(
        "Replayed {} frames ({} samples recorded)",
        outcome.frames, outcome.samples
    );
    println!();
    print_session(&outcome.session);
    Ok(())
}

// ─── Utilities ────────────────────────────────────────────────────────────────

fn format_duration(secs: u64) -> String {
    let m = secs / 60;
    let s = secs % 60;
    if m > 0 {
        format!("{}m {}s", m, s)
    } else {
        format!("{}s", s)
    }
}
