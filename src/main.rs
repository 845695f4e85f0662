//! Generate a timeline and its events in JSON for visualisation.
//!
//! Filenames can be omitted to use standard input/output.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use community_timeline::config::DEFAULT_THRESHOLD;
use community_timeline::render::{evolution_graph, to_dot, write_json};
use community_timeline::{StepCommunities, Thresholds, Timeline};

#[derive(Parser, Debug)]
#[command(name = "community-timeline")]
#[command(about = "Detect life-cycle events of dynamic communities", long_about = None)]
struct Args {
    /// Input timeline in dynamic tracker text format (stdin if omitted)
    #[arg(long, value_name = "FILENAME")]
    timeline: Option<PathBuf>,

    /// Directory with community step files (*.comm)
    #[arg(long, value_name = "DIRECTORY", default_value = "./")]
    steps_dir: PathBuf,

    /// Growth threshold for detecting expansions (fraction)
    #[arg(long, value_name = "FLOAT", env = "TIMELINE_EXPANSION_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    expansion_threshold: f64,

    /// Reduction threshold for detecting contractions (fraction)
    #[arg(long, value_name = "FLOAT", env = "TIMELINE_CONTRACTION_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    contraction_threshold: f64,

    /// Output timeline in JSON (stdout if omitted)
    #[arg(long, value_name = "FILENAME")]
    output: Option<PathBuf>,

    /// Output timeline events in JSON
    #[arg(long, value_name = "FILENAME")]
    events: PathBuf,

    /// Also write the evolution graph in Graphviz DOT
    #[arg(long, value_name = "FILENAME")]
    dot: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Logs go to stderr, stdout may carry the timeline
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let thresholds = Thresholds::new(args.expansion_threshold, args.contraction_threshold)?;

    // 1. Read and regularize the timeline
    let timeline = match &args.timeline {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening timeline {}", path.display()))?;
            Timeline::from_reader(BufReader::new(file))
        }
        None => Timeline::from_reader(io::stdin().lock()),
    }
    .context("reading timeline")?;
    let regularized = timeline.regularize();

    // 2. Measure against the step communities
    let steps = StepCommunities::from_dir(&args.steps_dir).with_context(|| {
        format!("loading step communities from {}", args.steps_dir.display())
    })?;
    let analysis = regularized
        .analyze(&steps, thresholds)
        .context("detecting expansions and contractions")?;

    // 3. Write outputs
    write_json(writer(args.output.as_deref())?, &analysis.timeline)
        .context("writing timeline")?;
    write_json(writer(Some(args.events.as_path()))?, &analysis.events).context("writing events")?;

    if let Some(path) = &args.dot {
        let graph = evolution_graph(&analysis.timeline, &analysis.events);
        std::fs::write(path, to_dot(&graph))
            .with_context(|| format!("writing {}", path.display()))?;
    }

    tracing::info!(
        communities = analysis.timeline.len(),
        events = analysis.events.len(),
        "done"
    );
    Ok(())
}

fn writer(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}
