use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use cs_batch::{BatchError, BatchProgressEvent, BatchStage, dataset_manifest, run_levels};
use cs_core::timing::{self, derive_timing};
use cs_graph::CircuitArena;
use cs_netlist::{NetlistError, parse_spice};
use cs_project::{ProjectConfig, ProjectError, SolveModeDef, load_yaml, migrate_to_latest, save_yaml, validate_config};
use cs_results::{DatasetStore, ResultsError, element_stats};
use cs_symbolic::{DerivationStrategy, DeriveError, SolveMode, SymbolicEquationSet, derive};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::Level;

type CliResult<T> = Result<T, CliError>;

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    Results(#[from] ResultsError),
    #[error(transparent)]
    Netlist(#[from] NetlistError),
    #[error(transparent)]
    Derive(#[from] DeriveError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{path} already exists (use --force to overwrite)")]
    Exists { path: String },
}

#[derive(Parser)]
#[command(name = "circuitsynth")]
#[command(about = "Synthesize random circuit problems and derive their equations", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Print a per-stage derivation timing summary
    #[arg(long, global = true)]
    timing: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a dataset of circuits (and equations) from a configuration
    Generate {
        /// Path to the configuration YAML file
        config_path: PathBuf,
        /// Output dataset directory
        #[arg(short, long)]
        out: PathBuf,
        /// Circuits per level (overrides batch.count)
        #[arg(long)]
        count: Option<usize>,
        /// Highest hierarchy level (overrides batch.level)
        #[arg(long)]
        level: Option<u8>,
        /// Worker threads (overrides batch.workers)
        #[arg(long)]
        workers: Option<usize>,
        /// Base seed (overrides batch.seed)
        #[arg(long)]
        seed: Option<u64>,
        /// Skip symbolic analysis
        #[arg(long)]
        no_analysis: bool,
    },
    /// Derive equations for a SPICE-style netlist file
    Derive {
        /// Path to the netlist file
        netlist_path: PathBuf,
        #[arg(long, value_enum, default_value_t = ModeArg::Thorough)]
        mode: ModeArg,
        /// Wall-clock budget in milliseconds
        #[arg(long, default_value_t = 30_000)]
        budget_ms: u64,
        /// Largest accepted component count
        #[arg(long, default_value_t = 20)]
        cap: usize,
        /// Print the equation set as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write a default configuration file
    InitConfig {
        /// Destination path
        path: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Load and validate a configuration file
    CheckConfig {
        /// Path to the configuration YAML file
        config_path: PathBuf,
    },
    /// Summarize a generated dataset
    Summary {
        /// Dataset directory
        dataset: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Fast,
    Thorough,
}

impl From<ModeArg> for SolveMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Fast => SolveMode::Fast,
            ModeArg::Thorough => SolveMode::Thorough,
        }
    }
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
    if cli.timing {
        timing::enable_timing();
    }

    let outcome = match cli.command {
        Commands::Generate {
            config_path,
            out,
            count,
            level,
            workers,
            seed,
            no_analysis,
        } => {
            let mut config = load_config(&config_path)?;
            if let Some(count) = count {
                config.batch.count = count;
            }
            if let Some(level) = level {
                config.batch.level = level;
            }
            if let Some(workers) = workers {
                config.batch.workers = workers;
            }
            if let Some(seed) = seed {
                config.batch.seed = seed;
            }
            if no_analysis {
                config.analysis.enabled = false;
            }
            cmd_generate(&config, &out)
        }
        Commands::Derive {
            netlist_path,
            mode,
            budget_ms,
            cap,
            json,
        } => {
            let strategy = DerivationStrategy {
                mode: mode.into(),
                budget: Duration::from_millis(budget_ms),
                component_cap: cap,
            };
            cmd_derive(&netlist_path, &strategy, json)
        }
        Commands::InitConfig { path, force } => cmd_init_config(&path, force),
        Commands::CheckConfig { config_path } => cmd_check_config(&config_path),
        Commands::Summary { dataset } => cmd_summary(&dataset),
    };
    derive_timing::print_summary();
    outcome
}

fn load_config(path: &Path) -> CliResult<ProjectConfig> {
    Ok(migrate_to_latest(load_yaml(path)?)?)
}

fn cmd_generate(config: &ProjectConfig, out: &Path) -> CliResult<()> {
    println!(
        "Generating {} circuit(s) per level, levels 0..={}",
        config.batch.count, config.batch.level
    );
    let store = DatasetStore::new(out.to_path_buf())?;
    store.reset()?;
    let pool = CircuitArena::new();

    let mut last_emit = Instant::now();
    let reports = run_levels(
        config,
        &pool,
        Some(&store),
        Some(&mut |event: BatchProgressEvent| {
            let boundary = !matches!(
                event.stage,
                BatchStage::CircuitProduced | BatchStage::CircuitFailed
            );
            if boundary || last_emit.elapsed().as_millis() >= 100 {
                render_progress(&event);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    let name = out
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string());
    let manifest = dataset_manifest(&name, config, &reports);
    store.save_manifest(&manifest)?;

    for r in &reports {
        let mark = if r.is_complete() { '✓' } else { '!' };
        println!(
            "{mark} Level {}: {}/{} produced, {} analyzed, {} failed, {} attempts ({:.2}s)",
            r.level,
            r.produced,
            r.requested,
            r.analyzed,
            r.failures.total(),
            r.attempts,
            r.elapsed.as_secs_f64()
        );
    }
    println!("Dataset {} written to {}", manifest.dataset_id, out.display());
    Ok(())
}

fn cmd_derive(path: &Path, strategy: &DerivationStrategy, json: bool) -> CliResult<()> {
    let text = std::fs::read_to_string(path)?;
    let netlist = parse_spice(&text)?;
    let set = derive(&netlist, &netlist.title, strategy)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        print_equations(&set);
    }
    Ok(())
}

fn print_equations(set: &SymbolicEquationSet) {
    println!(
        "H(s) = {} / {} = {}",
        set.output_label, set.input_label, set.transfer.expression
    );
    println!(
        "  mode={}  components={}  complexity={}  reduced={}  {:.3}s",
        set.mode.as_str(),
        set.component_count,
        set.complexity_score,
        set.fully_reduced,
        set.elapsed_ms as f64 / 1000.0
    );
    if !set.parameters.is_empty() {
        println!("  parameters: {}", set.parameters.join(", "));
    }
    println!("\nLaplace domain:");
    for eq in &set.laplace_system {
        println!("  {eq}");
    }
    println!("\nTime domain:");
    for eq in &set.time_domain_system {
        println!("  {eq}");
    }
    if !set.node_voltages.is_empty() {
        println!("\nRelations:");
        for r in set.node_voltages.iter().chain(&set.element_voltages) {
            println!("  {} = {}", r.quantity, r.expression);
        }
    }
}

fn cmd_init_config(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::Exists {
            path: path.display().to_string(),
        });
    }
    save_yaml(path, &ProjectConfig::default())?;
    println!("✓ Wrote default configuration to {}", path.display());
    Ok(())
}

fn cmd_check_config(path: &Path) -> CliResult<()> {
    println!("Checking configuration: {}", path.display());
    let config = load_config(path)?;
    validate_config(&config).map_err(ProjectError::from)?;
    println!("✓ Configuration is valid");
    println!(
        "  count={} level={} workers={} attempt budget={}",
        config.batch.count,
        config.batch.level,
        config.batch.workers,
        config.attempt_budget()
    );
    let mode = match config.analysis.mode {
        SolveModeDef::Fast => "fast",
        SolveModeDef::Thorough => "thorough",
    };
    if config.analysis.enabled {
        println!(
            "  analysis: {mode}, cap {} components, {} ms budget",
            config.analysis.component_cap, config.analysis.budget_ms
        );
    } else {
        println!("  analysis: disabled");
    }
    Ok(())
}

fn cmd_summary(dir: &Path) -> CliResult<()> {
    let store = DatasetStore::open(dir)?;
    let manifest = store.load_manifest()?;
    let joined = store.joined()?;

    println!("Dataset: {} ({})", manifest.name, manifest.dataset_id);
    println!("  Created: {}", manifest.timestamp);
    println!(
        "  Produced: {}/{}  Analyzed: {}  Attempts: {}",
        manifest.produced, manifest.requested, manifest.analyzed, manifest.attempts
    );
    if !manifest.failures.is_empty() {
        println!("\nFailures:");
        for (kind, n) in &manifest.failures {
            println!("  {kind:<22} {n}");
        }
    }

    let stats = element_stats(joined.iter().map(|(n, _)| &n.netlist));
    if !stats.is_empty() {
        println!("\nElements per circuit:");
        println!("  {:<14} {:>7} {:>7} {:>5} {:>5}", "kind", "mean", "std", "min", "max");
        for (kind, s) in stats {
            println!(
                "  {:<14} {:>7.2} {:>7.2} {:>5} {:>5}",
                format!("{kind:?}"),
                s.mean,
                s.std,
                s.min,
                s.max
            );
        }
    }

    let equations: Vec<&SymbolicEquationSet> = joined
        .iter()
        .filter_map(|(_, e)| e.as_ref().map(|e| &e.equations))
        .collect();
    if !equations.is_empty() {
        let n = equations.len() as f64;
        let complexity = equations.iter().map(|e| e.complexity_score).sum::<usize>() as f64 / n;
        let millis = equations.iter().map(|e| e.elapsed_ms).sum::<u64>() as f64 / n;
        let reduced = equations.iter().filter(|e| e.fully_reduced).count();
        println!("\nEquations: {}", equations.len());
        println!("  Mean complexity: {complexity:.2}");
        println!("  Mean derivation time: {millis:.1} ms");
        println!("  Fully reduced: {reduced}");
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_progress(event: &BatchProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} level {}  {}/{} produced  {} failed  elapsed={:.2}s",
        spinner[spin_idx],
        event.level,
        event.produced,
        event.requested,
        event.failed,
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {msg}"));
    }
    print!("{line}");
    let _ = io::stdout().flush();
}
