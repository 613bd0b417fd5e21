use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gox_cli::{
    clean_generated, find_project_root, CompileOutcome, Config, GoxCompiler, SourceDiscovery,
};
use std::path::PathBuf;
use std::thread;

#[derive(Parser)]
#[command(name = "gox")]
#[command(about = "Compiler for SQL-template source files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile gox source files into generated host files
    Build(BuildArgs),
    /// Remove all generated files under a directory
    Clean(CleanArgs),
}

#[derive(Parser)]
struct BuildArgs {
    /// Path to the gox project root
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Compile a single file instead of discovering the project
    #[arg(long, short)]
    file: Option<PathBuf>,

    /// Skip files whose generated output is already up to date
    #[arg(long, short)]
    incremental: bool,

    /// Dump the preprocessed buffer and verbose diagnostics on failure
    #[arg(long, short)]
    debug: bool,
}

#[derive(Parser)]
struct CleanArgs {
    /// Directory to clean
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Build(args) => {
            init_telemetry(args.debug);
            build(args)
        }
        Commands::Clean(args) => {
            init_telemetry(false);
            clean(args)
        }
    }
}

fn init_telemetry(debug: bool) {
    let default_filter = if debug { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build(args: BuildArgs) -> Result<()> {
    let compiler = GoxCompiler::new(args.debug);

    // Single-file mode bypasses discovery entirely.
    if let Some(file) = args.file {
        match compiler.compile_file(&file, args.incremental)? {
            CompileOutcome::Written(dest) => println!("Generated: {}", dest.display()),
            CompileOutcome::UpToDate(_) => println!("Up to date: {}", file.display()),
        }
        return Ok(());
    }

    let project_dir = find_project_root(&args.project_dir)
        .with_context(|| format!("Failed to find project root from {:?}", args.project_dir))?;

    let config = Config::load_or_default(&project_dir)?;
    println!("Project: {} ({})", config.name, project_dir.display());

    let discovery = SourceDiscovery::new(project_dir, config.source_paths.clone());
    let sources = discovery.discover()?;
    println!("Found {} gox source files", sources.len());

    // One task per file; tasks share no mutable state.
    let compiler = &compiler;
    let incremental = args.incremental;
    let results: Vec<(&PathBuf, Result<CompileOutcome>)> = thread::scope(|scope| {
        let handles: Vec<_> = sources
            .iter()
            .map(|path| {
                let handle = scope.spawn(move || compiler.compile_file(path, incremental));
                (path, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(path, handle)| {
                let result = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("compile task panicked")));
                (path, result)
            })
            .collect()
    });

    let mut failures = 0;
    for (path, result) in results {
        match result {
            Ok(CompileOutcome::Written(dest)) => {
                println!("  ✓ {} -> {}", path.display(), dest.display());
            }
            Ok(CompileOutcome::UpToDate(_)) => {
                println!("  - {} (up to date)", path.display());
            }
            Err(err) => {
                failures += 1;
                eprintln!("  ✗ {}: {:#}", path.display(), err);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{failures} file(s) failed to compile");
    }
    Ok(())
}

fn clean(args: CleanArgs) -> Result<()> {
    let removed = clean_generated(&args.root)?;
    for path in &removed {
        println!("Removed: {}", path.display());
    }
    println!("Removed {} generated file(s)", removed.len());
    Ok(())
}
