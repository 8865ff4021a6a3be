//! protomod CLI - module digests for directories of protobuf files

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use protomod::module::{ModuleSet, ModuleSetBuilder};
use protomod::storage::DirBucket;

#[derive(Parser)]
#[command(name = "protomod")]
#[command(about = "content-addressed digests for protobuf modules")]
#[command(version)]
struct Cli {
    /// log filter, in RUST_LOG syntax
    #[arg(long, env = "PROTOMOD_LOG", global = true)]
    log: Option<String>,

    /// log at debug level when no filter is given
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// print the digest of one module directory
    Digest {
        /// module directory
        dir: PathBuf,

        /// dependency module directory
        #[arg(long = "dep")]
        deps: Vec<PathBuf>,
    },

    /// print the digests of several module directories
    Digests {
        /// module directories
        #[arg(required = true)]
        dirs: Vec<PathBuf>,

        /// dependency module directory, shared by every module
        #[arg(long = "dep")]
        deps: Vec<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref(), cli.verbose);

    if let Err(e) = run(cli.command) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn init_logging(filter: Option<&str>, verbose: bool) {
    let default = if verbose { "protomod=debug" } else { "warn" };
    let filter = match filter {
        Some(f) => EnvFilter::new(f),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(command: Commands) -> protomod::Result<()> {
    let (dirs, deps) = match command {
        Commands::Digest { dir, deps } => (vec![dir], deps),
        Commands::Digests { dirs, deps } => (dirs, deps),
    };
    let set = build_module_set(&dirs, &deps)?;
    for (opaque_id, digest) in set.digests()? {
        println!("{} {}", opaque_id, digest);
    }
    Ok(())
}

fn build_module_set(dirs: &[PathBuf], deps: &[PathBuf]) -> protomod::Result<ModuleSet> {
    let mut builder = ModuleSetBuilder::new();
    for dir in dirs {
        builder = builder.add_local_module(open(dir)?, opaque_id(dir), true);
    }
    for dep in deps {
        builder = builder.add_local_module(open(dep)?, opaque_id(dep), false);
    }
    builder.build()
}

fn open(dir: &Path) -> protomod::Result<DirBucket> {
    debug!(dir = %dir.display(), "opening module directory");
    DirBucket::open(dir)
}

fn opaque_id(dir: &Path) -> String {
    dir.display().to_string()
}

