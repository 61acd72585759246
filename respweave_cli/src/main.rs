use respweave_core::codec::{decode_strict, encode_tokens};
use respweave_core::config::RespweaveConfig;
use respweave_core::reducer::{Equivalence, reduce};
use respweave_core::session::Session;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_FILE: &str = "respweave.toml";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Parser, Debug)]
#[command(name = "respweave")]
#[command(about = "Structure-aware RESP command-sequence mutator tooling")]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Collapse repeated command blocks in a binary corpus file and write token lines
    Reduce {
        input: PathBuf,
        output: PathBuf,
        /// identity, shape or template
        #[arg(long)]
        equivalence: Option<Equivalence>,
        #[arg(long)]
        min_block: Option<usize>,
        #[arg(long)]
        keep_count: Option<usize>,
    },
    /// Strict-decode a binary corpus file and write it back as token lines
    Convert { input: PathBuf, output: PathBuf },
    /// Run the mutator offline, feeding each output into the next call
    Mutate {
        seed: PathBuf,
        #[arg(long)]
        donor: Option<PathBuf>,
        #[arg(long, default_value_t = 4096)]
        max_size: usize,
        #[arg(long, default_value_t = 1)]
        count: usize,
        /// Write each candidate to DIR/mutant_<i>
        #[arg(long, value_name = "DIR")]
        out_dir: Option<PathBuf>,
    },
}

/// `RUST_LOG` directives when set and valid, otherwise [`DEFAULT_LOG_LEVEL`].
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

fn init_tracing() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RespweaveConfig> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            RespweaveConfig::load_from_file(path)
                .with_context(|| format!("loading configuration from {}", path.display()))
        }
        None => {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                info!(path = %default_path.display(), "loading default configuration");
                RespweaveConfig::load_from_file(default_path)
                    .with_context(|| format!("loading configuration from {DEFAULT_CONFIG_FILE}"))
            } else {
                Ok(RespweaveConfig::default())
            }
        }
    }
}

fn run_convert(input: &Path, output: &Path) -> anyhow::Result<usize> {
    let bytes = std::fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let program = decode_strict(&bytes).with_context(|| format!("decoding {}", input.display()))?;
    std::fs::write(output, encode_tokens(&program))
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(program.len())
}

/// Returns the candidates in production order.
fn run_mutate(
    session: &Session,
    seed: &[u8],
    donor: Option<&[u8]>,
    max_size: usize,
    count: usize,
) -> Vec<Vec<u8>> {
    let mut candidates: Vec<Vec<u8>> = Vec::with_capacity(count);
    for _ in 0..count {
        let input = candidates.last().map_or(seed, Vec::as_slice);
        let out = session.mutate(input, donor, max_size);
        candidates.push(out);
    }
    candidates
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Reduce {
            input,
            output,
            equivalence,
            min_block,
            keep_count,
        } => {
            if let Some(equivalence) = equivalence {
                config.reducer.equivalence = equivalence;
            }
            if let Some(min_block) = min_block {
                config.reducer.min_block = min_block;
            }
            if let Some(keep_count) = keep_count {
                config.reducer.keep_count = keep_count;
            }
            config.validate().context("invalid reducer configuration")?;
            let stats = reduce(&input, &output, &config.reducer)
                .with_context(|| format!("reducing {}", input.display()))?;
            println!(
                "{} commands in, {} commands out",
                stats.commands_in, stats.commands_out
            );
        }
        Command::Convert { input, output } => {
            let commands = run_convert(&input, &output)?;
            info!(commands, output = %output.display(), "corpus converted");
        }
        Command::Mutate {
            seed,
            donor,
            max_size,
            count,
            out_dir,
        } => {
            let session = Session::init(config).context("invalid mutator configuration")?;
            let seed_bytes =
                std::fs::read(&seed).with_context(|| format!("reading seed {}", seed.display()))?;
            let donor_bytes = donor
                .as_ref()
                .map(|path| {
                    std::fs::read(path).with_context(|| format!("reading donor {}", path.display()))
                })
                .transpose()?;

            info!(
                format = ?session.output_format(),
                count,
                max_size,
                "running mutator"
            );
            let candidates = run_mutate(
                &session,
                &seed_bytes,
                donor_bytes.as_deref(),
                max_size,
                count,
            );
            match out_dir {
                Some(dir) => {
                    std::fs::create_dir_all(&dir)
                        .with_context(|| format!("creating {}", dir.display()))?;
                    for (i, candidate) in candidates.iter().enumerate() {
                        let path = dir.join(format!("mutant_{i}"));
                        std::fs::write(&path, candidate)
                            .with_context(|| format!("writing {}", path.display()))?;
                    }
                    info!(count = candidates.len(), dir = %dir.display(), "candidates written");
                }
                None => {
                    for (i, candidate) in candidates.iter().enumerate() {
                        println!("mutant_{i}: {} bytes", candidate.len());
                    }
                }
            }
            session.deinit();
        }
    }

    Ok(())
}
