use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use repack_core::block::DEFAULT_BLOCK_SIZE;
use repack_core::chunking::DEFAULT_CHUNK_LIMIT;
use repack_core::normals::NormalFormat;
use repack_core::options::{RepackOptions, DEFAULT_CAPACITY_FACTOR};
use repack_core::texture::DEFAULT_TEXTURE_WIDTH;
use repack_tools::{convert_mesh, write_artifacts, ObjReader, ToolResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum NormalsArg {
    Snorm8,
    Snorm16,
}

impl From<NormalsArg> for NormalFormat {
    fn from(arg: NormalsArg) -> Self {
        match arg {
            NormalsArg::Snorm8 => NormalFormat::Snorm8,
            NormalsArg::Snorm16 => NormalFormat::Snorm16,
        }
    }
}

/// Repack an OBJ mesh into block-anchored position deltas.
#[derive(Debug, Parser)]
#[command(name = "repack", version, about)]
struct Cli {
    /// Input Wavefront OBJ file
    input: PathBuf,

    /// Directory receiving the `part_NNNN.*.bin` artifacts
    #[arg(short, long, default_value = "out")]
    output: PathBuf,

    /// Vertices per anchor block (multiple of 32 and of 3)
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u32,

    /// Anchor texture width in texels
    #[arg(long, default_value_t = DEFAULT_TEXTURE_WIDTH)]
    texture_width: u32,

    #[arg(long, value_enum, default_value = "snorm16")]
    normals: NormalsArg,

    /// Output vertex budget as a multiple of the input vertex count
    #[arg(long, default_value_t = DEFAULT_CAPACITY_FACTOR)]
    capacity_factor: f32,

    /// Maximum vertices per chunk
    #[arg(long, default_value_t = DEFAULT_CHUNK_LIMIT)]
    chunk_limit: usize,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn run(cli: &Cli) -> ToolResult<()> {
    let mesh = ObjReader::open(&cli.input)?.read_mesh()?;

    let mut options = RepackOptions::new();
    options
        .set_block_size(cli.block_size)
        .set_texture_width(cli.texture_width)
        .set_normal_format(cli.normals.into())
        .set_capacity_factor(cli.capacity_factor);

    let report = convert_mesh(&mesh, &options, cli.chunk_limit)?;
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(repacked) => {
                let paths = write_artifacts(&cli.output, repacked)?;
                info!(
                    chunk = %outcome.name,
                    vertices = repacked.output_vertex_count(),
                    blocks = repacked.block_count(),
                    deltas = %paths.deltas.display(),
                    "chunk written"
                );
            }
            Err(e) => println!("{}: not encoded ({})", outcome.name, e),
        }
    }

    let encoded = report.footprint();
    println!(
        "{} of {} chunks encoded into {}",
        report.encoded_count(),
        report.outcomes.len(),
        cli.output.display()
    );
    println!("repacked: {} ({} B)", encoded, encoded.total());
    println!("baseline: {} ({} B)", report.baseline, report.baseline.total());
    if report.encoded_count() == report.outcomes.len() {
        println!("ratio:    {:.3}", encoded.ratio_to(&report.baseline));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
