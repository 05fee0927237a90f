//! assetpack command-line tool
//!
//! Create, list and extract flat-file asset archives

use anyhow::{bail, Context};
use assetpack::{ArchiveBuilder, ArchiveReader, CompressionConfig, CompressionMethod};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "assetpack")]
#[command(about = "Pack, list and extract flat-file asset archives", version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pack files into a new archive (replaces any existing file)
    Create {
        /// Output archive path
        archive: PathBuf,

        /// Files to add, in order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Compress every member
        #[arg(short, long)]
        compress: bool,

        /// Codec used with --compress (zlib, lz4, zstd) [default: zlib]
        #[arg(long, default_value = "zlib")]
        codec: String,

        /// Codec level (zlib 0-9, zstd 1-22)
        #[arg(long)]
        level: Option<i32>,

        /// Store members under their file name instead of the given path
        #[arg(long)]
        basename: bool,
    },

    /// List archive members in TOC order
    List {
        archive: PathBuf,

        /// Show offset, stored size and name checksum
        #[arg(short, long)]
        long: bool,

        /// Emit the TOC as JSON
        #[arg(long, conflicts_with = "long")]
        json: bool,
    },

    /// Extract one member to a file
    Extract {
        archive: PathBuf,

        /// Member name, exactly as listed
        name: String,

        /// Where to write the member
        output: PathBuf,
    },
}

#[derive(Serialize)]
struct Listing<'a> {
    compression: &'static str,
    toc_offset: u64,
    entries: &'a [assetpack::Entry],
}

/// Parse the codec selection from CLI strings
fn parse_compression(compress: bool, codec: &str, level: Option<i32>) -> anyhow::Result<CompressionConfig> {
    if !compress {
        return Ok(CompressionConfig::none());
    }

    let config = match codec.parse::<CompressionMethod>().map_err(anyhow::Error::msg)? {
        CompressionMethod::None => bail!("--compress needs a codec other than 'none'"),
        CompressionMethod::Zlib => CompressionConfig::zlib(),
        CompressionMethod::Lz4 => CompressionConfig::lz4(),
        CompressionMethod::Zstd => CompressionConfig::zstd(),
    };

    Ok(match level {
        Some(level) => config.with_level(level),
        None => config,
    })
}

fn create(
    archive: PathBuf,
    files: Vec<PathBuf>,
    compression: CompressionConfig,
    basename: bool,
) -> anyhow::Result<()> {
    info!(
        "Creating {:?} with {} files, compression={}",
        archive,
        files.len(),
        compression.method.name()
    );

    let mut builder = ArchiveBuilder::with_compression(compression);
    for file in &files {
        let added = if basename {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("{:?} has no usable file name", file))?;
            builder.add_file_as(file, name)
        } else {
            builder.add_file(file)
        };
        added.with_context(|| format!("Failed to add {:?}", file))?;
    }

    let summary = builder
        .write(&archive)
        .with_context(|| format!("Failed to write {:?}", archive))?;
    println!(
        "{}: {} members, {} bytes",
        archive.display(),
        summary.member_count,
        summary.total_len
    );
    Ok(())
}

fn list(archive: PathBuf, long: bool, json: bool) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("Failed to open {:?}", archive))?;

    if json {
        let listing = Listing {
            compression: reader.compression().name(),
            toc_offset: reader.header().toc_offset,
            entries: reader.entries(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
    } else if long {
        for entry in reader.entries() {
            println!(
                "{:>12} {:>12} {:08x} {}",
                entry.offset, entry.size, entry.name_checksum, entry.name
            );
        }
    } else {
        for name in reader.list() {
            println!("{}", name);
        }
    }
    Ok(())
}

fn extract(archive: PathBuf, name: String, output: PathBuf) -> anyhow::Result<()> {
    let reader = ArchiveReader::open(&archive).with_context(|| format!("Failed to open {:?}", archive))?;
    let written = reader
        .extract(&name, &output)
        .with_context(|| format!("Failed to extract '{}' from {:?}", name, archive))?;
    info!("Extracted '{}' ({} bytes) to {:?}", name, written, output);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    match args.command {
        Command::Create {
            archive,
            files,
            compress,
            codec,
            level,
            basename,
        } => {
            let compression = parse_compression(compress, &codec, level)?;
            create(archive, files, compression, basename)
        }
        Command::List {
            archive,
            long,
            json,
        } => list(archive, long, json),
        Command::Extract {
            archive,
            name,
            output,
        } => extract(archive, name, output),
    }
}
