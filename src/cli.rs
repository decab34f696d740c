//! Command-line surface: argument parsing, logging setup, file I/O.
//!
//! All format logic lives in the library modules; this layer only decides
//! what to run, reads the input fully into memory, and writes the output
//! buffer once the transform has fully succeeded.

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::fs;
use std::path::PathBuf;

use crate::codec::{Codec, OozCodec, ZlibCodec};
use crate::error::Result;
use crate::save::{self, Direction};

/// Hogwarts Legacy save tool - decompress/compress the embedded
/// RawDatabaseImage SQLite database.
#[derive(Parser, Debug)]
#[command(name = "hlsaves")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print additional info about headers, offsets and blocks
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert old format to new: compress the raw SQLite database back
    /// into the chunked container the game expects
    Compress {
        input: PathBuf,
        output: PathBuf,
        /// Compression backend for the new blocks
        #[arg(long, value_enum, default_value_t = CodecKind::Zlib)]
        codec: CodecKind,
    },
    /// Convert new format to old: extract the raw SQLite database so
    /// external save editors can open it
    Decompress {
        input: PathBuf,
        output: PathBuf,
        /// Decompression backend for the existing blocks
        #[arg(long, value_enum, default_value_t = CodecKind::Oodle)]
        codec: CodecKind,
    },
}

/// Selectable production codecs. Oodle (via `oozextract`) matches what the
/// game writes but cannot compress without the proprietary SDK; zlib
/// handles both directions.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CodecKind {
    Oodle,
    Zlib,
}

impl CodecKind {
    fn build(self) -> Box<dyn Codec> {
        match self {
            CodecKind::Oodle => Box::new(OozCodec),
            CodecKind::Zlib => Box::new(ZlibCodec),
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .parse_default_env()
        .init();

    let (direction, input, output, codec_kind) = match cli.command {
        Command::Compress {
            input,
            output,
            codec,
        } => (Direction::Compress, input, output, codec),
        Command::Decompress {
            input,
            output,
            codec,
        } => (Direction::Decompress, input, output, codec),
    };

    let verb = match direction {
        Direction::Compress => "compress",
        Direction::Decompress => "decompress",
    };
    println!("Trying to {verb} save file {:?}", input);

    let buffer = fs::read(&input)?;
    log::info!("read {} bytes from {:?}", buffer.len(), input);

    // The codec is held for the duration of the transform and released
    // afterwards regardless of outcome.
    let codec = codec_kind.build();
    let out = save::transform(&buffer, direction, codec.as_ref())?;

    // Written only after the whole transform succeeded; a failure above
    // leaves no partial output file behind.
    fs::write(&output, &out)?;
    println!("Successfully {verb}ed save file to {:?}", output);
    Ok(())
}
