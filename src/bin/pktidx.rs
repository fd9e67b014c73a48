//! pktidx command-line tool.
//!
//! ```text
//! pktidx build   --input pairs.txt --out-dir idx --prefix cap
//! pktidx inspect idx/cap-0000.i4 --keys
//! pktidx query   --dir idx --prefix cap "i4(10.0.0.1) & ix(443)"
//! ```
//!
//! `build` reads `offset kind key` lines (kind: v4, v6, port, pattern), as
//! produced by an external dissector. SIGINT/SIGTERM stop reading input; the
//! segments gathered so far are still written.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use pktidx::index::file::{list_segments, MappedIndex};
use pktidx::pipeline::{KeyVariant, SegmentIndexer};
use pktidx::query::{parse, query_segments};
use pktidx::{IndexConfig, Method};

#[derive(Parser)]
#[command(name = "pktidx", version, about = "Build and query packet-capture offset indexes")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build index files from `offset kind key` lines
    Build {
        /// Input file, `-` for stdin
        #[arg(long, default_value = "-")]
        input: String,
        /// JSON config; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        method: Option<Method>,
        #[arg(long)]
        segment_cap: Option<u64>,
        #[arg(long)]
        mailbox: Option<usize>,
    },
    /// Print trailer metadata of one index file
    Inspect {
        file: PathBuf,
        /// Also list every key
        #[arg(long)]
        keys: bool,
    },
    /// Evaluate a query over segments
    Query {
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        #[arg(long, default_value = "capture")]
        prefix: String,
        /// Segment to query; repeatable. Defaults to every segment found.
        #[arg(long)]
        seq: Vec<u32>,
        /// Print absolute capture offsets instead of segment-relative ones
        #[arg(long)]
        absolute: bool,
        expr: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Build {
            input,
            config,
            out_dir,
            prefix,
            method,
            segment_cap,
            mailbox,
        } => {
            let mut cfg = match config {
                Some(path) => IndexConfig::read_from(&path)
                    .with_context(|| format!("reading config {}", path.display())),
                None => Ok(IndexConfig::default()),
            };
            if let Ok(cfg) = cfg.as_mut() {
                if let Some(v) = out_dir {
                    cfg.output_dir = v;
                }
                if let Some(v) = prefix {
                    cfg.prefix = v;
                }
                if let Some(v) = method {
                    cfg.method = v;
                }
                if let Some(v) = segment_cap {
                    cfg.segment_cap = v;
                }
                if mailbox.is_some() {
                    cfg.mailbox_capacity = mailbox;
                }
            }
            cfg.and_then(|cfg| build(&input, cfg))
        }
        Command::Inspect { file, keys } => inspect(&file, keys),
        Command::Query {
            dir,
            prefix,
            seq,
            absolute,
            expr,
        } => query(&dir, &prefix, seq, absolute, &expr),
    };

    if let Err(e) = result {
        let code = e
            .downcast_ref::<pktidx::IndexError>()
            .map_or("ERROR", |ie| ie.code());
        eprintln!("[pktidx] {}: {:#}", code, e);
        std::process::exit(1);
    }
}

fn build(input: &str, config: IndexConfig) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(sig, Arc::clone(&stop))?;
    }

    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(
            File::open(input).with_context(|| format!("opening {}", input))?,
        ))
    };

    tracing::info!(
        "indexing into {} as {}-NNNN.* with {}",
        config.output_dir.display(),
        config.prefix,
        config.method
    );
    let mut indexer = SegmentIndexer::new(config)?;
    for (lineno, line) in reader.lines().enumerate() {
        if stop.load(Ordering::Relaxed) {
            tracing::warn!("interrupted at input line {}, writing what was read", lineno + 1);
            break;
        }
        let line = line?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let (offset, key) = parse_pair(line).with_context(|| format!("input line {}", lineno + 1))?;
        indexer.add(offset, key)?;
    }

    let summary = indexer.finish()?;
    println!(
        "{} pairs, {} segments, {} files, {} bytes",
        summary.pairs, summary.segments, summary.writer.files_written, summary.writer.bytes_written
    );
    Ok(())
}

fn parse_pair(line: &str) -> anyhow::Result<(u64, KeyVariant)> {
    let mut fields = line.split_whitespace();
    let (Some(offset), Some(kind), Some(key), None) = (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        bail!("expected `offset kind key`, got '{}'", line);
    };
    let offset: u64 = offset.parse().context("bad offset")?;
    let key = match kind {
        "v4" => KeyVariant::from(key.parse::<Ipv4Addr>().context("bad IPv4 key")?),
        "v6" => KeyVariant::from(key.parse::<Ipv6Addr>().context("bad IPv6 key")?),
        "port" => KeyVariant::Port(key.parse().context("bad port key")?),
        "pattern" => KeyVariant::Pattern(key.parse().context("bad pattern id")?),
        other => bail!("unknown key kind '{}'", other),
    };
    Ok((offset, key))
}

fn inspect(path: &Path, keys: bool) -> anyhow::Result<()> {
    let mapped = MappedIndex::open(path)?;
    let view = mapped.view()?;
    let stats = view.stats();
    println!("file:           {}", mapped.path().display());
    println!("method:         {}", stats.method);
    println!("key width:      {}", stats.key_width);
    println!("keys:           {}", stats.key_count);
    println!("segment offset: {}", stats.segment_offset);
    println!("chunk bytes:    {}", stats.chunk_bytes);
    println!("key block:      {}", stats.key_block_bytes);
    println!("offset block:   {}", stats.offset_block_bytes);
    println!("total bytes:    {}", stats.total_bytes);
    if keys {
        for key in view.keys() {
            let count = view.lookup_numeric(key)?.len();
            println!("{:>40}  {}", key, count);
        }
    }
    Ok(())
}

fn query(dir: &Path, prefix: &str, seqs: Vec<u32>, absolute: bool, expr: &str) -> anyhow::Result<()> {
    let expr = parse(expr)?;
    let seqs = if seqs.is_empty() {
        list_segments(dir, prefix)?
    } else {
        seqs
    };
    for (seq, result) in query_segments(dir, prefix, &seqs, &expr)? {
        if result.is_empty() {
            continue;
        }
        println!("# segment {} ({} offsets)", seq, result.len());
        if absolute {
            for offset in result.absolute_offsets() {
                println!("{}", offset);
            }
        } else {
            for offset in result.values() {
                println!("{}", offset);
            }
        }
    }
    Ok(())
}
