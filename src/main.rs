//! embedfs command-line tool
//!
//! Packs a file or directory into a generated Rust module, and inspects a
//! source tree through the same virtual filesystem the generated code exposes.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use embedfs::{AssetStore, EmbedError, EncryptionKey, KeyStyle, PackConfig, Packer, SourceWriter};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Entries requested per listing page
const LIST_PAGE_SIZE: usize = 64;

#[derive(Parser)]
#[command(name = "embedfs")]
#[command(author, version, long_about = None)]
#[command(about = "Pack files into an in-memory, optionally encrypted asset store")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a file or directory into a generated .rs module
    Pack {
        /// TOML file with pack settings; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// File or directory to read assets from
        #[arg(long)]
        source: Option<PathBuf>,

        /// Path of the generated .rs file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Name of the generated constructor function (default: assets)
        #[arg(long)]
        function: Option<String>,

        /// Path the generated code imports AssetStore from (default: embedfs)
        #[arg(long)]
        crate_path: Option<String>,

        /// Hex-encoded key (16, 24 or 32 bytes); encrypts every stored blob
        #[arg(long, env = "EMBEDFS_ENCRYPTION_KEY", hide_env_values = true)]
        encryption_key: Option<EncryptionKey>,

        /// Key form for directory sources: rooted, relative or both
        #[arg(long)]
        key_style: Option<KeyStyle>,
    },

    /// List a virtual directory (or describe a file) of a packed source
    Ls {
        #[command(flatten)]
        source: SourceArgs,

        /// Virtual path to list
        #[arg(default_value = "/")]
        path: String,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the contents of a packed file to stdout
    Cat {
        #[command(flatten)]
        source: SourceArgs,

        /// Virtual path to read
        path: String,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// File or directory to pack in memory
    #[arg(long)]
    source: PathBuf,

    /// Hex-encoded key; the tree is encrypted and decrypted again before reading
    #[arg(long, env = "EMBEDFS_ENCRYPTION_KEY", hide_env_values = true)]
    encryption_key: Option<EncryptionKey>,

    /// Key form for directory sources: rooted, relative or both
    #[arg(long, default_value = "both")]
    key_style: KeyStyle,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Pack {
            config,
            source,
            output,
            function,
            crate_path,
            encryption_key,
            key_style,
        } => {
            let mut pack_config = match config {
                Some(path) => PackConfig::from_file(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PackConfig::default(),
            };
            if let Some(source) = source {
                pack_config.source = source;
            }
            if let Some(output) = output {
                pack_config.output = output;
            }
            if let Some(function) = function {
                pack_config.function = function;
            }
            if let Some(crate_path) = crate_path {
                pack_config.crate_path = crate_path;
            }
            if encryption_key.is_some() {
                pack_config.encryption_key = encryption_key;
            }
            if let Some(key_style) = key_style {
                pack_config.key_style = key_style;
            }
            cmd_pack(pack_config)
        }
        Commands::Ls { source, path, json } => cmd_ls(source, &path, json),
        Commands::Cat { source, path } => cmd_cat(source, &path),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn cmd_pack(config: PackConfig) -> anyhow::Result<()> {
    if config.source.as_os_str().is_empty() {
        bail!("Missing required --source flag");
    }
    if config.output.as_os_str().is_empty() {
        bail!("Missing required --output flag");
    }
    config.validate()?;

    let writer = SourceWriter::new(&config);
    let mut packer = Packer::new(config.clone());
    let store = packer
        .pack()
        .with_context(|| format!("Failed to pack {}", config.source.display()))?;
    writer
        .write(store)
        .with_context(|| format!("Failed to write {}", config.output.display()))?;

    info!(
        "Packed files from {} to {}",
        config.source.display(),
        config.output.display()
    );
    Ok(())
}

/// Pack the source in memory and, when a key is given, push every blob through
/// encryption and back so reads go through the same path as generated code.
fn load_store(args: SourceArgs) -> anyhow::Result<AssetStore> {
    let mut config = PackConfig::new(&args.source, PathBuf::new()).with_key_style(args.key_style);
    if let Some(key) = &args.encryption_key {
        config = config.with_encryption_key(key.clone());
    }

    let mut store = embedfs::packer::pack(config)
        .with_context(|| format!("Failed to pack {}", args.source.display()))?;
    if let Some(key) = &args.encryption_key {
        store.decrypt(key.as_bytes()).context("Failed to decrypt packed store")?;
    }
    Ok(store)
}

fn cmd_ls(args: SourceArgs, path: &str, json: bool) -> anyhow::Result<()> {
    let store = load_store(args)?;
    let mut file = store.open(path)?;

    let entries = if file.is_dir() {
        let mut entries = Vec::new();
        loop {
            match file.read_dir(LIST_PAGE_SIZE) {
                Ok(page) => entries.extend(page),
                Err(EmbedError::EndOfListing) => break,
                Err(e) => return Err(e.into()),
            }
        }
        entries
    } else {
        vec![file.stat()]
    };
    file.close();

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &entries)?;
        writeln!(out)?;
    } else {
        for entry in &entries {
            let kind = if entry.is_dir { 'd' } else { '-' };
            writeln!(out, "{} {:o} {:>10} {}", kind, entry.mode, entry.size, entry.path)?;
        }
    }
    Ok(())
}

fn cmd_cat(args: SourceArgs, path: &str) -> anyhow::Result<()> {
    let store = load_store(args)?;
    let mut file = store.open(path)?;
    if file.is_dir() {
        return Err(EmbedError::IsADirectory(path.to_string()).into());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    io::copy(&mut file, &mut out)?;
    out.flush()?;
    Ok(())
}
