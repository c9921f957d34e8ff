//! Command-line interface.
//!
//! A thin front-end over the library. Commands load the configuration, build
//! a [`GpgEngine`] from it and report results; all printing happens here.

pub mod completions;
pub mod files;
pub mod info;
pub mod keys;
pub mod output;
pub mod text;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::core::constants;
use crate::core::engine::{EncryptFlags, GpgEngine};
use crate::error::Result;

/// gpghigh - high-level OpenPGP file and buffer operations.
#[derive(Parser)]
#[command(
    name = "gpghigh",
    about = "High-level OpenPGP file and buffer operations on top of GnuPG",
    version
)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file
    #[arg(long, global = true, env = constants::CONFIG_ENV)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Encrypt a file to one or more recipients
    Encrypt {
        /// File to encrypt
        file: PathBuf,
        /// Output file (default: <file>.gpg)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Recipient key (fingerprint, key id, or email)
        #[arg(short, long = "recipient", required = true)]
        recipients: Vec<String>,
        /// Also sign with the default key
        #[arg(short, long)]
        sign: bool,
    },

    /// Decrypt a file and verify its signatures
    Decrypt {
        /// File to decrypt (.gpg, .pgp or .asc unless --output is given)
        file: PathBuf,
        /// Output file (must not exist)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add recipients to an encrypted file in place
    AddRecipient {
        #[command(flatten)]
        args: RecipientArgs,
    },

    /// Replace the recipients of an encrypted file in place
    ChangeRecipient {
        #[command(flatten)]
        args: RecipientArgs,
    },

    /// Sign text read from stdin
    Sign {
        /// Signing key (fingerprint, key id, or email)
        #[arg(short = 'u', long)]
        signer: String,
        /// Binary output instead of ASCII armor
        #[arg(long)]
        no_armor: bool,
    },

    /// Verify a signed message read from stdin and print its text
    Verify {
        /// Output signatures as JSON on stderr
        #[arg(long)]
        json: bool,
    },

    /// List keys with their user IDs and certifications
    Keys {
        /// Key pattern (default: all keys)
        pattern: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what kind of OpenPGP data files contain
    Identify {
        /// Files to identify
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the gpg engine in use
    Engine {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show package information
    About {
        /// Include build information
        #[arg(long)]
        build: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments shared by the recipient commands.
#[derive(clap::Args)]
pub struct RecipientArgs {
    /// Encrypted file to rewrite
    pub file: PathBuf,
    /// Recipient key (fingerprint, key id, or email)
    #[arg(short, long = "recipient", required = true)]
    pub recipients: Vec<String>,
    /// Backup extension for the original (default from config)
    #[arg(short, long, conflicts_with = "no_backup")]
    pub backup_ext: Option<String>,
    /// Remove the original instead of keeping a backup
    #[arg(long)]
    pub no_backup: bool,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a parsed command line.
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or the command fails.
pub fn execute(cli: Cli) -> Result<()> {
    use Command::*;

    // neither needs configuration nor an engine
    match &cli.command {
        About { build } => return info::about(*build),
        Completions { shell } => return completions::execute(shell.clone()),
        _ => {}
    }

    let config = Config::load(cli.config.as_deref())?;
    let engine = GpgEngine::from_config(&config.engine);

    match cli.command {
        Encrypt {
            file,
            output,
            recipients,
            sign,
        } => files::encrypt(&engine, &file, output.as_deref(), &recipients, sign),
        Decrypt { file, output, json } => files::decrypt(&engine, &file, output.as_deref(), json),
        AddRecipient { args } => {
            files::modify(&engine, &config, EncryptFlags::ADD_RECIPIENTS, &args)
        }
        ChangeRecipient { args } => {
            files::modify(&engine, &config, EncryptFlags::CHANGE_RECIPIENTS, &args)
        }
        Sign { signer, no_armor } => text::sign(&engine, &signer, config.files.armor && !no_armor),
        Verify { json } => text::verify(&engine, json),
        Keys { pattern, json } => keys::list(&engine, pattern.as_deref().unwrap_or(""), json),
        Identify { files } => info::identify(&engine, &files),
        Engine { json } => info::engine(&engine, json),
        About { .. } | Completions { .. } => Ok(()),
    }
}
