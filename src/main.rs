//! gpghigh - high-level OpenPGP file and buffer operations.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gpghigh::cli::output;
use gpghigh::cli::{execute, Cli};
use gpghigh::core::constants;
use gpghigh::error::{ConflictError, EngineError, Error, LookupError, PreconditionError};

fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber with env-filter support
    let filter = EnvFilter::try_from_env(constants::LOG_ENV).unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("gpghigh=debug")
        } else {
            EnvFilter::new("gpghigh=warn")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = execute(cli) {
        output::error(&e.to_string());
        if let Some(hint) = hint(&e) {
            output::hint(hint);
        }
        std::process::exit(1);
    }
}

/// Suggestion printed under an error, if one applies.
fn hint(e: &Error) -> Option<&'static str> {
    match e {
        Error::Engine(_) => match e.engine_error()? {
            EngineError::NotFound { .. } => {
                Some("install GnuPG, or set engine.program in the config file")
            }
            EngineError::Version { .. } => Some("upgrade GnuPG, or lower engine.min_version"),
            _ => None,
        },
        Error::Precondition(PreconditionError::UnknownExtension { .. }) => {
            Some("name the output file with --output")
        }
        Error::Conflict(ConflictError::DestinationExists { .. }) => {
            Some("remove the existing file or choose another with --output")
        }
        Error::Lookup(LookupError::NoKeys { .. } | LookupError::Recipient { .. }) => {
            Some("run: gpghigh keys")
        }
        _ => None,
    }
}
