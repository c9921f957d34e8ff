//! Engine introspection, file identification and build information.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::core::engine::{Data, Engine, EngineInfo};
use crate::core::model::DataType;
use crate::core::transform::validate_source;
use crate::error::{Operation, Result};

/// Check the engine against its minimum version and describe it.
///
/// # Errors
///
/// - an engine failure wrapping `EngineError::NotFound` or
///   `EngineError::Version` in phase `check version`
/// - an engine failure in phase `info` if the engine cannot be queried
pub fn engine_info<E: Engine>(engine: &E) -> Result<EngineInfo> {
    let op = Operation::EngineInfo;

    engine
        .check_version()
        .map_err(|e| e.during(op, "check version"))?;
    let info = engine.info().map_err(|e| e.during(op, "info"))?;

    debug!(
        engine = engine.name(),
        file_name = %info.file_name,
        version = %info.version,
        "engine info"
    );
    Ok(info)
}

/// Classify the content of a file.
///
/// # Errors
///
/// - `PreconditionError::SourceNotFound` or `SourceIsDirectory`
/// - an engine failure in phase `identify` if the file cannot be read
pub fn identify_file<E: Engine>(engine: &E, path: &Path) -> Result<DataType> {
    let op = Operation::IdentifyFile;
    validate_source(op, path)?;

    let mut data = Data::from_path(path);
    let kind = engine
        .identify(&mut data)
        .map_err(|e| e.during(op, "identify"))?;

    debug!(path = %path.display(), kind = %kind, "file identified");
    Ok(kind)
}

/// Package metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct About {
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub authors: Vec<&'static str>,
    pub license: &'static str,
    pub website: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildInfo>,
}

/// Compile-time build facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub rust_version: &'static str,
    pub target_os: &'static str,
    pub target_arch: &'static str,
    pub profile: &'static str,
    pub features: Vec<&'static str>,
}

/// Describe this package; `verbose` adds build facts.
pub fn about(verbose: bool) -> About {
    About {
        name: env!("CARGO_PKG_NAME"),
        description: env!("CARGO_PKG_DESCRIPTION"),
        version: env!("CARGO_PKG_VERSION"),
        authors: env!("CARGO_PKG_AUTHORS")
            .split(':')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect(),
        license: env!("CARGO_PKG_LICENSE"),
        website: env!("CARGO_PKG_REPOSITORY"),
        build: verbose.then(build_info),
    }
}

fn build_info() -> BuildInfo {
    let mut features = Vec::new();
    if cfg!(feature = "test-gpg") {
        features.push("test-gpg");
    }

    BuildInfo {
        rust_version: env!("CARGO_PKG_RUST_VERSION"),
        target_os: std::env::consts::OS,
        target_arch: std::env::consts::ARCH,
        profile: if cfg!(debug_assertions) {
            "debug"
        } else {
            "release"
        },
        features,
    }
}
