//! Introspection commands: identify, engine, about.

use std::path::PathBuf;

use crate::cli::output;
use crate::core::engine::Engine;
use crate::core::info;
use crate::error::Result;

/// Print the data type of each file.
pub fn identify<E: Engine>(engine: &E, files: &[PathBuf]) -> Result<()> {
    for file in files {
        let kind = info::identify_file(engine, file)?;
        output::data(&format!("{}: {}", file.display(), kind));
    }
    Ok(())
}

/// Describe the engine.
pub fn engine<E: Engine>(engine: &E, json: bool) -> Result<()> {
    let info = info::engine_info(engine)?;

    if json {
        output::data(&serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    output::header(engine.name());
    output::kv("program:", output::path(&info.file_name));
    output::kv("home:", info.home_dir.as_deref().unwrap_or("(default)"));
    output::kv("required:", &info.required_version);
    output::kv("version:", &info.version);
    Ok(())
}

/// Print package information.
pub fn about(build: bool) -> Result<()> {
    let about = info::about(build);

    output::data(about.description);
    output::data(&format!("Version  : {}", about.version));
    if !about.authors.is_empty() {
        output::data("Authors  :");
        for author in &about.authors {
            output::data(&format!(" - {}", author));
        }
    }
    output::data(&format!("License  : {}", about.license));
    output::data(&format!("Website  : {}", about.website));

    if let Some(build) = &about.build {
        output::data("Build Info:");
        output::data(&format!(" - Rust version : {}", build.rust_version));
        output::data(&format!(" - Target       : {}-{}", build.target_os, build.target_arch));
        output::data(&format!(" - Profile      : {}", build.profile));
        if build.features.is_empty() {
            output::data(" - Features     : none");
        } else {
            output::data(&format!(" - Features     : {}", build.features.join(", ")));
        }
    }
    Ok(())
}
