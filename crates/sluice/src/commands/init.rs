//! Scaffold a project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sluice_config::{DEFAULT_CONFIG, DEFAULT_SOURCES};

/// Write the default project file and source skeleton next to `config`.
///
/// Existing files are left alone unless `force` is set.
pub async fn run(config: &Path, force: bool) -> Result<()> {
    tracing::info!("Initializing sluice project...");

    let root = match config.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&root)
        .with_context(|| format!("Failed to create {}", root.display()))?;

    if !config.exists() || force {
        fs::write(config, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write {}", config.display()))?;
        tracing::info!("Created {}", config.display());
    } else {
        tracing::warn!(
            "{} already exists. Use --force to overwrite.",
            config.display()
        );
    }

    for (rel, contents) in DEFAULT_SOURCES {
        let path = root.join(rel);
        if path.exists() && !force {
            tracing::debug!("Keeping {}", path.display());
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Created {}", rel);
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'sluice' to start the development server.");

    Ok(())
}
