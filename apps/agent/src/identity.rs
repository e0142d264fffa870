//! Persistent client identifier.

use std::path::{Path, PathBuf};

use anyhow::Context;
use uuid::Uuid;

/// Default location of the client id file in the user data directory.
pub fn default_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join("remote-agent").join("client_id"))
}

/// Read the client id stored at `path`, creating one if absent or empty.
///
/// # Errors
/// Returns error if the file cannot be read or written.
pub fn load_or_create(path: &Path) -> anyhow::Result<String> {
    match std::fs::read_to_string(path) {
        Ok(stored) if !stored.trim().is_empty() => return Ok(stored.trim().to_string()),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("reading client id from {}", path.display()));
        }
    }

    let id = Uuid::new_v4().to_string();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(path, &id).with_context(|| format!("writing client id to {}", path.display()))?;
    tracing::info!(client_id = %id, path = %path.display(), "Generated client id");
    Ok(id)
}
