use crate::{CoreError, CoreResult};

use std::{fs, io::Write, panic::Location, path::Path};

use error_location::ErrorLocation;
use tracing::{info, instrument};

/// Write rendered macro text to `path` using an atomic temp-file-then-rename.
///
/// A crash during the write leaves the previous macro untouched.
#[track_caller]
#[instrument(skip(text), fields(text_len = text.len()))]
pub fn save_script(path: &Path, text: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| CoreError::IoError {
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Macro path has no file name: {}", path.display()),
            ),
            location: ErrorLocation::from(Location::caller()),
        })?
        .to_string_lossy();
    let temp_path = path.with_file_name(format!(".{file_name}.tmp"));

    let mut temp_file = fs::File::create(&temp_path)?;
    temp_file.write_all(text.as_bytes())?;
    temp_file.sync_all()?;
    drop(temp_file);

    fs::rename(&temp_path, path)?;

    info!(path = ?path, "Macro saved (atomic write)");

    Ok(())
}
