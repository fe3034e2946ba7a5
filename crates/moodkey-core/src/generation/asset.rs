use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Copy a bundled model asset into writable storage, once.
///
/// Returns the destination path. An existing destination is reused as-is.
/// The copy is staged in a `.part` file and renamed into place.
pub fn prepare_model_asset(source: &Path, dest_dir: &Path) -> Result<PathBuf, io::Error> {
    let file_name = source.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{}: asset path has no file name", source.display()),
        )
    })?;
    let dest = dest_dir.join(file_name);
    if dest.exists() {
        debug!(path = %dest.display(), "model asset already prepared");
        return Ok(dest);
    }

    fs::create_dir_all(dest_dir)?;
    let mut part = dest.clone().into_os_string();
    part.push(".part");
    let part = PathBuf::from(part);

    if let Err(e) = fs::copy(source, &part).and_then(|_| fs::rename(&part, &dest)) {
        let _ = fs::remove_file(&part);
        return Err(e);
    }
    info!(path = %dest.display(), "model asset copied");
    Ok(dest)
}
