//! File discovery module for finding media files to process.
//!
//! Scans the top level of the input directory for files whose extension is in
//! the configured set (case-insensitive). Subdirectories are not searched, and
//! leftovers of the engine itself (`*.tmp`) never qualify.

use crate::error::{CoreError, CoreResult};
use crate::utils::extension_lowercase;

use std::path::{Path, PathBuf};

/// Finds media files eligible for processing in the specified directory.
///
/// Returns the matching paths sorted by name, so batch order is deterministic.
///
/// # Errors
///
/// * `CoreError::Io` - If the directory cannot be read
/// * `CoreError::NoFilesFound` - If no matching files are found
///
/// # Examples
///
/// ```rust,no_run
/// use convoy_core::find_processable_files;
/// use std::path::Path;
///
/// let extensions = vec!["mkv".to_string(), "mp4".to_string()];
/// match find_processable_files(Path::new("/path/to/videos"), &extensions) {
///     Ok(files) => println!("Found {} media files", files.len()),
///     Err(e) => println!("Error finding media files: {}", e),
/// }
/// ```
pub fn find_processable_files(input_dir: &Path, extensions: &[String]) -> CoreResult<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(input_dir)?;
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            if !path.is_file() {
                return None;
            }
            let ext = extension_lowercase(&path)?;
            extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
                .then_some(path)
        })
        .collect();

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }

    files.sort();
    log::debug!("Discovered {} file(s) in {}", files.len(), input_dir.display());
    Ok(files)
}
