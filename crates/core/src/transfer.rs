//! Importing and exporting game lists as JSON documents.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    error::{DecodeError, PersistenceError},
    models::Game,
    persistence::write_atomic,
};

/// File name used when exporting a profile's games.
pub const DEFAULT_EXPORT_FILE: &str = "ExportedGames.json";

/// Counts reported after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Games appended to the profile.
    pub imported: usize,
    /// Games skipped because their content already existed.
    pub skipped: usize,
}

impl fmt::Display for ImportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Imported {} Game(s)\n\nSkipped {} Duplicate(s)",
            self.imported, self.skipped
        )
    }
}

/// Decode a document holding one game or an array of games.
pub fn parse_games(bytes: &[u8]) -> Result<Vec<Game>, DecodeError> {
    let is_array = bytes.iter().find(|byte| !byte.is_ascii_whitespace()) == Some(&b'[');
    if is_array {
        serde_json::from_slice(bytes).map_err(|err| DecodeError::new("game list", err))
    } else {
        serde_json::from_slice::<Game>(bytes)
            .map(|game| vec![game])
            .map_err(|err| DecodeError::new("game", err))
    }
}

/// Games gathered from one file or a directory tree.
#[derive(Debug, Default)]
pub struct ImportBatch {
    /// Decoded games in file order.
    pub games: Vec<Game>,
    /// Files that could not be read or decoded.
    pub failed_files: Vec<PathBuf>,
}

/// Read games from a JSON file, or from every `*.json` file below a directory.
///
/// A single file that fails to decode is an error; inside a directory such
/// files are logged and listed in `failed_files`.
pub fn read_import_path(path: impl AsRef<Path>) -> anyhow::Result<ImportBatch> {
    let path = path.as_ref();
    if path.is_file() {
        let bytes = fs::read(path)?;
        let games = parse_games(&bytes)?;
        return Ok(ImportBatch {
            games,
            failed_files: Vec::new(),
        });
    }
    anyhow::ensure!(
        path.is_dir(),
        "{} is neither a file nor a directory",
        path.display()
    );

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("json"))
        .collect();
    files.sort();

    let mut batch = ImportBatch::default();
    for file in files {
        match fs::read(&file)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| parse_games(&bytes).map_err(anyhow::Error::from))
        {
            Ok(games) => batch.games.extend(games),
            Err(err) => {
                warn!("Skipping {}: {err}", file.display());
                batch.failed_files.push(file);
            }
        }
    }
    info!(
        "Read {} game(s) from {} ({} file(s) failed)",
        batch.games.len(),
        path.display(),
        batch.failed_files.len()
    );
    Ok(batch)
}

/// Pretty-printed JSON array of games.
pub fn export_games(games: &[Game]) -> Result<Vec<u8>, DecodeError> {
    serde_json::to_vec_pretty(games).map_err(|err| DecodeError::new("games", err))
}

/// Write an export next to other shared files and return its path.
pub fn write_export(
    dir: impl AsRef<Path>,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, PersistenceError> {
    let path = dir.as_ref().join(file_name);
    write_atomic(&path, bytes).map_err(|source| PersistenceError::Io {
        key: path.display().to_string(),
        source,
    })?;
    info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
