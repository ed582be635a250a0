use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use super::error::ElementError;
use super::provider::ElementProvider;
use super::tle::{catalog_number, parse_multi_tle};
use super::types::RawElements;

/// Serves element sets from `*.tle` / `*.txt` files in a folder. The folder
/// is rescanned on every fetch so replaced files are picked up.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    tle_dir: PathBuf,
}

impl DirectoryProvider {
    pub fn new(tle_dir: PathBuf) -> Self {
        Self { tle_dir }
    }
}

impl ElementProvider for DirectoryProvider {
    async fn fetch(&self, catalog_id: u32) -> Result<RawElements, ElementError> {
        let dir = self.tle_dir.clone();
        tokio::task::spawn_blocking(move || find_in_dir(&dir, catalog_id))
            .await
            .map_err(|e| ElementError::Io(format!("directory scan panicked: {}", e)))?
    }
}

fn find_in_dir(dir: &Path, catalog_id: u32) -> Result<RawElements, ElementError> {
    if !dir.is_dir() {
        return Err(ElementError::Io(format!(
            "TLE directory not found: {}",
            dir.display()
        )));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_tle_extension(path))
        .collect();
    files.sort();

    for path in files {
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("Failed to read TLE file {}: {}", path.display(), e);
                continue;
            }
        };

        let found = parse_multi_tle(&content)
            .into_iter()
            .find(|tle| catalog_number(&tle.line1) == Some(catalog_id));

        if let Some(tle) = found {
            let text = match tle.name {
                Some(name) => format!("{}\n{}\n{}\n", name, tle.line1, tle.line2),
                None => format!("{}\n{}\n", tle.line1, tle.line2),
            };
            return Ok(RawElements {
                text,
                retrieved_at: modified_at(&path).unwrap_or_else(Utc::now),
            });
        }
    }

    Err(ElementError::NotFound(catalog_id))
}

fn has_tle_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("tle") | Some("txt")
    )
}

fn modified_at(path: &Path) -> Option<DateTime<Utc>> {
    let modified = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}
