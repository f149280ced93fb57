use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use crate::Result;

const PREFIX: &str = "enr_";
const EXTENSION: &str = "xlsx";

/// A cached workbook.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    pub end_year: u16,
    pub path: PathBuf,
    pub size_bytes: u64,
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

/// Raw workbooks stored on disk, one file per end year.
#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, end_year: u16) -> PathBuf {
        self.dir.join(format!("{PREFIX}{end_year}.{EXTENSION}"))
    }

    /// The cached workbook for `end_year`, if any.
    pub fn get(&self, end_year: u16) -> Result<Option<Vec<u8>>> {
        match fs::read(self.path_for(end_year)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn put(&self, end_year: u16, bytes: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Write then rename so a crash never leaves a truncated workbook.
        let path = self.path_for(end_year);
        let tmp = path.with_extension("part");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Removes one year, or every cached year when `end_year` is `None`.
    /// Returns the number of files removed.
    pub fn clear(&self, end_year: Option<u16>) -> Result<usize> {
        let targets = match end_year {
            Some(year) => vec![self.path_for(year)],
            None => self.entries()?.into_iter().map(|e| e.path).collect(),
        };
        let mut removed = 0;
        for path in targets {
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        log::info!("removed {removed} cached file(s) from {}", self.dir.display());
        Ok(removed)
    }

    /// Every cached year, ascending.
    pub fn status(&self) -> Result<Vec<CacheEntry>> {
        self.entries()
    }

    fn entries(&self) -> Result<Vec<CacheEntry>> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(end_year) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_prefix(PREFIX))
                .and_then(|s| s.parse::<u16>().ok())
            else {
                continue;
            };
            let metadata = entry.metadata()?;
            entries.push(CacheEntry {
                end_year,
                path,
                size_bytes: metadata.len(),
                modified: metadata.modified().ok(),
            });
        }
        entries.sort_by_key(|e| e.end_year);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::new(tmp.path().join("absent"));
        assert_eq!(cache.get(2024).unwrap(), None);
        assert!(cache.status().unwrap().is_empty());
        assert_eq!(cache.clear(None).unwrap(), 0);
    }

    #[test]
    fn put_get_status_clear() {
        let tmp = TempDir::new().unwrap();
        let cache = Cache::new(tmp.path().join("nested"));
        cache.put(2024, b"abc").unwrap();
        cache.put(2019, b"abcdef").unwrap();
        fs::write(tmp.path().join("nested").join("notes.txt"), b"x").unwrap();

        assert_eq!(cache.get(2024).unwrap().as_deref(), Some(&b"abc"[..]));

        let status = cache.status().unwrap();
        let years: Vec<_> = status.iter().map(|e| e.end_year).collect();
        assert_eq!(years, vec![2019, 2024]);
        assert_eq!(status[0].size_bytes, 6);

        assert_eq!(cache.clear(Some(2019)).unwrap(), 1);
        assert_eq!(cache.clear(Some(2019)).unwrap(), 0);
        assert_eq!(cache.clear(None).unwrap(), 1);
        assert!(cache.status().unwrap().is_empty());
        assert!(tmp.path().join("nested").join("notes.txt").exists());
    }
}
