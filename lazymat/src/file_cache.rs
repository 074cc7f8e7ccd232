//! Named-file storage behind a small trait
//!
//! A [`FileCache`] stores files under slash-separated relative names. Reads
//! hand out a guard holding a local path for the duration of the read.
//! Writes go to a temporary sibling that only replaces the target when the
//! guard is committed, so an abandoned write leaves nothing behind.
//! [`LocalCache`] keeps everything under a directory on the local disk.

use crate::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

/// Storage for named files
pub trait FileCache: fmt::Display + Send + Sync {
    fn file_exists(&self, name: &str) -> Result<bool>;

    /// Local path of an existing file, valid while the guard lives
    fn open_read(&self, name: &str) -> Result<ReadGuard>;

    /// Temporary local path that becomes `name` on [`WriteGuard::commit`]
    fn open_write(&self, name: &str) -> Result<WriteGuard>;

    fn remove(&self, name: &str) -> Result<()>;

    /// Remove every file in the cache
    fn rmtree(&self) -> Result<()>;

    /// Names of stored files under `prefix`, produced lazily
    fn walk(&self, prefix: Option<&str>) -> Result<Walk>;

    fn getmtime(&self, name: &str) -> Result<SystemTime>;
}

/// Read access to one cached file
#[derive(Debug)]
pub struct ReadGuard {
    path: PathBuf,
}

impl ReadGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRef<Path> for ReadGuard {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Pending write to one cached file
#[derive(Debug)]
pub struct WriteGuard {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl WriteGuard {
    /// Pending write that replaces `target` on commit
    pub(crate) fn for_path(target: impl Into<PathBuf>) -> Self {
        let target = target.into();
        let mut temp = target.clone().into_os_string();
        temp.push(TEMP_SUFFIX);
        Self {
            temp: PathBuf::from(temp),
            target,
            committed: false,
        }
    }

    /// Where the caller writes the new content
    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Move the written content into place
    pub fn commit(mut self) -> Result<()> {
        if !self.temp.exists() {
            return Err(Error::inconsistent(format!(
                "nothing was written to '{}'",
                self.temp.display()
            )));
        }
        fs::rename(&self.temp, &self.target)?;
        self.committed = true;
        tracing::debug!(path = %self.target.display(), "committed cache write");
        Ok(())
    }
}

impl AsRef<Path> for WriteGuard {
    fn as_ref(&self) -> &Path {
        &self.temp
    }
}

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if !self.committed && self.temp.exists() {
            tracing::debug!(path = %self.temp.display(), "discarding uncommitted write");
            let _ = fs::remove_file(&self.temp);
        }
    }
}

/// Lazy depth-first listing of stored files
pub struct Walk {
    root: PathBuf,
    pending: Vec<PathBuf>,
    current: Option<fs::ReadDir>,
}

impl Walk {
    fn new(root: PathBuf, start: PathBuf) -> Self {
        Self {
            root,
            pending: vec![start],
            current: None,
        }
    }

    fn relative_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("/"))
    }
}

impl Iterator for Walk {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current.is_none() {
                let dir = self.pending.pop()?;
                match fs::read_dir(&dir) {
                    Ok(entries) => self.current = Some(entries),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => return Some(Err(err.into())),
                }
            }
            let entry = match self.current.as_mut()?.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) => return Some(Err(err.into())),
                None => {
                    self.current = None;
                    continue;
                }
            };
            let path = entry.path();
            match entry.file_type() {
                Ok(kind) if kind.is_dir() => self.pending.push(path),
                Ok(_) if is_temp(&path) => {}
                Ok(_) => {
                    return Some(self.relative_name(&path).ok_or_else(|| Error::InvalidPath {
                        path: path.display().to_string(),
                    }))
                }
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

const TEMP_SUFFIX: &str = ".temp";

fn is_temp(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(TEMP_SUFFIX))
}

/// Files kept under a directory on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCache {
    root: PathBuf,
}

impl LocalCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Cache rooted at the subdirectory `name`
    pub fn join(&self, name: &str) -> Result<Self> {
        Ok(Self::new(self.resolve(name)?))
    }

    /// Local path for `name`, refusing anything that would escape the root
    fn resolve(&self, name: &str) -> Result<PathBuf> {
        let invalid = || Error::InvalidPath {
            path: name.to_string(),
        };
        if name.is_empty() || name.contains('\\') {
            return Err(invalid());
        }
        let mut path = self.root.clone();
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return Err(invalid()),
            }
        }
        if path == self.root {
            return Err(invalid());
        }
        Ok(path)
    }
}

impl fmt::Display for LocalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalCache('{}')", self.root.display())
    }
}

impl FileCache for LocalCache {
    fn file_exists(&self, name: &str) -> Result<bool> {
        Ok(self.resolve(name)?.is_file())
    }

    fn open_read(&self, name: &str) -> Result<ReadGuard> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(Error::LabelNotFound {
                label: name.to_string(),
            });
        }
        Ok(ReadGuard { path })
    }

    fn open_write(&self, name: &str) -> Result<WriteGuard> {
        let target = self.resolve(name)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(WriteGuard::for_path(target))
    }

    fn remove(&self, name: &str) -> Result<()> {
        fs::remove_file(self.resolve(name)?)?;
        Ok(())
    }

    fn rmtree(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn walk(&self, prefix: Option<&str>) -> Result<Walk> {
        let start = match prefix {
            Some(prefix) => self.resolve(prefix)?,
            None => self.root.clone(),
        };
        Ok(Walk::new(self.root.clone(), start))
    }

    fn getmtime(&self, name: &str) -> Result<SystemTime> {
        Ok(fs::metadata(self.resolve(name)?)?.modified()?)
    }
}
