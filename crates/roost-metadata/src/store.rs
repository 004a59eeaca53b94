//! Filesystem-backed per-client namespace resolver
//!
//! Maps a client identity and a logical metadata path onto the backing
//! store at `<base>/<client>/<logical>` and returns either file content
//! or a directory listing. The tree is read-only from this service's
//! perspective; provisioning it is someone else's job.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::warn;

use crate::error::{MetadataError, Result};

/// Read-only view over the per-client metadata tree.
///
/// Client identities come from the network layer and are not run through
/// the request-path whitelist, so every physical path is confined to the
/// base directory here: any component that is not a plain name (`..`, a
/// root, a drive prefix) refuses the lookup outright.
#[derive(Debug, Clone)]
pub struct FileStore {
    base: PathBuf,
}

/// What a successful [`FileStore::open`] found at the path.
#[derive(Debug)]
pub enum Content {
    /// A regular file to stream as the response body
    File(FileContent),
    /// A directory; entries in storage order, not sorted
    Listing(Vec<DirEntry>),
}

/// One directory entry from a [`Content::Listing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Entry name, no trailing separator
    pub name: String,
    /// Whether the entry is itself a directory
    pub is_dir: bool,
}

/// An opened file ready to serve.
///
/// Transports that can serve a file on disk natively (byte ranges,
/// conditional requests, MIME detection) should prefer [`hint_path`];
/// [`into_reader`] is the generic byte-copy fallback.
///
/// [`hint_path`]: FileContent::hint_path
/// [`into_reader`]: FileContent::into_reader
#[derive(Debug)]
pub struct FileContent {
    file: fs::File,
    len: u64,
    path: PathBuf,
}

impl FileContent {
    /// Size of the file in bytes at open time.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the file was empty at open time.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Native path of the opened file, if the backing store can name one.
    pub fn hint_path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    /// Consume into the underlying reader for a plain byte-copy response.
    pub fn into_reader(self) -> fs::File {
        self.file
    }
}

impl FileStore {
    /// Create a store rooted at `base`.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Root of the backing tree.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Join `client` and `logical` under the base directory, refusing any
    /// component that would step outside it.
    fn physical(&self, client: &str, logical: &str) -> Result<PathBuf> {
        let mut full = self.base.clone();
        let components = Path::new(client)
            .components()
            .chain(Path::new(logical).components());
        for component in components {
            match component {
                Component::Normal(segment) => full.push(segment),
                Component::CurDir => {}
                _ => {
                    warn!("refusing metadata path outside base dir: {}/{}", client, logical);
                    return Err(MetadataError::InvalidPath(format!("{}/{}", client, logical)));
                }
            }
        }
        Ok(full)
    }

    /// Open the entry at `<base>/<client>/<logical>`.
    ///
    /// Directories are enumerated in storage order until exhausted or the
    /// first read error; files are returned as [`FileContent`]. Every
    /// failure to reach the entry surfaces as [`MetadataError::NotFound`]
    /// with the cause logged here.
    pub async fn open(&self, client: &str, logical: &str) -> Result<Content> {
        let path = self.physical(client, logical)?;

        let meta = match fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(source) => {
                warn!("error opening metadata path {}: {}", path.display(), source);
                return Err(MetadataError::NotFound {
                    path: path.display().to_string(),
                    source,
                });
            }
        };

        if meta.is_dir() {
            let mut reader = match fs::read_dir(&path).await {
                Ok(reader) => reader,
                Err(source) => {
                    warn!("error reading metadata dir {}: {}", path.display(), source);
                    return Err(MetadataError::NotFound {
                        path: path.display().to_string(),
                        source,
                    });
                }
            };

            let mut entries = Vec::new();
            // Stop at the first read error and serve what we have, the
            // same as a paginated read that hits a bad page
            while let Ok(Some(entry)) = reader.next_entry().await {
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry
                    .file_type()
                    .await
                    .map(|file_type| file_type.is_dir())
                    .unwrap_or(false);
                entries.push(DirEntry { name, is_dir });
            }
            return Ok(Content::Listing(entries));
        }

        match fs::File::open(&path).await {
            Ok(file) => Ok(Content::File(FileContent {
                file,
                len: meta.len(),
                path,
            })),
            Err(source) => {
                warn!("error opening metadata file {}: {}", path.display(), source);
                Err(MetadataError::NotFound {
                    path: path.display().to_string(),
                    source,
                })
            }
        }
    }

    /// List all entries of the directory at `<base>/<client>/<logical>`,
    /// directory names suffixed with `/`, sorted lexicographically
    /// ascending.
    ///
    /// This is the one place ordering is guaranteed; public-keys index
    /// addressing depends on it.
    pub async fn list(&self, client: &str, logical: &str) -> Result<Vec<String>> {
        let path = self.physical(client, logical)?;

        let mut reader = fs::read_dir(&path)
            .await
            .map_err(|source| not_found(&path, source))?;
        let mut names = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|source| not_found(&path, source))?
        {
            let mut name = entry.file_name().to_string_lossy().into_owned();
            let is_dir = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            if is_dir {
                name.push('/');
            }
            names.push(name);
        }

        // Storage order should already be sorted on most filesystems, but
        // the index contract requires it
        names.sort();
        Ok(names)
    }
}

fn not_found(path: &Path, source: std::io::Error) -> MetadataError {
    warn!("error listing metadata dir {}: {}", path.display(), source);
    MetadataError::NotFound {
        path: path.display().to_string(),
        source,
    }
}
