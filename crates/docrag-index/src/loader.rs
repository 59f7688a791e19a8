//! Document sources: where ingestion finds files and how it reads them.

use std::path::{Path, PathBuf};

use docrag_memory::BoxFuture;

use crate::error::{IndexError, Result};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

pub const DEFAULT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// A file yielded by a [`DocumentSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path under the source root, `/`-separated. Used as the document `source`.
    pub relative_path: String,
}

impl SourceFile {
    /// Final path component of the relative path.
    #[must_use]
    pub fn title(&self) -> &str {
        self.relative_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.relative_path)
    }
}

pub trait DocumentSource: Send + Sync {
    /// Files to ingest, sorted by relative path.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be enumerated.
    fn files(&self) -> Result<Vec<SourceFile>>;

    fn read<'a>(&'a self, file: &'a SourceFile) -> BoxFuture<'a, Result<String>>;
}

/// Recursive directory walk keeping files with a recognized text extension.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extensions: Vec<String>,
    max_file_size: u64,
}

impl DirectorySource {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| (*e).to_owned()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Extensions are matched case-insensitively, without the leading dot.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_recognized(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
    }
}

impl DocumentSource for DirectorySource {
    fn files(&self) -> Result<Vec<SourceFile>> {
        if !self.root.is_dir() {
            return Err(IndexError::SourceNotFound(self.root.clone()));
        }

        let mut files = Vec::new();
        for entry in ignore::WalkBuilder::new(&self.root)
            .standard_filters(false)
            .build()
        {
            let entry = entry?;
            if !entry.file_type().is_some_and(|ft| ft.is_file()) || !self.is_recognized(entry.path())
            {
                continue;
            }
            let relative_path = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.push(SourceFile {
                path: entry.into_path(),
                relative_path,
            });
        }

        files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        Ok(files)
    }

    fn read<'a>(&'a self, file: &'a SourceFile) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            let meta = tokio::fs::metadata(&file.path).await?;
            if meta.len() > self.max_file_size {
                return Err(IndexError::FileTooLarge {
                    path: file.path.clone(),
                    size: meta.len(),
                    limit: self.max_file_size,
                });
            }
            let bytes = tokio::fs::read(&file.path).await?;
            Ok(match String::from_utf8(bytes) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(
                        path = %file.relative_path,
                        "file is not valid UTF-8, invalid bytes replaced"
                    );
                    String::from_utf8_lossy(e.as_bytes()).into_owned()
                }
            })
        })
    }
}
