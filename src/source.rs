//! Where interface declarations come from.

use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid interface glob {pattern}: {source}")]
    Glob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Identity and content of one interface source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

/// Supplies interface source files on demand.
#[async_trait]
pub trait InterfaceSource: Send + Sync {
    /// Current content of every candidate file.
    async fn files(&self) -> Result<Vec<SourceFile>, SourceError>;
}

/// Files under a directory whose relative paths match a set of globs.
pub struct DirectorySource {
    root: PathBuf,
    globs: GlobSet,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self, SourceError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|source| SourceError::Glob {
                pattern: pattern.clone(),
                source,
            })?;
            builder.add(glob);
        }
        let globs = builder.build().map_err(|source| SourceError::Glob {
            pattern: patterns.join(","),
            source,
        })?;

        Ok(Self {
            root: root.into(),
            globs,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn collect(&self, dir: PathBuf, out: &mut Vec<PathBuf>) -> Result<(), SourceError> {
        let mut pending = vec![dir];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|source| SourceError::Io {
                    path: dir.clone(),
                    source,
                })?;

            while let Some(entry) = entries.next_entry().await.map_err(|source| SourceError::Io {
                path: dir.clone(),
                source,
            })? {
                let path = entry.path();
                let file_type = entry.file_type().await.map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    if self.globs.is_match(relative) {
                        out.push(path);
                    }
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl InterfaceSource for DirectorySource {
    async fn files(&self) -> Result<Vec<SourceFile>, SourceError> {
        let mut paths = Vec::new();
        self.collect(self.root.clone(), &mut paths).await?;
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| SourceError::Io {
                    path: path.clone(),
                    source,
                })?;
            files.push(SourceFile { path, content });
        }

        Ok(files)
    }
}

/// In-memory sources keyed by a virtual path.
#[derive(Debug, Default)]
pub struct MemorySource {
    files: HashMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }
}

#[async_trait]
impl InterfaceSource for MemorySource {
    async fn files(&self) -> Result<Vec<SourceFile>, SourceError> {
        let mut files: Vec<_> = self
            .files
            .iter()
            .map(|(path, content)| SourceFile {
                path: path.clone(),
                content: content.clone(),
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_source_filters_by_glob() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("user.ts"), "interface User { id: number }").unwrap();
        std::fs::write(dir.path().join("nested/order.ts"), "interface Order { id: number }")
            .unwrap();
        std::fs::write(dir.path().join("notes.md"), "# not an interface").unwrap();

        let source = DirectorySource::new(dir.path(), &["**/*.ts".to_string()]).unwrap();
        let files = source.files().await.unwrap();

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.path.extension().unwrap() == "ts"));
        assert!(files.iter().any(|f| f.content.contains("Order")));
    }

    #[tokio::test]
    async fn test_missing_directory_is_error() {
        let source =
            DirectorySource::new("/definitely/not/here", &["**/*.ts".to_string()]).unwrap();
        assert!(matches!(source.files().await, Err(SourceError::Io { .. })));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(
            DirectorySource::new(".", &["[".to_string()]),
            Err(SourceError::Glob { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_source() {
        let source = MemorySource::new()
            .with_file("b.ts", "interface B {}")
            .with_file("a.ts", "interface A {}");
        let files = source.files().await.unwrap();
        assert_eq!(files[0].path, PathBuf::from("a.ts"));
        assert_eq!(files.len(), 2);
    }
}
