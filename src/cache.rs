//! Content-hash keyed cache of parsed interface files.
//!
//! Entries are keyed by path and invalidated only when the file's SHA-256
//! changes. The lock is never held while parsing; two requests racing on the
//! same miss both parse and the later write wins, which is harmless because
//! equal content parses to equal results.

use crate::descriptor::{parse_interfaces, Interface};
use crate::source::SourceFile;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Interfaces declared in one source file.
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub interfaces: HashMap<String, Arc<Interface>>,
}

impl ParsedFile {
    pub fn parse(content: &str) -> Self {
        let interfaces = parse_interfaces(content)
            .into_iter()
            .map(|interface| (interface.name.clone(), Arc::new(interface)))
            .collect();
        Self { interfaces }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.get(name).cloned()
    }
}

struct CacheEntry {
    hash: [u8; 32],
    parsed: Arc<ParsedFile>,
}

/// Shared parse cache.
#[derive(Default)]
pub struct InterfaceCache {
    entries: RwLock<HashMap<PathBuf, CacheEntry>>,
    parses: AtomicU64,
    hits: AtomicU64,
}

impl InterfaceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed form of `file`, parsing only if the content changed.
    pub async fn get_or_parse(&self, file: &SourceFile) -> Arc<ParsedFile> {
        let hash = content_hash(&file.content);

        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&file.path) {
                if entry.hash == hash {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return entry.parsed.clone();
                }
            }
        }

        debug!(path = %file.path.display(), "Parsing interface source");
        let parsed = Arc::new(ParsedFile::parse(&file.content));
        self.parses.fetch_add(1, Ordering::Relaxed);

        self.entries.write().await.insert(
            file.path.clone(),
            CacheEntry {
                hash,
                parsed: parsed.clone(),
            },
        );

        parsed
    }

    /// Number of parses performed.
    pub fn parse_count(&self) -> u64 {
        self.parses.load(Ordering::Relaxed)
    }

    /// Number of lookups served without parsing.
    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn content_hash(content: &str) -> [u8; 32] {
    Sha256::digest(content.as_bytes()).into()
}
