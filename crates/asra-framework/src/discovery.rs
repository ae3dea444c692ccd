//! Handler file discovery.
//!
//! Each [`Category`] has one directory. Discovery lists the files directly
//! inside it (no recursion) whose name matches the handler file glob.

use std::fs::{self, ReadDir};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use asra_core::Category;
use globset::{Glob, GlobMatcher};
use tracing::{debug, trace};

use crate::error::{DiscoveryError, DiscoveryResult};

/// Default glob for handler definition files.
pub const DEFAULT_HANDLER_PATTERN: &str = "*.toml";

/// Locates handler definition files per category.
#[derive(Debug, Clone)]
pub struct EventDiscovery {
    client_dir: PathBuf,
    transport_dir: PathBuf,
    pattern: String,
    matcher: GlobMatcher,
}

impl EventDiscovery {
    /// Creates a discovery over the two category directories.
    ///
    /// Fails if `pattern` is not a valid glob.
    pub fn new(
        client_dir: impl Into<PathBuf>,
        transport_dir: impl Into<PathBuf>,
        pattern: &str,
    ) -> DiscoveryResult<Self> {
        let matcher = Glob::new(pattern)
            .map_err(|source| DiscoveryError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?
            .compile_matcher();

        Ok(Self {
            client_dir: client_dir.into(),
            transport_dir: transport_dir.into(),
            pattern: pattern.to_string(),
            matcher,
        })
    }

    /// Directory scanned for `category`.
    pub fn directory(&self, category: Category) -> &Path {
        match category {
            Category::ClientEvent => &self.client_dir,
            Category::TransportEvent => &self.transport_dir,
        }
    }

    /// The handler file glob.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Starts a discovery pass for `category`.
    ///
    /// The directory is opened eagerly so a missing or unreadable directory
    /// fails here; entries are then produced lazily by the returned iterator.
    pub fn discover(&self, category: Category) -> DiscoveryResult<DiscoveredFiles> {
        let dir = self.directory(category).to_path_buf();
        let entries = fs::read_dir(&dir).map_err(|source| match source.kind() {
            ErrorKind::NotFound => DiscoveryError::MissingDirectory {
                category,
                path: dir.clone(),
            },
            _ => DiscoveryError::Unreadable {
                category,
                path: dir.clone(),
                source,
            },
        })?;

        debug!(%category, dir = %dir.display(), pattern = %self.pattern, "Discovering handler files");

        Ok(DiscoveredFiles {
            category,
            dir,
            entries,
            matcher: self.matcher.clone(),
        })
    }
}

/// One pass over a category directory.
///
/// Finite and not restartable: call [`EventDiscovery::discover`] again for a
/// fresh pass. No ordering is guaranteed.
#[derive(Debug)]
pub struct DiscoveredFiles {
    category: Category,
    dir: PathBuf,
    entries: ReadDir,
    matcher: GlobMatcher,
}

impl DiscoveredFiles {
    /// Category of this pass.
    pub fn category(&self) -> Category {
        self.category
    }

    /// Directory being scanned.
    pub fn directory(&self) -> &Path {
        &self.dir
    }
}

impl Iterator for DiscoveredFiles {
    type Item = DiscoveryResult<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(source) => {
                    return Some(Err(DiscoveryError::Unreadable {
                        category: self.category,
                        path: self.dir.clone(),
                        source,
                    }));
                }
            };

            let path = entry.path();
            if !path.is_file() || !self.matcher.is_match(entry.file_name()) {
                trace!(path = %path.display(), "Skipping non-handler entry");
                continue;
            }
            return Some(Ok(path));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn discovery(root: &Path) -> EventDiscovery {
        EventDiscovery::new(
            root.join("client"),
            root.join("transport"),
            DEFAULT_HANDLER_PATTERN,
        )
        .unwrap()
    }

    #[test]
    fn test_discover_matches_pattern_only() {
        let root = tempfile::tempdir().unwrap();
        let client = root.path().join("client");
        fs::create_dir_all(client.join("nested")).unwrap();
        fs::write(client.join("ready.toml"), "handler = \"x\"").unwrap();
        fs::write(client.join("guild.toml"), "handler = \"x\"").unwrap();
        fs::write(client.join("notes.md"), "# notes").unwrap();
        fs::write(client.join("nested").join("deep.toml"), "").unwrap();

        let found: HashSet<PathBuf> = discovery(root.path())
            .discover(Category::ClientEvent)
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        let expected: HashSet<PathBuf> = [client.join("ready.toml"), client.join("guild.toml")]
            .into_iter()
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let result = discovery(root.path()).discover(Category::TransportEvent);
        assert!(matches!(
            result,
            Err(DiscoveryError::MissingDirectory {
                category: Category::TransportEvent,
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = EventDiscovery::new("a", "b", "*.{toml");
        assert!(matches!(
            result,
            Err(DiscoveryError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_directory_per_category() {
        let discovery = EventDiscovery::new("events/client", "events/transport", "*.toml").unwrap();
        assert_eq!(
            discovery.directory(Category::ClientEvent),
            Path::new("events/client")
        );
        assert_eq!(
            discovery.directory(Category::TransportEvent),
            Path::new("events/transport")
        );
    }
}
