//! File-backed quota document store

use crate::lock::LockTable;
use gridquota_common::config::StorageConfig;
use gridquota_common::{Error, ListMode, Result, Revision, UserId};
use gridquota_tree::{Mutation, MutationOutcome, QuotaDocument, QuotaView, codec, list_sections};
use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use xxhash_rust::xxh64::xxh64;

/// A document together with the revision it was loaded at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDocument {
    pub document: QuotaDocument,
    pub revision: Revision,
}

/// Result of a locked load-mutate-save cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    /// What the mutation did
    pub outcome: MutationOutcome,
    /// The document after the mutation
    pub document: QuotaDocument,
    /// Revision now on disk
    pub revision: Revision,
}

/// Stores one quota document per user under a root directory
pub struct DocumentStore {
    root: PathBuf,
    extension: String,
    locks: LockTable,
}

impl DocumentStore {
    /// Create a store rooted at `root` using the `xml` extension
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: "xml".to_string(),
            locks: LockTable::new(),
        }
    }

    /// Create a store from the storage section of the configuration
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            extension: config.extension.clone(),
            locks: LockTable::new(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the document owned by `user`
    #[must_use]
    pub fn path_for(&self, user: &UserId) -> PathBuf {
        self.root.join(format!("{}.{}", user, self.extension))
    }

    #[must_use]
    pub fn exists(&self, user: &UserId) -> bool {
        self.path_for(user).is_file()
    }

    /// Load and parse `user`'s document.
    ///
    /// Fails with `DocumentNotFound` when the user has no document.
    pub fn load(&self, user: &UserId) -> Result<LoadedDocument> {
        let path = self.path_for(user);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(Error::DocumentNotFound(user.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let document = codec::parse_bytes(&bytes).inspect_err(|e| {
            if e.is_corrupt_document() {
                warn!(user = %user, path = %path.display(), error = %e, "stored quota document is unusable");
            }
        })?;
        let revision = revision_of(&bytes);
        debug!(user = %user, %revision, hosts = document.host_count(), "loaded quota document");
        Ok(LoadedDocument { document, revision })
    }

    /// Serialize and write `user`'s document, replacing the previous one.
    ///
    /// When `expected` is given the write only happens if the document on
    /// disk is still at that revision; otherwise `Conflict` is returned.
    pub fn save(
        &self,
        user: &UserId,
        document: &QuotaDocument,
        expected: Option<Revision>,
    ) -> Result<Revision> {
        let lock = self.locks.handle(user);
        let _guard = lock.lock();
        self.save_locked(user, document, expected)
    }

    /// Run `mutation` against `user`'s document under the user's lock.
    ///
    /// The document is only written back when the mutation changed it.
    pub fn apply(&self, user: &UserId, mutation: &Mutation) -> Result<Applied> {
        let lock = self.locks.handle(user);
        let _guard = lock.lock();

        let LoadedDocument {
            mut document,
            revision,
        } = self.load(user)?;
        let outcome = mutation.apply(&mut document)?;
        debug!(
            user = %user,
            operation = mutation.name(),
            section = %mutation.path(),
            ?outcome,
            "applied mutation"
        );

        let revision = if outcome.is_changed() {
            self.save_locked(user, &document, Some(revision))?
        } else {
            revision
        };
        Ok(Applied {
            outcome,
            document,
            revision,
        })
    }

    /// Load `user`'s document and project it for display
    pub fn list(&self, user: &UserId, mode: ListMode) -> Result<QuotaView> {
        let loaded = self.load(user)?;
        Ok(list_sections(&loaded.document, mode))
    }

    /// Revision currently on disk for `user`, `Revision::ABSENT` if none
    pub fn current_revision(&self, user: &UserId) -> Result<Revision> {
        match std::fs::read(self.path_for(user)) {
            Ok(bytes) => Ok(revision_of(&bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Revision::ABSENT),
            Err(e) => Err(e.into()),
        }
    }

    fn save_locked(
        &self,
        user: &UserId,
        document: &QuotaDocument,
        expected: Option<Revision>,
    ) -> Result<Revision> {
        if let Some(expected) = expected {
            let actual = self.current_revision(user)?;
            if actual != expected {
                warn!(user = %user, %expected, %actual, "quota document changed since load");
                return Err(Error::Conflict {
                    user: user.clone(),
                    expected,
                    actual,
                });
            }
        }

        let text = codec::serialize(document)?;
        let path = self.path_for(user);
        write_atomic(&path, text.as_bytes())?;

        let revision = revision_of(text.as_bytes());
        info!(
            user = %user,
            %revision,
            bytes = text.len(),
            path = %path.display(),
            "saved quota document"
        );
        Ok(revision)
    }
}

fn revision_of(bytes: &[u8]) -> Revision {
    Revision::from_u64(xxh64(bytes, 0))
}

/// Write to a sibling temporary file, sync it, then rename over `path`
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut temp_name = path.as_os_str().to_os_string();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}
