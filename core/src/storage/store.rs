use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use super::backend::{LocalStorage, StorageBackend};
use super::config::StoreConfig;
use super::tree::Tree;
use super::{Entry, EntryId, Error, Result};

/// Owner of the virtual folder tree and its persisted form.
///
/// Every mutating operation loads the structure document, validates the request,
/// mutates the tree in memory and writes the whole document back. Operations on one
/// store are serialized, so callers sharing it (usually through an `Arc`) never
/// overwrite each other's changes.
#[derive(Debug)]
pub struct TreeStore<B: StorageBackend = LocalStorage> {
    config: StoreConfig,
    backend: B,
    lock: Mutex<()>,
}

/// A file to bring into the store with [`TreeStore::import_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSource {
    pub path: PathBuf,
    /// Logical name shown in the tree; its extension is kept on the stored copy.
    pub name: String,
    pub mime_type: String,
}

impl ImportSource {
    /// Uses the file name of `path` as the logical name.
    pub fn from_path(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        ImportSource { path, name, mime_type: mime_type.into() }
    }
}

/// Outcome of a bulk import.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<Entry>,
    /// Names of the sources that could not be imported, with the reason.
    pub failed: Vec<(String, Error)>,
}

impl TreeStore<LocalStorage> {
    /// Creates a store backed by the local filesystem.
    pub fn new(config: StoreConfig) -> Self {
        TreeStore::with_backend(config, LocalStorage)
    }
}

impl<B: StorageBackend> TreeStore<B> {
    pub fn with_backend(config: StoreConfig, backend: B) -> Self {
        TreeStore { config, backend, lock: Mutex::new(()) }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Prepares the storage root and writes a root-only structure document if none exists.
    ///
    /// Safe to call at every start; an existing document is left untouched.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.initialize_unlocked().await
    }

    /// Reads the persisted tree.
    ///
    /// A missing document is created first. A document that cannot be read or parsed
    /// is never replaced: after one retry the load fails. Entries that cannot be reached
    /// from the root (and child links to missing entries) are dropped with a warning;
    /// the next mutation writes the cleaned tree back.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStructure`] if the document stays unreadable, and
    /// [`Error::InvalidStructure`] if the root is missing or malformed.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Tree> {
        let _guard = self.lock.lock().await;
        self.load_unlocked().await
    }

    /// Overwrites the persisted document with `tree`.
    #[instrument(skip(self, tree))]
    pub async fn save(&self, tree: &Tree) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.save_unlocked(tree).await
    }

    /// Creates a folder named `name` inside `parent_id`.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ParentNotFound`] or [`Error::NotAFolder`] for a bad parent and with
    /// [`Error::DuplicateName`] if any entry in the parent already has that exact name.
    #[instrument(skip(self))]
    pub async fn create_folder(&self, name: &str, parent_id: &str, color: Option<&str>) -> Result<Entry> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        check_parent_folder(&tree, parent_id)?;
        if tree.has_child_named(parent_id, name, None) {
            warn!("An item named '{}' already exists in {}", name, parent_id);
            return Err(Error::DuplicateName { parent: parent_id.into(), name: name.to_string() });
        }

        let id = EntryId::generate();
        let locator = self.config.files_dir.join(id.as_str());
        self.backend.create_dir_all(&locator).await.inspect_err(|e| {
            error!("Failed to create directory {}: {}", locator.display(), e);
        })?;

        let entry = Entry::folder(id, name, locator, parent_id.into(), color.map(str::to_string));
        tree.insert(entry.clone());
        self.save_unlocked(&tree).await?;

        debug!("Created folder {}", entry.id());
        Ok(entry)
    }

    /// Copies the file at `source` into storage and records it under `parent_id`.
    ///
    /// The stored copy is named after the generated id (keeping the extension of
    /// `file_name`), so equal names never collide on disk. The recorded size is read
    /// from the copy. Names are not checked for duplicates here: two files in one folder
    /// may share a name.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::ParentNotFound`] or [`Error::NotAFolder`] for a bad parent and
    /// with [`Error::Io`] if the copy fails. If the copy succeeds but the document cannot
    /// be written, the copied file stays on disk without an entry.
    #[instrument(skip(self, source), fields(source = %source.display()))]
    pub async fn import_file(
        &self,
        source: &Path,
        file_name: &str,
        mime_type: &str,
        parent_id: &str,
    ) -> Result<Entry> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        check_parent_folder(&tree, parent_id)?;

        let id = EntryId::generate();
        let target = match extension_of(file_name) {
            "" => self.config.files_dir.join(id.as_str()),
            ext => self.config.files_dir.join(format!("{}.{}", id, ext)),
        };

        self.backend.copy(source, &target).await.inspect_err(|e| {
            error!("Failed to copy {} to {}: {}", source.display(), target.display(), e);
        })?;
        let size = self.backend.file_size(&target).await?.ok_or_else(|| {
            error!("Copied file is missing: {}", target.display());
            Error::Io(std::io::Error::new(ErrorKind::NotFound, "copied file is missing"))
        })?;

        let entry = Entry::file(id, file_name, target, mime_type, size, parent_id.into());
        tree.insert(entry.clone());
        if let Err(e) = self.save_unlocked(&tree).await {
            warn!("Imported file left without an entry: {}", entry.locator().display());
            return Err(e);
        }

        debug!("Imported {} as {}", file_name, entry.id());
        Ok(entry)
    }

    /// Imports several files one after another into `parent_id`.
    ///
    /// `progress` is called before each file with the number of files handled so far and
    /// the total. A failing file is recorded in the report and does not stop the rest.
    /// After at least one successful import the parent's aggregate size is refreshed;
    /// if only that refresh fails, it is logged and the report is still returned.
    #[instrument(skip(self, sources, progress), fields(count = sources.len()))]
    pub async fn import_files(
        &self,
        sources: &[ImportSource],
        parent_id: &str,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<ImportReport> {
        let mut report = ImportReport::default();
        let total = sources.len();

        for (done, source) in sources.iter().enumerate() {
            progress(done, total);
            match self.import_file(&source.path, &source.name, &source.mime_type, parent_id).await {
                Ok(entry) => report.imported.push(entry),
                Err(e) => {
                    warn!("Skipping {}: {}", source.name, e);
                    report.failed.push((source.name.clone(), e));
                }
            }
        }

        if !report.imported.is_empty() {
            if let Err(e) = self.update_folder_size(parent_id).await {
                warn!("Imported files kept, but refreshing the size of {} failed: {}", parent_id, e);
            }
        }
        info!("Imported {} of {} files", report.imported.len(), total);
        Ok(report)
    }

    /// Changes the display name of an entry. The stored bytes are not renamed.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotFound`] for an unknown id and with [`Error::DuplicateName`]
    /// if a sibling already uses `new_name`.
    #[instrument(skip(self))]
    pub async fn rename_item(&self, item_id: &str, new_name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        let entry = find(&tree, item_id)?;
        let parent_id = entry.parent_id().clone();
        if !parent_id.is_empty() && tree.has_child_named(parent_id.as_str(), new_name, Some(item_id)) {
            warn!("An item named '{}' already exists in {}", new_name, parent_id);
            return Err(Error::DuplicateName { parent: parent_id, name: new_name.to_string() });
        }

        tree.rename(item_id, new_name);
        self.save_unlocked(&tree).await
    }

    /// Moves an entry (with everything below it) into another folder.
    ///
    /// Moving an entry to the folder it is already in does nothing.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] / [`Error::ParentNotFound`] if either id is unknown
    /// - [`Error::RootImmutable`] when moving the root
    /// - [`Error::NotAFolder`] if the target is a file
    /// - [`Error::CycleDetected`] if the target is the entry itself or lies below it
    /// - [`Error::DuplicateName`] if the target already holds an entry with the same name
    #[instrument(skip(self))]
    pub async fn move_item(&self, item_id: &str, new_parent_id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        let entry = find(&tree, item_id)?;
        if entry.id().is_root() {
            return Err(Error::RootImmutable);
        }
        check_parent_folder(&tree, new_parent_id)?;

        if entry.parent_id().as_str() == new_parent_id {
            debug!("Item is already in the target folder");
            return Ok(());
        }
        if tree.is_within(new_parent_id, item_id) {
            warn!("Refusing to move {} into its own subtree ({})", item_id, new_parent_id);
            return Err(Error::CycleDetected { item: item_id.into(), target: new_parent_id.into() });
        }
        let name = entry.name().to_string();
        if tree.has_child_named(new_parent_id, &name, None) {
            warn!("An item named '{}' already exists in {}", name, new_parent_id);
            return Err(Error::DuplicateName { parent: new_parent_id.into(), name });
        }

        tree.relink(item_id, new_parent_id);
        self.save_unlocked(&tree).await
    }

    /// Deletes an entry, and for a folder everything below it, from the tree and from disk.
    ///
    /// Stored files and directories are removed children first; the document is written once.
    /// If removing something on disk fails, the entries already removed stay removed, the
    /// document is written, and the error is returned.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotFound`] for an unknown id, [`Error::RootImmutable`] for the root,
    /// and [`Error::Io`] if a stored file or directory cannot be removed.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        let before = tree.len();
        let outcome = self.remove_subtree(&mut tree, item_id).await;
        if tree.len() != before {
            self.save_unlocked(&tree).await?;
        }
        outcome.map(|removed| debug!("Deleted {} entries", removed))
    }

    /// Deletes a selection of entries and refreshes the sizes of the folders they were in.
    ///
    /// Ids that fail (unknown, root, disk errors) are logged and skipped.
    /// Returns how many of the given ids were deleted.
    #[instrument(skip(self, item_ids), fields(count = item_ids.len()))]
    pub async fn delete_items<S: AsRef<str>>(&self, item_ids: &[S]) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        let mut parents = BTreeSet::new();
        let mut deleted = 0;
        for item_id in item_ids.iter().map(AsRef::as_ref) {
            let parent = tree.get(item_id).map(|entry| entry.parent_id().clone());
            match self.remove_subtree(&mut tree, item_id).await {
                Ok(_) => {
                    deleted += 1;
                    parents.extend(parent);
                }
                Err(e) => warn!("Could not delete {}: {}", item_id, e),
            }
        }

        for parent in &parents {
            if tree.contains(parent.as_str()) {
                tree.recompute_size(parent.as_str());
            }
        }
        self.save_unlocked(&tree).await?;

        info!("Deleted {} of {} items", deleted, item_ids.len());
        Ok(deleted)
    }

    /// Recomputes the aggregate size of a folder and of every folder below it.
    ///
    /// Sizes are not kept in sync automatically; call this after changes when sizes matter.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotFound`] for an unknown id and [`Error::NotAFolder`] for a file.
    #[instrument(skip(self))]
    pub async fn update_folder_size(&self, folder_id: &str) -> Result<u64> {
        let _guard = self.lock.lock().await;
        let mut tree = self.load_unlocked().await?;

        if !find(&tree, folder_id)?.is_folder() {
            return Err(Error::NotAFolder(folder_id.into()));
        }

        let total = tree.recompute_size(folder_id);
        self.save_unlocked(&tree).await?;
        Ok(total)
    }

    // --- Internal helpers (callers hold the lock) ---

    async fn initialize_unlocked(&self) -> Result<()> {
        if !self.backend.exists(&self.config.files_dir).await? {
            debug!("Creating storage root {}", self.config.files_dir.display());
            self.backend.create_dir_all(&self.config.files_dir).await?;
        }

        if !self.backend.exists(&self.config.metadata_path).await? {
            let root = Entry::root(&self.config.root_name, self.config.files_dir.clone());
            self.save_unlocked(&Tree::with_root(root)).await?;
            info!("Initialized structure document at {}", self.config.metadata_path.display());
        }
        Ok(())
    }

    async fn load_unlocked(&self) -> Result<Tree> {
        match self.read_tree().await {
            Ok(Some(tree)) => return Ok(tree),
            Ok(None) => warn!("Structure document missing, initializing a new one"),
            Err(e) => warn!("Failed to read structure document: {}", e),
        }

        self.initialize_unlocked().await?;

        match self.read_tree().await {
            Ok(Some(tree)) => Ok(tree),
            Err(e @ Error::InvalidStructure(_)) => Err(e),
            Ok(None) | Err(_) => {
                error!(
                    "Structure document is unreadable, refusing to reset it: {}",
                    self.config.metadata_path.display()
                );
                Err(Error::CorruptStructure(self.config.metadata_path.clone()))
            }
        }
    }

    async fn read_tree(&self) -> Result<Option<Tree>> {
        let path = &self.config.metadata_path;
        if !self.backend.exists(path).await? {
            return Ok(None);
        }
        let content = self.backend.read_to_string(path).await?;
        let mut tree: Tree = serde_json::from_str(&content)?;
        let dropped = tree.prune_orphans();
        if dropped > 0 {
            warn!("Pruned {} unreachable entries and links; the next write persists the cleanup", dropped);
        }
        tree.validate()?;
        Ok(Some(tree))
    }

    async fn save_unlocked(&self, tree: &Tree) -> Result<()> {
        let content = serde_json::to_string_pretty(tree)?;
        self.backend
            .write_string(&self.config.metadata_path, &content)
            .await
            .inspect_err(|e| error!("Failed to write structure document: {}", e))?;
        debug!("Structure document saved ({} entries)", tree.len());
        Ok(())
    }

    /// Removes `item_id` and its descendants, children first, from disk and from `tree`.
    /// Stops at the first disk failure; everything removed up to then stays removed.
    async fn remove_subtree(&self, tree: &mut Tree, item_id: &str) -> Result<usize> {
        let entry = find(tree, item_id)?;
        if entry.id().is_root() {
            warn!("Refusing to delete the root folder");
            return Err(Error::RootImmutable);
        }

        let order = tree.subtree_post_order(item_id);
        for id in &order {
            let Some(locator) = tree.get(id.as_str()).map(|entry| entry.locator().to_path_buf()) else {
                continue;
            };
            self.backend.remove(&locator).await.inspect_err(|e| {
                error!("Failed to delete {}: {}", locator.display(), e);
            })?;
            tree.remove(id.as_str());
        }
        Ok(order.len())
    }
}

fn find<'a>(tree: &'a Tree, id: &str) -> Result<&'a Entry> {
    tree.get(id).ok_or_else(|| {
        warn!("Item does not exist: {}", id);
        Error::NotFound(id.into())
    })
}

fn check_parent_folder(tree: &Tree, parent_id: &str) -> Result<()> {
    match tree.get(parent_id) {
        None => {
            warn!("Parent folder does not exist: {}", parent_id);
            Err(Error::ParentNotFound(parent_id.into()))
        }
        Some(parent) if !parent.is_folder() => Err(Error::NotAFolder(parent_id.into())),
        Some(_) => Ok(()),
    }
}

/// Text after the last `.` of a file name, or empty if there is none.
/// Anything containing a path separator is not an extension.
fn extension_of(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.contains(['/', '\\']) => ext,
        _ => "",
    }
}
