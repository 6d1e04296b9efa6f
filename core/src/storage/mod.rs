//! Virtual folder tree over a flat physical store.
//!
//! This module keeps a user-facing hierarchy of folders and files that is independent of
//! where the bytes actually live. The hierarchy is persisted as a single JSON structure
//! document; the bytes live in one flat storage directory.
//!
//! # Core Concepts
//!
//! *   **[`Entry`]:** Metadata for one folder or file: display name, MIME type (or
//!     `"folder"`), size, creation time, parent id and the physical locator of its bytes.
//!     Every entry gets an immutable [`EntryId`] at creation; the root folder always has
//!     the id [`ROOT_ID`] and no parent.
//! *   **[`Tree`]:** All entries keyed by id, each with the ordered ids of its children.
//!     Read operations ([`Tree::contents`], [`Tree::path_to`], [`Tree::get`]) work on a
//!     loaded tree and never touch the disk.
//! *   **[`TreeStore`]:** Owns the structure document and the storage directory. Every
//!     mutation loads the document, validates the request, updates the tree and writes
//!     the whole document back. Mutations on one store are serialized.
//! *   **[`StorageBackend`]:** The physical primitives (copy, remove, read, write) the store
//!     relies on. [`LocalStorage`] implements them over the local filesystem.
//!
//! # Physical Layout
//!
//! Imported files are copied to `<files_dir>/<id>.<ext>` and folders get a directory
//! `<files_dir>/<id>/`. Display names never reach the filesystem, so renaming and moving
//! only rewrite the structure document. Files are not stored inside their folder's
//! directory; deleting a folder removes each descendant's bytes individually.
//!
//! # Naming Rules
//!
//! Creating a folder, renaming and moving reject a name that an entry in the same folder
//! already has (exact, case-sensitive comparison). Importing a file does not check names.
//!
//! # Sizes
//!
//! A file's size is the byte length of its stored copy. A folder's size is only refreshed
//! by [`TreeStore::update_folder_size`] (and by the bulk operations), which recomputes the
//! whole subtree.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use filebox_core::storage::{SortOption, StoreConfig, TreeStore, ROOT_ID};
//! use tempfile::tempdir;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let temp_dir = tempdir()?;
//!     let store = TreeStore::new(StoreConfig::in_dir(temp_dir.path()));
//!     store.initialize().await?;
//!
//!     let docs = store.create_folder("Documents", ROOT_ID, None).await?;
//!     println!("Created folder with ID: {}", docs.id());
//!
//!     let tree = store.load().await?;
//!     for entry in tree.contents(ROOT_ID, SortOption::NameAsc) {
//!         println!("{} ({})", entry.name(), entry.kind());
//!     }
//!     Ok(())
//! }
//! ```

pub use self::backend::{LocalStorage, StorageBackend};
pub use self::config::{StoreConfig, DEFAULT_ROOT_NAME, FILES_DIR_NAME, STRUCTURE_FILENAME};
pub use self::entry::{Entry, EntryId, DEFAULT_MIME_TYPE, FOLDER_KIND, ROOT_ID};
pub use self::sort::{compare_names, sort_entries, SortOption, UnknownSortOption};
pub use self::store::{ImportReport, ImportSource, TreeStore};
pub use self::tree::Tree;

mod backend;
mod config;
mod entry;
mod sort;
mod store;
mod tree;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Item not found: {0}")]
    NotFound(EntryId),

    #[error("Parent folder not found: {0}")]
    ParentNotFound(EntryId),

    #[error("An item named '{name}' already exists in folder {parent}")]
    DuplicateName { parent: EntryId, name: String },

    #[error("Cannot move {item} into {target}: target is the item itself or one of its descendants")]
    CycleDetected { item: EntryId, target: EntryId },

    #[error("Not a folder: {0}")]
    NotAFolder(EntryId),

    #[error("The root folder cannot be moved or deleted")]
    RootImmutable,

    #[error("Structure document could not be read: {0}")]
    CorruptStructure(PathBuf),

    #[error("Structure document is inconsistent: {0}")]
    InvalidStructure(String),

    #[error("Metadata serialization/deserialization error")]
    Metadata(#[from] serde_json::Error),

    #[error("IO error")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
