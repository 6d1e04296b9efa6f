use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Reserved id of the root folder.
pub const ROOT_ID: &str = "root";

/// Value stored in the `type` field of folder entries.
pub const FOLDER_KIND: &str = "folder";

/// MIME type recorded for imported files whose type is unknown.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Opaque identifier of an entry in the tree.
///
/// Generated ids are UUID v4 strings. The root folder uses the reserved id `"root"`,
/// and the root's parent is the empty id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Returns the id of the root folder.
    pub fn root() -> Self {
        EntryId(ROOT_ID.to_string())
    }

    /// Generates a fresh random id.
    pub fn generate() -> Self {
        EntryId(Uuid::new_v4().to_string())
    }

    pub(crate) fn empty() -> Self {
        EntryId(String::new())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_ID
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        EntryId(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        EntryId(value)
    }
}

// Lets the tree be queried with plain `&str` keys.
impl Borrow<str> for EntryId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single file or folder record in the virtual tree.
///
/// Field names on disk follow the structure document format: `uri` holds the
/// physical locator, `type` the MIME type (or `"folder"`), `dateAdded` the
/// creation time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub(crate) id: EntryId,
    pub(crate) name: String,
    #[serde(rename = "uri")]
    pub(crate) locator: PathBuf,
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) size: u64,
    pub(crate) date_added: i64,
    pub(crate) parent_id: EntryId,
    pub(crate) is_directory: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) color: Option<String>,
}

impl Entry {
    pub(crate) fn root(name: &str, locator: PathBuf) -> Self {
        Entry {
            id: EntryId::root(),
            name: name.to_string(),
            locator,
            kind: FOLDER_KIND.to_string(),
            size: 0,
            date_added: now_millis(),
            parent_id: EntryId::empty(),
            is_directory: true,
            color: None,
        }
    }

    pub(crate) fn folder(
        id: EntryId,
        name: &str,
        locator: PathBuf,
        parent_id: EntryId,
        color: Option<String>,
    ) -> Self {
        Entry {
            id,
            name: name.to_string(),
            locator,
            kind: FOLDER_KIND.to_string(),
            size: 0,
            date_added: now_millis(),
            parent_id,
            is_directory: true,
            color,
        }
    }

    pub(crate) fn file(
        id: EntryId,
        name: &str,
        locator: PathBuf,
        mime_type: &str,
        size: u64,
        parent_id: EntryId,
    ) -> Self {
        let kind = if mime_type.is_empty() { DEFAULT_MIME_TYPE } else { mime_type };
        Entry {
            id,
            name: name.to_string(),
            locator,
            kind: kind.to_string(),
            size,
            date_added: now_millis(),
            parent_id,
            is_directory: false,
            color: None,
        }
    }

    pub fn id(&self) -> &EntryId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns where the entry's bytes live on disk.
    pub fn locator(&self) -> &Path {
        &self.locator
    }

    /// Returns the MIME type of a file, or `"folder"` for folders.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the byte size of a file, or the last computed aggregate for a folder.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn date_added(&self) -> i64 {
        self.date_added
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.date_added)
            .single()
            .unwrap_or_default()
    }

    /// Returns the owning folder's id; empty for the root.
    pub fn parent_id(&self) -> &EntryId {
        &self.parent_id
    }

    pub fn is_folder(&self) -> bool {
        self.is_directory
    }

    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
