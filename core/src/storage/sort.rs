use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::Entry;

/// Ordering applied when listing a folder.
///
/// Folders are always listed before files; the option orders entries within each group.
/// The string codes (`name_asc`, `size_desc`, ...) are the persisted form of the option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOption {
    #[default]
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
    SizeAsc,
    SizeDesc,
    TypeAsc,
    TypeDesc,
}

impl SortOption {
    pub const ALL: [SortOption; 8] = [
        SortOption::NameAsc,
        SortOption::NameDesc,
        SortOption::DateAsc,
        SortOption::DateDesc,
        SortOption::SizeAsc,
        SortOption::SizeDesc,
        SortOption::TypeAsc,
        SortOption::TypeDesc,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            SortOption::NameAsc => "name_asc",
            SortOption::NameDesc => "name_desc",
            SortOption::DateAsc => "date_asc",
            SortOption::DateDesc => "date_desc",
            SortOption::SizeAsc => "size_asc",
            SortOption::SizeDesc => "size_desc",
            SortOption::TypeAsc => "type_asc",
            SortOption::TypeDesc => "type_desc",
        }
    }
}

impl fmt::Display for SortOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown sort option: {0}")]
pub struct UnknownSortOption(pub String);

impl FromStr for SortOption {
    type Err = UnknownSortOption;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOption::ALL
            .into_iter()
            .find(|option| option.code() == s)
            .ok_or_else(|| UnknownSortOption(s.to_string()))
    }
}

/// Sorts entries in place: folders first, then files, each group ordered by `option`.
///
/// Under a type sort, folders stay ordered by ascending name since their kind carries
/// no information. Ties on type fall back to ascending name.
pub fn sort_entries(entries: &mut Vec<&Entry>, option: SortOption) {
    let (mut folders, mut files): (Vec<&Entry>, Vec<&Entry>) =
        entries.drain(..).partition(|entry| entry.is_folder());

    match option {
        SortOption::TypeAsc | SortOption::TypeDesc => {
            folders.sort_by(|a, b| compare_names(a.name(), b.name()));
        }
        _ => folders.sort_by(|a, b| compare_by(a, b, option)),
    }
    files.sort_by(|a, b| compare_by(a, b, option));

    entries.extend(folders);
    entries.extend(files);
}

fn compare_by(a: &Entry, b: &Entry, option: SortOption) -> Ordering {
    match option {
        SortOption::NameAsc => compare_names(a.name(), b.name()),
        SortOption::NameDesc => compare_names(b.name(), a.name()),
        SortOption::DateAsc => a.date_added().cmp(&b.date_added()),
        SortOption::DateDesc => b.date_added().cmp(&a.date_added()),
        SortOption::SizeAsc => a.size().cmp(&b.size()),
        SortOption::SizeDesc => b.size().cmp(&a.size()),
        SortOption::TypeAsc => a
            .kind()
            .cmp(b.kind())
            .then_with(|| compare_names(a.name(), b.name())),
        SortOption::TypeDesc => b
            .kind()
            .cmp(a.kind())
            .then_with(|| compare_names(a.name(), b.name())),
    }
}

/// Human-facing name order: case-insensitive first, exact bytes to break ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
