use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::warn;

use super::sort::{sort_entries, SortOption};
use super::{Entry, EntryId, Error, Result};

/// One slot of the arena: the entry itself plus its ordered child ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Node {
    pub(crate) info: Entry,
    pub(crate) items: Vec<EntryId>,
}

/// The folder hierarchy as an arena of entries keyed by id.
///
/// Serializes to the structure document: an object mapping each id to
/// `{ "info": Entry, "items": [child ids] }`. Child lists keep insertion order;
/// listing order is computed on read by [`Tree::contents`].
///
/// The tree shape is an invariant maintained by [`TreeStore`](super::TreeStore);
/// [`Tree::validate`] checks it for documents read from disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    nodes: BTreeMap<EntryId, Node>,
}

impl Tree {
    pub(crate) fn with_root(root: Entry) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(root.id.clone(), Node { info: root, items: Vec::new() });
        Tree { nodes }
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.nodes.get(id).map(|node| &node.info)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Returns the root folder entry, if the tree has one.
    pub fn root(&self) -> Option<&Entry> {
        self.get(super::ROOT_ID)
    }

    /// Returns the child ids of a folder in insertion order.
    pub fn child_ids(&self, id: &str) -> Option<&[EntryId]> {
        self.nodes.get(id).map(|node| node.items.as_slice())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.nodes.values().map(|node| &node.info)
    }

    /// Lists the entries of a folder, folders first, each group ordered by `sort`.
    ///
    /// An unknown folder yields an empty list.
    pub fn contents(&self, folder_id: &str, sort: SortOption) -> Vec<&Entry> {
        let Some(node) = self.nodes.get(folder_id) else {
            warn!("Folder does not exist: {}", folder_id);
            return Vec::new();
        };

        let mut entries: Vec<&Entry> = node.items.iter().filter_map(|id| self.get(id.as_str())).collect();
        sort_entries(&mut entries, sort);
        entries
    }

    /// Returns the chain of entries from the root down to `folder_id` (inclusive).
    ///
    /// The walk follows parent links upward and stops at the first id without an entry.
    /// An unknown `folder_id` yields an empty path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CycleDetected`] if an id is visited twice.
    pub fn path_to(&self, folder_id: &str) -> Result<Vec<&Entry>> {
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        let mut current = folder_id;

        while let Some(entry) = self.get(current) {
            if !visited.insert(current) {
                return Err(Error::CycleDetected {
                    item: EntryId::from(folder_id),
                    target: entry.id.clone(),
                });
            }
            path.push(entry);
            current = entry.parent_id.as_str();
        }

        path.reverse();
        Ok(path)
    }

    /// Returns true if a child of `parent_id` other than `exclude` is named `name`.
    /// Comparison is exact and case-sensitive.
    pub(crate) fn has_child_named(&self, parent_id: &str, name: &str, exclude: Option<&str>) -> bool {
        let Some(parent) = self.nodes.get(parent_id) else {
            return false;
        };
        parent.items.iter().any(|id| {
            Some(id.as_str()) != exclude && self.get(id.as_str()).is_some_and(|child| child.name == name)
        })
    }

    /// Returns true if `candidate` is `ancestor` itself or lies somewhere below it.
    pub(crate) fn is_within(&self, candidate: &str, ancestor: &str) -> bool {
        let mut current = candidate;
        // Bounded by the number of entries so a corrupt chain cannot loop forever.
        for _ in 0..=self.nodes.len() {
            if current == ancestor {
                return true;
            }
            match self.get(current) {
                Some(entry) if !entry.parent_id.is_empty() => current = entry.parent_id.as_str(),
                _ => return false,
            }
        }
        true
    }

    /// Inserts a new entry and appends it to its parent's child list.
    /// The parent must already exist.
    pub(crate) fn insert(&mut self, entry: Entry) {
        let id = entry.id.clone();
        if let Some(parent) = self.nodes.get_mut(entry.parent_id.as_str()) {
            parent.items.push(id.clone());
        }
        self.nodes.insert(id, Node { info: entry, items: Vec::new() });
    }

    pub(crate) fn rename(&mut self, id: &str, name: &str) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.info.name = name.to_string();
        }
    }

    /// Moves `id` from its current parent's child list to the end of `new_parent`'s.
    pub(crate) fn relink(&mut self, id: &str, new_parent: &str) {
        let Some(old_parent) = self.get(id).map(|entry| entry.parent_id.clone()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(old_parent.as_str()) {
            node.items.retain(|child| child.as_str() != id);
        }
        if let Some(node) = self.nodes.get_mut(new_parent) {
            node.items.push(EntryId::from(id));
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.info.parent_id = EntryId::from(new_parent);
        }
    }

    /// Unlinks an entry from its parent and drops it from the arena.
    ///
    /// Children are not touched; callers remove them first (see [`Tree::subtree_post_order`]).
    pub(crate) fn remove(&mut self, id: &str) -> Option<Entry> {
        let node = self.nodes.remove(id)?;
        if let Some(parent) = self.nodes.get_mut(node.info.parent_id.as_str()) {
            parent.items.retain(|child| child.as_str() != id);
        }
        Some(node.info)
    }

    /// Collects `id` and all of its descendants, children before their folder.
    pub(crate) fn subtree_post_order(&self, id: &str) -> Vec<EntryId> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.collect_post_order(id, &mut out, &mut visited);
        out
    }

    fn collect_post_order(&self, id: &str, out: &mut Vec<EntryId>, visited: &mut HashSet<EntryId>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !visited.insert(node.info.id.clone()) {
            return;
        }
        for child in &node.items {
            self.collect_post_order(child.as_str(), out, visited);
        }
        out.push(node.info.id.clone());
    }

    /// Recomputes the aggregate size of `id` and of every folder below it.
    ///
    /// Files contribute their own size; each nested folder's size is written as it is computed.
    pub(crate) fn recompute_size(&mut self, id: &str) -> u64 {
        let Some(node) = self.nodes.get(id) else {
            return 0;
        };
        if !node.info.is_directory {
            return node.info.size;
        }

        let children = node.items.clone();
        let total: u64 = children
            .iter()
            .map(|child| self.recompute_size(child.as_str()))
            .sum();

        if let Some(node) = self.nodes.get_mut(id) {
            node.info.size = total;
        }
        total
    }

    /// Drops everything that cannot be reached from a well-formed root.
    ///
    /// Walks child lists from the root and keeps a link only if the child exists, points
    /// back at the listing folder and has not been seen yet. Entries never reached are
    /// removed. Returns the number of links and entries dropped. A missing or malformed
    /// root is left for [`Tree::validate`] to reject.
    pub(crate) fn prune_orphans(&mut self) -> usize {
        let root_ok = self
            .root()
            .is_some_and(|root| root.id.is_root() && root.parent_id.is_empty() && root.is_directory);
        if !root_ok {
            return 0;
        }

        let mut reachable = HashSet::new();
        reachable.insert(EntryId::root());
        let mut stack = vec![EntryId::root()];
        let mut dropped = 0;

        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id.as_str()) else {
                continue;
            };
            let is_directory = node.info.is_directory;
            let mut kept = Vec::with_capacity(node.items.len());
            for child_id in &node.items {
                let linked = is_directory
                    && !reachable.contains(child_id)
                    && self
                        .nodes
                        .get(child_id.as_str())
                        .is_some_and(|child| child.info.id == *child_id && child.info.parent_id == id);
                if linked {
                    reachable.insert(child_id.clone());
                    stack.push(child_id.clone());
                    kept.push(child_id.clone());
                } else {
                    warn!("Dropping stale child link {} from {}", child_id, id);
                    dropped += 1;
                }
            }
            if let Some(node) = self.nodes.get_mut(id.as_str()) {
                node.items = kept;
            }
        }

        let orphans: Vec<EntryId> = self.nodes.keys().filter(|key| !reachable.contains(*key)).cloned().collect();
        for key in &orphans {
            warn!("Dropping orphaned entry {}", key);
            self.nodes.remove(key.as_str());
        }
        dropped + orphans.len()
    }

    /// Checks the structural invariants of the tree.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStructure`] describing the first violation found:
    /// missing or malformed root, key/id mismatch, dangling parent, parent that is a file,
    /// child lists out of sync with parent links, or an entry unreachable from the root.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(Error::InvalidStructure(msg));

        match self.root() {
            None => return invalid("missing root entry".to_string()),
            Some(root) if !root.parent_id.is_empty() || !root.is_directory => {
                return invalid("root entry must be a folder without a parent".to_string());
            }
            Some(_) => {}
        }

        for (key, node) in &self.nodes {
            let entry = &node.info;
            if key != &entry.id {
                return invalid(format!("key {} holds entry {}", key, entry.id));
            }
            if !entry.is_directory && !node.items.is_empty() {
                return invalid(format!("file {} has children", key));
            }

            let mut seen = HashSet::new();
            for child_id in &node.items {
                if !seen.insert(child_id) {
                    return invalid(format!("{} lists child {} twice", key, child_id));
                }
                match self.get(child_id.as_str()) {
                    None => return invalid(format!("{} lists missing child {}", key, child_id)),
                    Some(child) if child.parent_id != *key => {
                        return invalid(format!("{} lists {} whose parent is {}", key, child_id, child.parent_id));
                    }
                    Some(_) => {}
                }
            }

            if entry.id.is_root() {
                continue;
            }
            match self.nodes.get(entry.parent_id.as_str()) {
                None => return invalid(format!("{} has dangling parent {}", key, entry.parent_id)),
                Some(parent) if !parent.info.is_directory => {
                    return invalid(format!("{} has a file as parent", key));
                }
                Some(parent) if !parent.items.contains(key) => {
                    return invalid(format!("{} is missing from its parent's children", key));
                }
                Some(_) => {}
            }
        }

        // Every entry linked both ways and exactly one root: reachability rules out cycles.
        let reachable = self.subtree_post_order(super::ROOT_ID).len();
        if reachable != self.nodes.len() {
            return invalid(format!(
                "{} entries are not reachable from the root",
                self.nodes.len() - reachable
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn root_tree() -> Tree {
        Tree::with_root(Entry::root("My Files", PathBuf::from("/files")))
    }

    fn add_folder(tree: &mut Tree, name: &str, parent: &str) -> EntryId {
        let id = EntryId::generate();
        tree.insert(Entry::folder(id.clone(), name, PathBuf::new(), EntryId::from(parent), None));
        id
    }

    fn add_file(tree: &mut Tree, name: &str, size: u64, parent: &str) -> EntryId {
        let id = EntryId::generate();
        tree.insert(Entry::file(id.clone(), name, PathBuf::new(), "text/plain", size, EntryId::from(parent)));
        id
    }

    #[test]
    fn test_insert_links_child_to_parent() {
        let mut tree = root_tree();
        let docs = add_folder(&mut tree, "Docs", "root");

        assert_eq!(tree.child_ids("root").unwrap(), &[docs.clone()]);
        assert_eq!(tree.get(docs.as_str()).unwrap().parent_id().as_str(), "root");
        tree.validate().unwrap();
    }

    #[test]
    fn test_has_child_named_is_case_sensitive_and_honours_exclusion() {
        let mut tree = root_tree();
        let docs = add_folder(&mut tree, "Docs", "root");

        assert!(tree.has_child_named("root", "Docs", None));
        assert!(!tree.has_child_named("root", "docs", None));
        assert!(!tree.has_child_named("root", "Docs", Some(docs.as_str())));
        assert!(!tree.has_child_named("missing", "Docs", None));
    }

    #[test]
    fn test_path_to_walks_from_root() {
        let mut tree = root_tree();
        let a = add_folder(&mut tree, "A", "root");
        let b = add_folder(&mut tree, "B", a.as_str());

        let path = tree.path_to(b.as_str()).unwrap();
        let names: Vec<_> = path.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["My Files", "A", "B"]);
        for pair in path.windows(2) {
            assert_eq!(pair[1].parent_id(), pair[0].id());
        }

        assert!(tree.path_to("nope").unwrap().is_empty());
    }

    #[test]
    fn test_path_to_detects_cycle() {
        let mut tree = root_tree();
        let a = add_folder(&mut tree, "A", "root");
        let b = add_folder(&mut tree, "B", a.as_str());
        // Corrupt the links directly: A <-> B.
        tree.nodes.get_mut(a.as_str()).unwrap().info.parent_id = b.clone();

        assert!(matches!(tree.path_to(b.as_str()), Err(Error::CycleDetected { .. })));
        assert!(matches!(tree.validate(), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_is_within() {
        let mut tree = root_tree();
        let a = add_folder(&mut tree, "A", "root");
        let b = add_folder(&mut tree, "B", a.as_str());
        let c = add_folder(&mut tree, "C", "root");

        assert!(tree.is_within(b.as_str(), a.as_str()));
        assert!(tree.is_within(a.as_str(), a.as_str()));
        assert!(!tree.is_within(a.as_str(), b.as_str()));
        assert!(!tree.is_within(c.as_str(), a.as_str()));
    }

    #[test]
    fn test_relink_moves_between_child_lists() {
        let mut tree = root_tree();
        let a = add_folder(&mut tree, "A", "root");
        let b = add_folder(&mut tree, "B", "root");
        let f = add_file(&mut tree, "f.txt", 1, a.as_str());

        tree.relink(f.as_str(), b.as_str());

        assert!(tree.child_ids(a.as_str()).unwrap().is_empty());
        assert_eq!(tree.child_ids(b.as_str()).unwrap(), &[f.clone()]);
        assert_eq!(tree.get(f.as_str()).unwrap().parent_id(), &b);
        tree.validate().unwrap();
    }

    #[test]
    fn test_subtree_post_order_lists_children_first() {
        let mut tree = root_tree();
        let a = add_folder(&mut tree, "A", "root");
        let b = add_folder(&mut tree, "B", a.as_str());
        let f = add_file(&mut tree, "f", 1, b.as_str());

        let order = tree.subtree_post_order(a.as_str());
        assert_eq!(order, vec![f, b, a]);
    }

    #[test]
    fn test_recompute_size_writes_nested_folders() {
        let mut tree = root_tree();
        let top = add_folder(&mut tree, "Top", "root");
        add_file(&mut tree, "a", 100, top.as_str());
        let sub = add_folder(&mut tree, "Sub", top.as_str());
        add_file(&mut tree, "b", 50, sub.as_str());

        assert_eq!(tree.recompute_size(top.as_str()), 150);
        assert_eq!(tree.get(top.as_str()).unwrap().size(), 150);
        assert_eq!(tree.get(sub.as_str()).unwrap().size(), 50);
    }

    #[test]
    fn test_validate_rejects_dangling_child() {
        let mut tree = root_tree();
        tree.nodes.get_mut("root").unwrap().items.push(EntryId::from("ghost"));
        assert!(matches!(tree.validate(), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_prune_orphans_keeps_reachable_tree() {
        let mut tree = root_tree();
        let kept = add_folder(&mut tree, "Kept", "root");
        let kept_file = add_file(&mut tree, "k.txt", 3, kept.as_str());
        let gone = add_folder(&mut tree, "Gone", "root");
        let child = add_file(&mut tree, "c.txt", 1, gone.as_str());
        let sub = add_folder(&mut tree, "Sub", gone.as_str());
        let grandchild = add_file(&mut tree, "g.txt", 1, sub.as_str());
        // Leftovers of a folder removed without its children: the folder is gone,
        // its descendants stay behind, and the root still lists a dead id.
        tree.nodes.remove(gone.as_str());
        tree.nodes.get_mut("root").unwrap().items.push(EntryId::from("ghost"));
        assert!(tree.validate().is_err());

        let dropped = tree.prune_orphans();

        assert_eq!(dropped, 5, "gone + ghost links, plus three orphaned entries");
        tree.validate().unwrap();
        assert_eq!(tree.child_ids("root").unwrap(), &[kept.clone()]);
        assert!(tree.contains(kept_file.as_str()));
        for id in [&child, &sub, &grandchild] {
            assert!(!tree.contains(id.as_str()));
        }
    }

    #[test]
    fn test_prune_orphans_leaves_malformed_root_alone() {
        let mut tree = root_tree();
        tree.nodes.get_mut("root").unwrap().info.is_directory = false;
        assert_eq!(tree.prune_orphans(), 0);
        assert!(matches!(tree.validate(), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_validate_rejects_missing_root() {
        let tree = Tree { nodes: BTreeMap::new() };
        assert!(matches!(tree.validate(), Err(Error::InvalidStructure(_))));
    }
}
