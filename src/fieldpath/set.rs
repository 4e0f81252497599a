//! FieldSet, a set of paths stored as a tree.

use super::path::{Path, PathElement};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// FieldSet is an unordered set of [`Path`]s.
///
/// Paths sharing a prefix share the tree nodes of that prefix. `members`
/// holds the paths ending at this node, `children` the sub-trees of longer
/// paths. A child sub-tree is never empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldSet {
    pub(super) root: bool,
    pub(super) members: BTreeSet<PathElement>,
    pub(super) children: BTreeMap<PathElement, FieldSet>,
}

impl FieldSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        FieldSet::default()
    }

    /// Returns true if the set holds no path at all.
    pub fn is_empty(&self) -> bool {
        !self.root && self.members.is_empty() && self.children.is_empty()
    }

    /// Number of paths in the set.
    pub fn len(&self) -> usize {
        self.root as usize
            + self.members.len()
            + self.children.values().map(FieldSet::len).sum::<usize>()
    }

    /// Adds a path.
    pub fn insert(&mut self, path: &Path) {
        self.insert_elements(path.elements());
    }

    fn insert_elements(&mut self, elements: &[PathElement]) {
        match elements.split_first() {
            None => self.root = true,
            Some((first, [])) => {
                self.members.insert(first.clone());
            }
            Some((first, rest)) => self
                .children
                .entry(first.clone())
                .or_default()
                .insert_elements(rest),
        }
    }

    /// Returns true if the exact path is in the set.
    pub fn has(&self, path: &Path) -> bool {
        self.has_elements(path.elements())
    }

    fn has_elements(&self, elements: &[PathElement]) -> bool {
        match elements.split_first() {
            None => self.root,
            Some((first, [])) => self.members.contains(first),
            Some((first, rest)) => self
                .children
                .get(first)
                .is_some_and(|child| child.has_elements(rest)),
        }
    }

    /// Returns true if some path of the set lies strictly below `path`.
    pub fn has_descendants(&self, path: &Path) -> bool {
        let mut node = self;
        for element in path {
            match node.children.get(element) {
                Some(child) => node = child,
                None => return false,
            }
        }
        !node.members.is_empty() || !node.children.is_empty()
    }

    /// Returns the sub-tree of paths continuing below `element`, with the
    /// element itself stripped from them.
    pub fn child(&self, element: &PathElement) -> Option<&FieldSet> {
        self.children.get(element)
    }

    /// Iterates, in sorted order, over the first element of every path.
    pub fn elements(&self) -> impl Iterator<Item = &PathElement> {
        self.members
            .iter()
            .chain(self.children.keys())
            .collect::<BTreeSet<_>>()
            .into_iter()
    }

    /// Returns the union of both sets.
    pub fn union(&self, other: &FieldSet) -> FieldSet {
        let mut result = self.clone();
        result.union_in_place(other);
        result
    }

    fn union_in_place(&mut self, other: &FieldSet) {
        self.root |= other.root;
        self.members.extend(other.members.iter().cloned());
        for (element, other_child) in &other.children {
            match self.children.get_mut(element) {
                Some(child) => child.union_in_place(other_child),
                None => {
                    self.children.insert(element.clone(), other_child.clone());
                }
            }
        }
    }

    /// Returns the paths present in both sets.
    pub fn intersection(&self, other: &FieldSet) -> FieldSet {
        let mut children = BTreeMap::new();
        for (element, child) in &self.children {
            if let Some(other_child) = other.children.get(element) {
                let common = child.intersection(other_child);
                if !common.is_empty() {
                    children.insert(element.clone(), common);
                }
            }
        }
        FieldSet {
            root: self.root && other.root,
            members: self.members.intersection(&other.members).cloned().collect(),
            children,
        }
    }

    /// Returns the paths of `self` that are not in `other`.
    pub fn difference(&self, other: &FieldSet) -> FieldSet {
        let mut children = BTreeMap::new();
        for (element, child) in &self.children {
            let rest = match other.children.get(element) {
                Some(other_child) => child.difference(other_child),
                None => child.clone(),
            };
            if !rest.is_empty() {
                children.insert(element.clone(), rest);
            }
        }
        FieldSet {
            root: self.root && !other.root,
            members: self.members.difference(&other.members).cloned().collect(),
            children,
        }
    }

    /// Returns the paths of `self` that are neither in `other` nor below one
    /// of `other`'s paths.
    pub fn recursive_difference(&self, other: &FieldSet) -> FieldSet {
        if other.root {
            return FieldSet::new();
        }
        let mut children = BTreeMap::new();
        for (element, child) in &self.children {
            if other.members.contains(element) {
                continue;
            }
            let rest = match other.children.get(element) {
                Some(other_child) => child.recursive_difference(other_child),
                None => child.clone(),
            };
            if !rest.is_empty() {
                children.insert(element.clone(), rest);
            }
        }
        FieldSet {
            root: self.root,
            members: self.members.difference(&other.members).cloned().collect(),
            children,
        }
    }

    /// Returns the paths of `self` equal to `prefix` or rooted under it,
    /// unchanged.
    pub fn with_prefix(&self, prefix: &Path) -> FieldSet {
        let Some((last, ancestors)) = prefix.elements().split_last() else {
            return self.clone();
        };

        let mut node = self;
        for element in ancestors {
            match node.children.get(element) {
                Some(child) => node = child,
                None => return FieldSet::new(),
            }
        }

        let mut subtree = FieldSet::new();
        if node.members.contains(last) {
            subtree.members.insert(last.clone());
        }
        if let Some(child) = node.children.get(last) {
            subtree.children.insert(last.clone(), child.clone());
        }
        if subtree.is_empty() {
            return subtree;
        }
        for element in ancestors.iter().rev() {
            let mut parent = FieldSet::new();
            parent.children.insert(element.clone(), subtree);
            subtree = parent;
        }
        subtree
    }

    /// Returns `self` with `prefix` and everything rooted under it removed.
    pub fn without_prefix(&self, prefix: &Path) -> FieldSet {
        self.difference(&self.with_prefix(prefix))
    }

    /// Iterates over every path, in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = Path> {
        let mut paths = Vec::with_capacity(self.len());
        self.collect_paths(&mut Path::root(), false, &mut paths);
        paths.into_iter()
    }

    /// Iterates, in sorted order, over the paths that have no descendant in
    /// the set.
    pub fn leaves(&self) -> impl Iterator<Item = Path> {
        let mut paths = Vec::new();
        self.collect_paths(&mut Path::root(), true, &mut paths);
        paths.into_iter()
    }

    fn collect_paths(&self, current: &mut Path, leaves_only: bool, out: &mut Vec<Path>) {
        if self.root && current.is_empty() {
            let is_leaf = self.members.is_empty() && self.children.is_empty();
            if !leaves_only || is_leaf {
                out.push(current.clone());
            }
        }

        let elements: BTreeSet<&PathElement> =
            self.members.iter().chain(self.children.keys()).collect();
        for element in elements {
            let child = self.children.get(element);
            current.push(element.clone());
            if self.members.contains(element) && (!leaves_only || child.is_none()) {
                out.push(current.clone());
            }
            if let Some(child) = child {
                child.collect_paths(current, leaves_only, out);
            }
            current.pop();
        }
    }
}

impl FromIterator<Path> for FieldSet {
    fn from_iter<T: IntoIterator<Item = Path>>(iter: T) -> Self {
        let mut set = FieldSet::new();
        for path in iter {
            set.insert(&path);
        }
        set
    }
}

impl<'a> FromIterator<&'a Path> for FieldSet {
    fn from_iter<T: IntoIterator<Item = &'a Path>>(iter: T) -> Self {
        let mut set = FieldSet::new();
        for path in iter {
            set.insert(path);
        }
        set
    }
}

/// One path per line, sorted.
impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, path) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", path)?;
        }
        Ok(())
    }
}
