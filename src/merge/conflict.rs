//! Conflict types for apply operations.

use crate::fieldpath::{FieldSet, Path};
use std::fmt;

/// Conflict is a field another manager owns with a different value than
/// the one being applied.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Conflict {
    /// The manager that owns the conflicting field.
    pub manager: String,
    /// The path to the conflicting field.
    pub path: Path,
}

impl Conflict {
    pub fn new(manager: impl Into<String>, path: Path) -> Self {
        Conflict {
            manager: manager.into(),
            path,
        }
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conflict with {:?}: {}", self.manager, self.path)
    }
}

impl std::error::Error for Conflict {}

/// Conflicts is a sorted, duplicate free list of conflicts.
///
/// Ordering is by manager, then by path, so the same disagreement always
/// produces the same report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conflicts {
    conflicts: Vec<Conflict>,
}

impl Conflicts {
    pub fn new() -> Self {
        Conflicts::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts.iter()
    }

    /// Returns every conflicting path, whoever owns it.
    pub fn to_set(&self) -> FieldSet {
        self.conflicts.iter().map(|c| &c.path).collect()
    }

    /// Returns the conflicting paths owned by `manager`.
    pub fn paths_of(&self, manager: &str) -> FieldSet {
        self.conflicts
            .iter()
            .filter(|c| c.manager == manager)
            .map(|c| &c.path)
            .collect()
    }
}

impl FromIterator<Conflict> for Conflicts {
    fn from_iter<T: IntoIterator<Item = Conflict>>(iter: T) -> Self {
        let mut conflicts: Vec<Conflict> = iter.into_iter().collect();
        conflicts.sort();
        conflicts.dedup();
        Conflicts { conflicts }
    }
}

impl IntoIterator for Conflicts {
    type Item = Conflict;
    type IntoIter = std::vec::IntoIter<Conflict>;

    fn into_iter(self) -> Self::IntoIter {
        self.conflicts.into_iter()
    }
}

impl fmt::Display for Conflicts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.conflicts.as_slice() {
            [] => write!(f, "no conflicts"),
            [single] => write!(f, "{}", single),
            many => {
                write!(f, "{} conflicts:", many.len())?;
                for conflict in many {
                    write!(f, "\n- {}", conflict)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Conflicts {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fieldpath::PathElement;
    use pretty_assertions::assert_eq;

    fn at(name: &str) -> Path {
        Path::from_elements(vec![PathElement::field(name)])
    }

    #[test]
    fn test_conflicts_are_sorted_and_deduplicated() {
        let conflicts: Conflicts = vec![
            Conflict::new("b", at("x")),
            Conflict::new("a", at("y")),
            Conflict::new("a", at("x")),
            Conflict::new("b", at("x")),
        ]
        .into_iter()
        .collect();

        let got: Vec<(String, String)> = conflicts
            .iter()
            .map(|c| (c.manager.clone(), c.path.to_string()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("a".to_string(), ".x".to_string()),
                ("a".to_string(), ".y".to_string()),
                ("b".to_string(), ".x".to_string()),
            ]
        );
        assert_eq!(conflicts.to_set().len(), 2);
        assert_eq!(conflicts.paths_of("a").len(), 2);
        assert!(conflicts.paths_of("c").is_empty());
    }

    #[test]
    fn test_display() {
        let one: Conflicts = std::iter::once(Conflict::new("m1", at("field"))).collect();
        assert_eq!(one.to_string(), "conflict with \"m1\": .field");

        let two: Conflicts = vec![Conflict::new("m1", at("a")), Conflict::new("m2", at("a"))]
            .into_iter()
            .collect();
        assert_eq!(
            two.to_string(),
            "2 conflicts:\n- conflict with \"m1\": .a\n- conflict with \"m2\": .a"
        );
        assert_eq!(Conflicts::new().to_string(), "no conflicts");
    }
}
