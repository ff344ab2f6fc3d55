//! Change set for routing committed writes to live queries.
//!
//! A ChangeSet records which tables one or more commits touched and, per
//! table, which owners. Live queries declare `Dependency`s and are re-run only
//! when a change set affects one of them.

use hashbrown::{HashMap, HashSet};

/// The owners touched in one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owners {
    /// Every owner, e.g. a write to a table without an owner column.
    All,
    Some(HashSet<String>),
}

impl Owners {
    fn insert(&mut self, owner: Option<&str>) {
        match owner {
            None => *self = Owners::All,
            Some(owner) => {
                if let Owners::Some(set) = self {
                    set.insert(owner.to_owned());
                }
            }
        }
    }

    fn merge(&mut self, other: Owners) {
        match other {
            Owners::All => *self = Owners::All,
            Owners::Some(set) => {
                for owner in set {
                    self.insert(Some(&owner));
                }
            }
        }
    }

    /// Returns true if a dependency on `owner` (or on the whole table when
    /// `None`) is affected.
    pub fn matches(&self, owner: Option<&str>) -> bool {
        match (self, owner) {
            (Owners::All, _) | (Owners::Some(_), None) => true,
            (Owners::Some(set), Some(owner)) => set.contains(owner),
        }
    }
}

/// A table, optionally narrowed to one owner, that a live query reads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dependency {
    pub table: String,
    /// `None` depends on every row of the table.
    pub owner: Option<String>,
}

impl Dependency {
    /// Depends on the whole table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            owner: None,
        }
    }

    /// Depends on the rows of one owner.
    pub fn owned(table: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            owner: Some(owner.into()),
        }
    }
}

/// Tables and owners touched by committed writes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    tables: HashMap<String, Owners>,
}

impl ChangeSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a write to `table` for `owner`. `None` marks the whole table.
    pub fn touch(&mut self, table: &str, owner: Option<&str>) {
        match self.tables.get_mut(table) {
            Some(owners) => owners.insert(owner),
            None => {
                let owners = match owner {
                    Some(owner) => Owners::Some(HashSet::from_iter([owner.to_owned()])),
                    None => Owners::All,
                };
                self.tables.insert(table.to_owned(), owners);
            }
        }
    }

    /// Builder form of `touch`.
    pub fn with(mut self, table: &str, owner: Option<&str>) -> Self {
        self.touch(table, owner);
        self
    }

    /// Merges another change set into this one.
    pub fn merge(&mut self, other: ChangeSet) {
        for (table, owners) in other.tables {
            match self.tables.get_mut(&table) {
                Some(existing) => existing.merge(owners),
                None => {
                    self.tables.insert(table, owners);
                }
            }
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of tables touched.
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn owners(&self, table: &str) -> Option<&Owners> {
        self.tables.get(table)
    }

    /// Returns true if the change set affects the dependency.
    pub fn affects(&self, dependency: &Dependency) -> bool {
        self.tables
            .get(&dependency.table)
            .is_some_and(|owners| owners.matches(dependency.owner.as_deref()))
    }

    pub fn affects_any(&self, dependencies: &[Dependency]) -> bool {
        dependencies.iter().any(|d| self.affects(d))
    }
}
