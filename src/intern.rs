//! Interning tables and the run-wide id counter.

use crate::error::{ConvertError, Result};
use indexmap::IndexMap;
use std::fmt::Debug;
use std::hash::Hash;

/// One sequence for every surrogate id of a run: interned entities and
/// synthetic join-row keys alike. Starts at 1.
#[derive(Debug, Clone)]
pub struct IdCounter {
    next: i64,
}

impl Default for IdCounter {
    fn default() -> Self {
        Self { next: 1 }
    }
}

impl IdCounter {
    pub fn next_id(&mut self) -> i64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Highest id issued so far, 0 before the first.
    pub fn high_water(&self) -> i64 {
        self.next - 1
    }
}

/// Canonical key → surrogate id, plus the first-seen value for the key.
/// Iteration follows insertion order.
#[derive(Debug, Clone)]
pub struct InternTable<K, V = ()> {
    kind: &'static str,
    entries: IndexMap<K, (i64, V)>,
}

impl<K, V> InternTable<K, V>
where
    K: Eq + Hash + Debug,
{
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: IndexMap::new(),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Callers check `contains` first; adding a present key is an engine bug.
    pub fn add(&mut self, key: K, value: V, counter: &mut IdCounter) -> Result<i64> {
        if self.entries.contains_key(&key) {
            return Err(ConvertError::DuplicateKey {
                kind: self.kind,
                key: format!("{key:?}"),
            });
        }
        let id = counter.next_id();
        self.entries.insert(key, (id, value));
        Ok(id)
    }

    /// First-seen wins: adds only when the key is new.
    pub fn intern(&mut self, key: K, value: V, counter: &mut IdCounter) -> Result<i64> {
        match self.entries.get(&key) {
            Some((id, _)) => Ok(*id),
            None => self.add(key, value, counter),
        }
    }

    pub fn lookup(&self, key: &K) -> Result<i64> {
        self.entries
            .get(key)
            .map(|(id, _)| *id)
            .ok_or_else(|| ConvertError::UnresolvedReference {
                kind: self.kind,
                key: format!("{key:?}"),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, i64, &V)> {
        self.entries.iter().map(|(k, (id, v))| (k, *id, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K> InternTable<K, ()>
where
    K: Eq + Hash + Debug,
{
    /// Interns every value of a closed set, in declaration order.
    pub fn from_closed_set(
        kind: &'static str,
        values: impl IntoIterator<Item = K>,
        counter: &mut IdCounter,
    ) -> Result<Self> {
        let mut table = Self::new(kind);
        for value in values {
            table.add(value, (), counter)?;
        }
        Ok(table)
    }
}

/// String-keyed categories never intern the empty string.
impl<V> InternTable<String, V> {
    pub fn intern_text(&mut self, text: &str, value: V, counter: &mut IdCounter) -> Result<()> {
        if text.is_empty() || self.entries.contains_key(text) {
            return Ok(());
        }
        self.add(text.to_string(), value, counter)?;
        Ok(())
    }

    pub fn lookup_text(&self, text: &str) -> Result<i64> {
        self.entries
            .get(text)
            .map(|(id, _)| *id)
            .ok_or_else(|| ConvertError::UnresolvedReference {
                kind: self.kind,
                key: format!("{text:?}"),
            })
    }

    /// `None` for the empty string, which is never interned.
    pub fn lookup_optional_text(&self, text: &str) -> Result<Option<i64>> {
        if text.is_empty() {
            return Ok(None);
        }
        self.lookup_text(text).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_come_from_one_shared_sequence() {
        let mut counter = IdCounter::default();
        let mut genres: InternTable<String> = InternTable::new("genre");
        let mut studios: InternTable<String> = InternTable::new("studio");

        assert_eq!(genres.add("Drama".into(), (), &mut counter).unwrap(), 1);
        assert_eq!(studios.add("Drama".into(), (), &mut counter).unwrap(), 2);
        assert_eq!(genres.add("Comedy".into(), (), &mut counter).unwrap(), 3);
        assert_eq!(counter.next_id(), 4);
        assert_eq!(counter.high_water(), 4);
    }

    #[test]
    fn first_seen_value_wins() {
        let mut counter = IdCounter::default();
        let mut table: InternTable<String, i32> = InternTable::new("person");
        let a = table.intern("x".into(), 1950, &mut counter).unwrap();
        let b = table.intern("x".into(), 1999, &mut counter).unwrap();
        assert_eq!(a, b);
        let (_, _, year) = table.iter().next().unwrap();
        assert_eq!(*year, 1950);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn adding_twice_is_an_invariant_violation() {
        let mut counter = IdCounter::default();
        let mut table: InternTable<String> = InternTable::new("genre");
        table.add("Drama".into(), (), &mut counter).unwrap();
        let err = table.add("Drama".into(), (), &mut counter).unwrap_err();
        assert_eq!(err.code(), "duplicate_key");
    }

    #[test]
    fn lookup_miss_is_fatal() {
        let table: InternTable<String> = InternTable::new("genre");
        let err = table.lookup_text("Western").unwrap_err();
        assert_eq!(err.code(), "unresolved_reference");
        assert!(err.to_string().contains("genre"));
    }

    #[test]
    fn empty_text_is_never_interned() {
        let mut counter = IdCounter::default();
        let mut table: InternTable<String> = InternTable::new("subtitle");
        table.intern_text("", (), &mut counter).unwrap();
        assert!(table.is_empty());
        assert_eq!(table.lookup_optional_text("").unwrap(), None);
        assert_eq!(counter.high_water(), 0);
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let mut counter = IdCounter::default();
        let mut table: InternTable<String> = InternTable::new("country");
        for c in ["Japan", "France", "Brazil"] {
            table.intern_text(c, (), &mut counter).unwrap();
        }
        let keys: Vec<&str> = table.iter().map(|(k, _, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["Japan", "France", "Brazil"]);
    }
}
