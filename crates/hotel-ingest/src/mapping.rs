//! Natural key to surrogate id mapping

use hotel_common::{ImportError, Result};
use std::collections::{BTreeSet, HashMap};
use std::fmt::Display;
use std::hash::Hash;

/// Natural key -> datastore id for one entity kind.
///
/// Only strictly positive ids are ever stored, so a successful lookup can
/// be used as a foreign key as-is.
#[derive(Debug, Clone)]
pub struct EntityMapping<K> {
    ids: HashMap<K, i32>,
}

impl<K> Default for EntityMapping<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Display> EntityMapping<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the id the datastore assigned to `key`.
    pub fn assign(&mut self, key: K, id: i32) -> Result<()> {
        if id <= 0 {
            return Err(ImportError::mapping(format!(
                "datastore returned id {} for '{}'",
                id, key
            )));
        }
        self.ids.insert(key, id);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<i32> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Fail unless every key in `expected` has an id.
    pub fn ensure_complete(&self, kind: &str, expected: &BTreeSet<K>) -> Result<()>
    where
        K: Ord,
    {
        let missing: Vec<String> = expected
            .iter()
            .filter(|k| !self.ids.contains_key(*k))
            .take(5)
            .map(|k| k.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ImportError::mapping(format!(
                "no {} id for {}",
                kind,
                missing.join(", ")
            )))
        }
    }
}

impl<K: Eq + Hash> FromIterator<(K, i32)> for EntityMapping<K> {
    fn from_iter<I: IntoIterator<Item = (K, i32)>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().filter(|(_, id)| *id > 0).collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{CityKey, RegionKey};

    #[test]
    fn test_assign_rejects_placeholder_ids() {
        let mut mapping = EntityMapping::new();
        assert!(mapping.assign(RegionKey("Lazio".into()), 0).is_err());
        assert!(mapping.assign(RegionKey("Lazio".into()), -3).is_err());
        mapping.assign(RegionKey("Lazio".into()), 12).unwrap();
        assert_eq!(mapping.get(&RegionKey("Lazio".into())), Some(12));
        assert_eq!(mapping.get(&RegionKey("Bavaria".into())), None);
    }

    #[test]
    fn test_ensure_complete() {
        let paris = CityKey::new("Paris", "FR");
        let rome = CityKey::new("Rome", "IT");
        let expected: BTreeSet<CityKey> = [paris.clone(), rome.clone()].into_iter().collect();

        let mut mapping = EntityMapping::new();
        mapping.assign(paris, 1).unwrap();
        let err = mapping.ensure_complete("city", &expected).unwrap_err();
        assert!(err.to_string().contains("Rome|IT"));

        mapping.assign(rome, 2).unwrap();
        assert!(mapping.ensure_complete("city", &expected).is_ok());
    }
}
