use std::borrow::Borrow;
use std::hash::Hash;

use hashbrown::HashMap;

/// Assigns dense ids to keys in order of first appearance.
#[derive(Debug, Clone)]
pub struct Indexer<K> {
    ids: HashMap<K, usize>,
    keys: Vec<K>,
}

impl<K> Indexer<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            keys: vec![],
        }
    }

    pub fn get_or_insert<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + ToOwned<Owned = K> + Eq + Hash,
    {
        if let Some(&id) = self.ids.get(key) {
            id
        } else {
            let id = self.keys.len();
            self.keys.push(key.to_owned());
            self.ids.insert(key.to_owned(), id);
            id
        }
    }

    pub fn get<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq + Hash,
    {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[K] {
        &self.keys
    }
}

impl<K> FromIterator<K> for Indexer<K>
where
    K: Eq + Hash + Clone,
{
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut indexer = Self::new();
        for key in iter {
            if !indexer.ids.contains_key(&key) {
                indexer.ids.insert(key.clone(), indexer.keys.len());
                indexer.keys.push(key);
            }
        }
        indexer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexer_first_appearance_order() {
        let mut indexer: Indexer<String> = Indexer::new();
        assert_eq!(0, indexer.get_or_insert("s"));
        assert_eq!(1, indexer.get_or_insert("e"));
        assert_eq!(0, indexer.get_or_insert("s"));
        assert_eq!(Some(1), indexer.get("e"));
        assert_eq!(None, indexer.get("n"));
        assert_eq!(&["s".to_string(), "e".to_string()], indexer.keys());
    }

    #[test]
    fn test_indexer_from_iter_dedups() {
        let indexer: Indexer<&str> = ["a", "b", "a", "c"].into_iter().collect();
        assert_eq!(&["a", "b", "c"], indexer.keys());
    }
}
