// Memoization of the loaded tables.

use log::debug;
use std::collections::HashMap;
use std::rc::Rc;

/// Keeps the values already loaded, keyed by a digest of their load parameters.
///
/// Values are shared: a cache hit returns the same allocation as the first load.
/// Failed loads are not remembered.
pub struct LoadCache<V> {
    entries: HashMap<String, Rc<V>>,
    hits: usize,
    misses: usize,
}

impl<V> LoadCache<V> {
    pub fn new() -> LoadCache<V> {
        LoadCache {
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn key<S: AsRef<str>>(parts: &[S]) -> String {
        let joined: Vec<&str> = parts.iter().map(|s| s.as_ref()).collect();
        sha256::digest(joined.join("\u{1f}"))
    }

    pub fn get_or_try_load<F, E>(&mut self, key: &str, load: F) -> Result<Rc<V>, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(v) = self.entries.get(key) {
            self.hits += 1;
            debug!("get_or_try_load: hit {}", key);
            return Ok(v.clone());
        }
        self.misses += 1;
        debug!("get_or_try_load: miss {}", key);
        let v = Rc::new(load()?);
        self.entries.insert(key.to_string(), v.clone());
        Ok(v)
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for LoadCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_once() {
        let mut cache: LoadCache<Vec<i32>> = LoadCache::new();
        let key = LoadCache::<Vec<i32>>::key(&["local", "data.csv"]);
        let mut calls = 0;
        let a = cache
            .get_or_try_load(&key, || -> Result<Vec<i32>, ()> {
                calls += 1;
                Ok(vec![1, 2])
            })
            .unwrap();
        let b = cache
            .get_or_try_load(&key, || -> Result<Vec<i32>, ()> {
                calls += 1;
                Ok(vec![3])
            })
            .unwrap();
        assert_eq!(calls, 1);
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!((cache.hits(), cache.misses(), cache.len()), (1, 1, 1));
    }

    #[test]
    fn errors_are_not_cached() {
        let mut cache: LoadCache<i32> = LoadCache::new();
        let res: Result<Rc<i32>, &str> = cache.get_or_try_load("k", || Err("unavailable"));
        assert!(res.is_err());
        assert!(cache.is_empty());
        let v: Result<Rc<i32>, &str> = cache.get_or_try_load("k", || Ok(3));
        assert_eq!(*v.unwrap(), 3);
    }

    #[test]
    fn keys_depend_on_all_parts() {
        let k1 = LoadCache::<i32>::key(&["a", "bc"]);
        let k2 = LoadCache::<i32>::key(&["ab", "c"]);
        assert_ne!(k1, k2);
        assert_eq!(k1, LoadCache::<i32>::key(&["a".to_string(), "bc".to_string()]));
    }
}
