//! Bounded category -> price cache with least-recently-used eviction.

use std::collections::{HashMap, VecDeque};

/// Category price cache holding at most `capacity` entries.
#[derive(Debug, Default)]
pub struct PriceCache {
    capacity: usize,
    prices: HashMap<String, f64>,
    // front = least recently used
    order: VecDeque<String>,
}

impl PriceCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            prices: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    fn touch(&mut self, category: &str) {
        if let Some(pos) = self.order.iter().position(|c| c == category) {
            if let Some(key) = self.order.remove(pos) {
                self.order.push_back(key);
            }
        }
    }

    /// Cached price, marking the category as recently used.
    pub fn get(&mut self, category: &str) -> Option<f64> {
        let price = self.prices.get(category).copied()?;
        self.touch(category);
        Some(price)
    }

    /// Insert or refresh a price, evicting the least recently used entry
    /// when full. A zero-capacity cache stores nothing.
    pub fn insert(&mut self, category: String, price: f64) {
        if self.capacity == 0 {
            return;
        }
        if self.prices.insert(category.clone(), price).is_some() {
            self.touch(&category);
            return;
        }
        if self.prices.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.prices.remove(&evicted);
            }
        }
        self.order.push_back(category);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_least_recently_used() {
        let mut c = PriceCache::new(2);
        c.insert("a".into(), 1.0);
        c.insert("b".into(), 2.0);
        assert_eq!(c.get("a"), Some(1.0));
        c.insert("c".into(), 3.0);
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("b"), None);
        assert_eq!(c.get("a"), Some(1.0));
        assert_eq!(c.get("c"), Some(3.0));
    }

    #[test]
    fn refresh_does_not_grow() {
        let mut c = PriceCache::new(2);
        c.insert("a".into(), 1.0);
        c.insert("a".into(), 4.0);
        assert_eq!(c.len(), 1);
        assert_eq!(c.get("a"), Some(4.0));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let mut c = PriceCache::new(0);
        c.insert("a".into(), 1.0);
        assert!(c.is_empty());
    }
}
