use std::collections::HashMap;

/// Keys classified by a join against the previous elements
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinSummary {
    pub entered: Vec<String>,
    pub updated: Vec<String>,
    pub exited: Vec<String>,
}

/// Retained elements keyed by identifier, drawn in `order`
#[derive(Clone, Debug)]
pub struct Layer<E> {
    elements: HashMap<String, E>,
    order: Vec<String>,
}

impl<E> Default for Layer<E> {
    fn default() -> Self {
        Self {
            elements: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<E> Layer<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile elements with `data`: new keys are created by `enter`,
    /// then every surviving element (entered or not) goes through `update`,
    /// and keys missing from `data` are removed. Draw order follows `data`;
    /// duplicate keys after the first are ignored.
    pub fn join<K: AsRef<str>, D>(
        &mut self,
        data: impl IntoIterator<Item = (K, D)>,
        mut enter: impl FnMut(&str, &D) -> E,
        mut update: impl FnMut(&str, D, &mut E),
    ) -> JoinSummary {
        let mut summary = JoinSummary::default();
        let mut order = Vec::new();
        let mut next = HashMap::with_capacity(self.elements.len());

        for (key, datum) in data {
            let key = key.as_ref();
            if next.contains_key(key) {
                continue;
            }
            let mut element = match self.elements.remove(key) {
                Some(existing) => {
                    summary.updated.push(key.to_string());
                    existing
                }
                None => {
                    summary.entered.push(key.to_string());
                    enter(key, &datum)
                }
            };
            update(key, datum, &mut element);
            order.push(key.to_string());
            next.insert(key.to_string(), element);
        }

        summary.exited = self
            .order
            .iter()
            .filter(|k| self.elements.contains_key(k.as_str()))
            .cloned()
            .collect();
        self.elements = next;
        self.order = order;
        summary
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.elements.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.elements.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Elements in draw order, back to front
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&str, &E)> {
        self.order
            .iter()
            .filter_map(|k| self.elements.get(k).map(|e| (k.as_str(), e)))
    }

    pub fn for_each_mut(&mut self, mut f: impl FnMut(&str, &mut E)) {
        for (key, element) in self.elements.iter_mut() {
            f(key, element);
        }
    }

    /// Move an element to the end of the draw order so it paints on top
    pub fn raise(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            let k = self.order.remove(pos);
            self.order.push(k);
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Key -> value map keeping first-insertion order, last write wins
#[derive(Clone, Debug)]
pub struct KeyedIndex<T> {
    values: HashMap<String, T>,
    order: Vec<String>,
}

impl<T> KeyedIndex<T> {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, T)>) -> Self {
        let mut values = HashMap::new();
        let mut order = Vec::new();
        for (key, value) in entries {
            if values.insert(key.clone(), value).is_none() {
                order.push(key);
            }
        }
        Self { values, order }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.order
            .iter()
            .filter_map(|k| self.values.get(k).map(|v| (k.as_str(), v)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_update_exit() {
        let mut layer: Layer<u32> = Layer::new();
        let first = layer.join([("a", 1), ("b", 2)], |_, d| *d * 10, |_, _, _| {});
        assert_eq!(first.entered, vec!["a", "b"]);
        assert_eq!(layer.get("a"), Some(&10));

        let mut updates = 0;
        let second = layer.join(
            [("c", 3), ("a", 4)],
            |_, d| *d * 10,
            |_, d, e| {
                updates += 1;
                *e += d;
            },
        );
        assert_eq!(second.entered, vec!["c"]);
        assert_eq!(second.updated, vec!["a"]);
        assert_eq!(second.exited, vec!["b"]);
        assert_eq!(updates, 2);
        assert_eq!(layer.get("a"), Some(&14));
        assert_eq!(layer.get("c"), Some(&33));
        assert!(!layer.contains("b"));
        assert_eq!(layer.keys().collect::<Vec<_>>(), vec!["c", "a"]);
    }

    #[test]
    fn test_raise() {
        let mut layer: Layer<()> = Layer::new();
        layer.join([("a", ()), ("b", ()), ("c", ())], |_, _| (), |_, _, _| {});
        layer.raise("a");
        assert_eq!(layer.keys().collect::<Vec<_>>(), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_keyed_index_last_write_wins() {
        let index = KeyedIndex::from_entries([
            ("x".to_string(), 1),
            ("y".to_string(), 2),
            ("x".to_string(), 3),
        ]);
        assert_eq!(index.len(), 2);
        assert_eq!(index.get("x"), Some(&3));
        assert_eq!(index.keys().collect::<Vec<_>>(), vec!["x", "y"]);
    }
}
