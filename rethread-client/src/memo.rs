/// A value derived from some input, recomputed only when the input's key
/// changes
#[derive(Clone, Debug)]
pub struct Memo<K, V> {
    cached: Option<(K, V)>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Memo { cached: None }
    }
}

impl<K: PartialEq, V> Memo<K, V> {
    pub fn new() -> Memo<K, V> {
        Memo::default()
    }

    pub fn get_or_compute(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        let entry = match self.cached.take() {
            Some((k, v)) if k == key => (k, v),
            _ => (key, compute()),
        };
        &self.cached.insert(entry).1
    }
}
