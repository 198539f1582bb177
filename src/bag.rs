//! Token-keyed observer storage.

/// Collection handing out a removal token per insertion.
///
/// Iteration order is insertion order.
#[derive(Debug)]
pub(crate) struct Bag<T> {
    next_token: u64,
    items: Vec<(u64, T)>,
}

impl<T> Bag<T> {
    pub(crate) fn new() -> Self {
        Self {
            next_token: 0,
            items: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> u64 {
        let token = self.next_token;
        self.next_token += 1;
        self.items.push((token, item));
        token
    }

    pub(crate) fn remove(&mut self, token: u64) -> Option<T> {
        let index = self.items.iter().position(|(t, _)| *t == token)?;
        Some(self.items.remove(index).1)
    }

    /// Remove and return every item.
    pub(crate) fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).map(|(_, item)| item).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

impl<T: Clone> Bag<T> {
    pub(crate) fn snapshot(&self) -> Vec<T> {
        self.items.iter().map(|(_, item)| item.clone()).collect()
    }
}

impl<T> Default for Bag<T> {
    fn default() -> Self {
        Self::new()
    }
}
