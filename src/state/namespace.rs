use serde::Serialize;
use std::collections::HashMap;

/// Names below this go to a direct-index table; larger names to a map.
pub const FAST_NAMES: usize = 100;

pub trait ShadowObject {
    fn new(name: u32) -> Self;
    fn name(&self) -> u32;
}

/// Deletion bookkeeping for objects the API lets outlive their delete call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteState {
    #[default]
    Live,
    PendingDelete,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Lifetime {
    ref_count: u32,
    state: DeleteState,
}

impl Lifetime {
    pub fn acquire(&mut self) {
        self.ref_count += 1;
    }

    pub fn release(&mut self) {
        self.ref_count = self.ref_count.saturating_sub(1);
    }

    pub fn request_delete(&mut self) {
        self.state = DeleteState::PendingDelete;
    }

    pub fn ref_count(&self) -> u32 {
        self.ref_count
    }

    pub fn is_delete_requested(&self) -> bool {
        self.state == DeleteState::PendingDelete
    }

    pub fn may_delete(&self) -> bool {
        self.ref_count == 0 && self.is_delete_requested()
    }
}

/// Name-to-record table for one object kind.
///
/// Records are boxed, so a record keeps its address for as long as it stays
/// in the table.
pub struct ObjectNamespace<T> {
    fast: Vec<Option<Box<T>>>,
    slow: HashMap<u32, Box<T>>,
}

impl<T: ShadowObject> ObjectNamespace<T> {
    pub fn new() -> Self {
        Self {
            fast: (0..FAST_NAMES).map(|_| None).collect(),
            slow: HashMap::new(),
        }
    }

    /// Returns the record for `name`, creating it on first sight.
    pub fn ensure(&mut self, name: u32) -> &mut T {
        if (name as usize) < FAST_NAMES {
            let slot = &mut self.fast[name as usize];
            &mut **slot.get_or_insert_with(|| Box::new(T::new(name)))
        } else {
            &mut **self
                .slow
                .entry(name)
                .or_insert_with(|| Box::new(T::new(name)))
        }
    }

    pub fn get(&self, name: u32) -> Option<&T> {
        match self.fast.get(name as usize) {
            Some(slot) => slot.as_deref(),
            None => self.slow.get(&name).map(|b| &**b),
        }
    }

    pub fn get_mut(&mut self, name: u32) -> Option<&mut T> {
        if (name as usize) < FAST_NAMES {
            self.fast[name as usize].as_deref_mut()
        } else {
            self.slow.get_mut(&name).map(|b| &mut **b)
        }
    }

    pub fn contains(&self, name: u32) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: u32) -> Option<Box<T>> {
        if (name as usize) < FAST_NAMES {
            self.fast[name as usize].take()
        } else {
            self.slow.remove(&name)
        }
    }

    pub fn len(&self) -> usize {
        self.fast.iter().filter(|s| s.is_some()).count() + self.slow.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.fast
            .iter()
            .filter_map(|s| s.as_deref())
            .chain(self.slow.values().map(|b| &**b))
    }

    pub fn names(&self) -> Vec<u32> {
        let mut names: Vec<u32> = self.iter().map(|o| o.name()).collect();
        names.sort_unstable();
        names
    }
}

impl<T: ShadowObject> Default for ObjectNamespace<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Dummy {
        name: u32,
        touched: u32,
    }

    impl ShadowObject for Dummy {
        fn new(name: u32) -> Self {
            Self { name, touched: 0 }
        }

        fn name(&self) -> u32 {
            self.name
        }
    }

    #[test]
    fn test_ensure_is_idempotent() {
        let mut ns = ObjectNamespace::<Dummy>::new();
        for name in [1u32, 99, 100, 5000] {
            let first = ns.ensure(name) as *const Dummy;
            ns.ensure(name).touched += 1;
            let second = ns.ensure(name) as *const Dummy;
            assert_eq!(first, second);
            assert_eq!(ns.get(name).unwrap().touched, 1);
        }
        assert_eq!(ns.len(), 4);
        assert_eq!(ns.names(), vec![1, 99, 100, 5000]);
    }

    #[test]
    fn test_unknown_names_are_not_found() {
        let mut ns = ObjectNamespace::<Dummy>::new();
        assert!(ns.get(7).is_none());
        assert!(ns.get_mut(70_000).is_none());
        assert!(ns.remove(7).is_none());
        assert!(ns.is_empty());
    }

    #[test]
    fn test_remove_then_recreate() {
        let mut ns = ObjectNamespace::<Dummy>::new();
        ns.ensure(3).touched = 9;
        ns.ensure(300).touched = 9;
        assert_eq!(ns.remove(3).unwrap().touched, 9);
        assert_eq!(ns.remove(300).unwrap().touched, 9);
        assert_eq!(ns.ensure(3).touched, 0);
        assert!(!ns.contains(300));
    }

    #[test]
    fn test_lifetime_may_delete() {
        let mut life = Lifetime::default();
        assert!(!life.may_delete());

        life.acquire();
        life.request_delete();
        assert!(!life.may_delete());
        assert!(life.is_delete_requested());

        life.release();
        assert!(life.may_delete());

        life.release();
        assert_eq!(life.ref_count(), 0);
    }
}
