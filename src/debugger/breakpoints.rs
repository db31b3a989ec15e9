use crate::entrypoint::EntryPoint;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Breakpoints {
    points: HashSet<EntryPoint>,
}

impl Breakpoints {
    pub fn new() -> Self {
        Self {
            points: HashSet::new(),
        }
    }

    pub fn add(&mut self, entry_point: EntryPoint) {
        self.points.insert(entry_point);
        log::debug!("Breakpoint set at {}", entry_point);
    }

    pub fn contains(&self, entry_point: EntryPoint) -> bool {
        self.points.contains(&entry_point)
    }

    /// Replaces the whole set, as the debugger always sends the full list.
    pub fn replace(&mut self, entry_points: impl IntoIterator<Item = EntryPoint>) {
        self.points = entry_points.into_iter().collect();
        log::debug!("{} breakpoints active", self.points.len());
    }
}
