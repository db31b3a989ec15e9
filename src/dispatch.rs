//! Per-entry-point interceptor chains.
//!
//! Every entry point owns an ordered list of [`Stage`]s. The most recently
//! registered stage runs first and hands control down the list through
//! [`Next`]; the stage installed first (the default stage) sits at the tail.

use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::value::{CallRecord, Value};
use crate::Interceptor;
use parking_lot::RwLock;
use std::cell::Cell;
use std::sync::Arc;

/// One interceptor around a real call.
///
/// Both hooks fall through to the rest of the chain unless overridden.
pub trait Stage: Send + Sync {
    /// Runs before the real call. Returning `Some` skips the real call and
    /// hands that value to the application instead.
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        next.pre(call)
    }

    /// Runs after the real call. Implementations must eventually call `next.post`.
    fn post(&self, call: &CallRecord, ret: Option<&Value>, next: Next<'_>) -> Result<()> {
        next.post(call, ret)
    }
}

/// The remainder of a chain, handed to each stage.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Stage>],
    interceptor: &'a Interceptor,
}

impl<'a> Next<'a> {
    fn new(stages: &'a [Arc<dyn Stage>], interceptor: &'a Interceptor) -> Self {
        Self {
            stages,
            interceptor,
        }
    }

    pub fn interceptor(&self) -> &'a Interceptor {
        self.interceptor
    }

    pub fn pre(self, call: &CallRecord) -> Result<Option<Value>> {
        match self.stages.split_first() {
            Some((head, rest)) => head.pre(call, Next::new(rest, self.interceptor)),
            None => Ok(None),
        }
    }

    pub fn post(self, call: &CallRecord, ret: Option<&Value>) -> Result<()> {
        match self.stages.split_first() {
            Some((head, rest)) => head.post(call, ret, Next::new(rest, self.interceptor)),
            None => Ok(()),
        }
    }
}

type Chain = Arc<[Arc<dyn Stage>]>;

thread_local! {
    /// How many intercepted calls this thread is inside of.
    static DEPTH: Cell<u32> = const { Cell::new(0) };
}

/// Registered chains, one per entry point.
pub struct Dispatcher {
    chains: RwLock<Vec<Chain>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        let empty: Chain = Arc::from(Vec::new());
        Self {
            chains: RwLock::new(vec![empty; EntryPoint::COUNT]),
        }
    }

    /// Puts `stage` at the head of `entry_point`'s chain.
    pub fn register(&self, entry_point: EntryPoint, stage: Arc<dyn Stage>) {
        let mut chains = self.chains.write();
        let slot = &mut chains[entry_point.index()];
        let chain: Vec<Arc<dyn Stage>> = std::iter::once(stage)
            .chain(slot.iter().cloned())
            .collect();
        *slot = Arc::from(chain);
    }

    pub fn register_all(&self, entry_points: &[EntryPoint], stage: Arc<dyn Stage>) {
        for &entry_point in entry_points {
            self.register(entry_point, Arc::clone(&stage));
        }
    }

    pub fn chain_len(&self, entry_point: EntryPoint) -> usize {
        self.chains.read()[entry_point.index()].len()
    }

    fn chain(&self, entry_point: EntryPoint) -> Chain {
        Arc::clone(&self.chains.read()[entry_point.index()])
    }

    /// Pre-hook entry. Calls nested inside another intercepted call on the
    /// same thread go straight to the driver.
    pub fn pre(&self, interceptor: &Interceptor, call: &CallRecord) -> Result<Option<Value>> {
        let depth = DEPTH.with(|d| {
            let depth = d.get() + 1;
            d.set(depth);
            depth
        });
        if depth > 1 {
            log::trace!("Nested {} passes through", call.entry_point);
            return Ok(None);
        }

        log::trace!("{}", call.entry_point);
        let chain = self.chain(call.entry_point);
        let result = Next::new(&chain, interceptor).pre(call);
        if result.is_err() {
            DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
        }
        result
    }

    pub fn post(
        &self,
        interceptor: &Interceptor,
        call: &CallRecord,
        ret: Option<&Value>,
    ) -> Result<()> {
        let depth = DEPTH.with(Cell::get);
        let result = if depth == 1 {
            let chain = self.chain(call.entry_point);
            Next::new(&chain, interceptor).post(call, ret)
        } else {
            Ok(())
        };
        DEPTH.with(|d| d.set(depth.saturating_sub(1)));
        result
    }
}
