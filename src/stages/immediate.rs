use crate::dispatch::{Dispatcher, Next, Stage};
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::thread;
use crate::value::{CallRecord, Value};
use std::sync::Arc;

/// Tracks glBegin/glEnd. glGetError is illegal in between, so the
/// context stops peeking errors until glEnd.
struct ImmediateStage;

impl Stage for ImmediateStage {
    fn post(&self, call: &CallRecord, ret: Option<&Value>, next: Next<'_>) -> Result<()> {
        if let Some(ctx) = thread::current_context() {
            ctx.lock().immediate_mode = call.entry_point == EntryPoint::GlBegin;
        }
        next.post(call, ret)
    }
}

pub(super) fn install(dispatcher: &Dispatcher) {
    dispatcher.register_all(
        &[EntryPoint::GlBegin, EntryPoint::GlEnd],
        Arc::new(ImmediateStage),
    );
}
