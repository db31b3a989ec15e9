use crate::dispatch::{Dispatcher, Next, Stage};
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::thread;
use crate::value::{CallRecord, Value};
use std::sync::Arc;

/// Answers glGetError with the error the wrapper already consumed while
/// peeking, so the application still sees it exactly once.
struct GetErrorStage;

impl Stage for GetErrorStage {
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        let forwarded = next.pre(call)?;
        let poked = thread::current_context().and_then(|ctx| ctx.lock().take_poked_error());
        match poked {
            Some(error) => {
                log::debug!("Replaying error {:#x} to the application", error);
                Ok(Some(Value::UInt(error as u64)))
            }
            None => Ok(forwarded),
        }
    }
}

pub(super) fn install(dispatcher: &Dispatcher) {
    dispatcher.register(EntryPoint::GlGetError, Arc::new(GetErrorStage));
}
