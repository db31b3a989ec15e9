use crate::dispatch::{Dispatcher, Next, Stage};
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::value::{CallRecord, Value};
use std::sync::Arc;

/// Hands out wrapper trampolines instead of driver pointers for every
/// entry point the wrapper knows, so extension calls are intercepted too.
struct ProcAddressStage;

impl Stage for ProcAddressStage {
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        let forwarded = next.pre(call)?;

        let entry_point = match call.arg_string(0)?.as_deref().and_then(EntryPoint::from_name) {
            Some(entry_point) => entry_point,
            None => return Ok(forwarded),
        };

        let host = next.interceptor().host();
        match host.ensure_pointer(entry_point) {
            Ok(_) => Ok(Some(Value::Ptr(host.wrapper_pointer(entry_point)))),
            Err(e) => {
                log::debug!("{} unavailable in the driver: {}", entry_point, e);
                Ok(Some(Value::Ptr(0)))
            }
        }
    }
}

pub(super) fn install(dispatcher: &Dispatcher) {
    dispatcher.register_all(
        &[
            EntryPoint::EglGetProcAddress,
            EntryPoint::GlxGetProcAddress,
            EntryPoint::GlxGetProcAddressArb,
            EntryPoint::WglGetProcAddress,
        ],
        Arc::new(ProcAddressStage),
    );
}
