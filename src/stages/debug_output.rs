use crate::dispatch::{Dispatcher, Next, Stage};
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::host::DebugProc;
use crate::state::thread;
use crate::value::{memory, CallRecord, Value};
use std::os::raw::{c_char, c_void};
use std::sync::Arc;

/// Replaces the application's debug callback with the wrapper's own, which
/// queues every message on the current context before forwarding it.
struct DebugOutputStage;

impl Stage for DebugOutputStage {
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        let forwarded = next.pre(call)?;

        let ctx = match thread::current_context() {
            Some(ctx) => ctx,
            None => return Ok(forwarded),
        };
        let callback = call.arg_u64(0)?;
        let user_param = call.arg_u64(1)?;
        ctx.debug_output().app_callback = (callback != 0).then_some((callback, user_param));

        next.interceptor()
            .host()
            .install_debug_callback(call.entry_point, wrapper_callback, 0);
        Ok(Some(Value::Void))
    }
}

extern "system" fn wrapper_callback(
    source: u32,
    kind: u32,
    id: u32,
    severity: u32,
    length: i32,
    message: *const c_char,
    _user_param: *const c_void,
) {
    let text = if message.is_null() {
        String::new()
    } else if length >= 0 {
        // SAFETY: the driver passes `length` bytes at `message`.
        let bytes = unsafe { std::slice::from_raw_parts(message as *const u8, length as usize) };
        String::from_utf8_lossy(bytes).into_owned()
    } else {
        // SAFETY: a negative length means NUL-terminated.
        unsafe { memory::read_c_str(message as usize as u64) }.unwrap_or_default()
    };

    let ctx = match thread::current_context() {
        Some(ctx) => ctx,
        None => {
            log::debug!("Debug message with no current context: {}", text);
            return;
        }
    };

    let mut output = ctx.debug_output();
    output.push(text);
    let app_callback = output.app_callback;
    drop(output);

    if let Some((callback, app_param)) = app_callback {
        // SAFETY: `callback` was registered by the application as a GLDEBUGPROC.
        let callback: DebugProc = unsafe { std::mem::transmute(callback as usize) };
        callback(
            source,
            kind,
            id,
            severity,
            length,
            message,
            app_param as usize as *const c_void,
        );
    }
}

pub(super) fn install(dispatcher: &Dispatcher) {
    dispatcher.register_all(
        &[
            EntryPoint::GlDebugMessageCallback,
            EntryPoint::GlDebugMessageCallbackArb,
        ],
        Arc::new(DebugOutputStage),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ContextVersion, Display};
    use std::ffi::CString;

    #[test]
    fn test_wrapper_callback_queues_on_current_context() {
        let display = Arc::new(Display::new(0x51));
        let ctx = display.ensure_context(0x52, ContextVersion::DESKTOP, None, Vec::new());
        thread::bind_context(&display, 0x52, None, None);

        let message = CString::new("buffer too small").unwrap();
        wrapper_callback(0, 0, 1, 0, -1, message.as_ptr(), std::ptr::null());
        wrapper_callback(0, 0, 2, 0, 6, message.as_ptr(), std::ptr::null());

        assert_eq!(
            ctx.debug_output().pop().as_deref(),
            Some("buffer too small\nbuffer")
        );
        thread::release();
    }
}
