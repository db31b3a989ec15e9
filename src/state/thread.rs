//! What each application thread has current.

use super::context::Context;
use super::display::Display;
use std::cell::RefCell;
use std::sync::Arc;

pub const EGL_OPENGL_ES_API: u32 = 0x30A0;
pub const EGL_OPENGL_API: u32 = 0x30A2;

struct ThreadState {
    display: Option<Arc<Display>>,
    context: Option<Arc<Context>>,
    egl_api: u32,
}

impl Default for ThreadState {
    fn default() -> Self {
        Self {
            display: None,
            context: None,
            egl_api: EGL_OPENGL_ES_API,
        }
    }
}

thread_local! {
    static CURRENT: RefCell<ThreadState> = RefCell::new(ThreadState::default());
}

pub fn current_context() -> Option<Arc<Context>> {
    CURRENT.with(|state| state.borrow().context.clone())
}

pub fn current_context_id() -> u64 {
    current_context().map_or(0, |ctx| ctx.id())
}

/// Makes `context` current on this thread, releasing whatever was current.
/// A context id of zero only releases. Rebinding the current context only
/// switches its surfaces.
pub fn bind_context(display: &Arc<Display>, context: u64, draw: Option<u64>, read: Option<u64>) {
    if context != 0 {
        if let Some(ctx) = current_context() {
            if ctx.id() == context && ctx.display() == display.id() {
                ctx.set_surfaces(draw, read);
                return;
            }
        }
    }

    release();
    if context == 0 {
        return;
    }

    let ctx = match display.get_context(context) {
        Some(ctx) => ctx,
        None => {
            log::warn!(
                "Context {:#x} made current before its creation was seen",
                context
            );
            display.ensure_context(
                context,
                super::context::ContextVersion::DESKTOP,
                None,
                Vec::new(),
            )
        }
    };
    ctx.bind_thread(draw, read);

    CURRENT.with(|state| {
        let mut state = state.borrow_mut();
        state.display = Some(Arc::clone(display));
        state.context = Some(ctx);
    });
}

/// Drops the current context, finishing a pending delete if this was its last thread.
pub fn release() {
    let (display, context) = CURRENT.with(|state| {
        let mut state = state.borrow_mut();
        (state.display.take(), state.context.take())
    });

    if let (Some(display), Some(ctx)) = (display, context) {
        if ctx.unbind_thread() {
            display.remove_context(ctx.id());
        }
    }
}

pub fn bind_egl_api(api: u32) {
    CURRENT.with(|state| state.borrow_mut().egl_api = api);
}

pub fn egl_api() -> u32 {
    CURRENT.with(|state| state.borrow().egl_api)
}
