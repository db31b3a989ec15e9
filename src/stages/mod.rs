//! Interceptor stages installed at startup.

mod buffer;
mod context;
mod debug_output;
mod default;
mod framebuffer;
mod get_error;
mod immediate;
mod pipeline;
mod proc_address;
mod program;
mod renderbuffer;
mod shader;
mod texture;

use crate::dispatch::{Dispatcher, Next, Stage};
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::{thread, Context, GL_NO_ERROR};
use crate::value::{memory, CallRecord, Value};
use crate::Interceptor;
use std::sync::Arc;

pub use default::DefaultStage;

/// Installs the default stage on every entry point, then the specialized ones above it.
pub fn install(dispatcher: &Dispatcher) {
    let default: Arc<dyn Stage> = Arc::new(DefaultStage);
    dispatcher.register_all(EntryPoint::ALL, default);

    get_error::install(dispatcher);
    proc_address::install(dispatcher);
    context::install(dispatcher);
    immediate::install(dispatcher);
    debug_output::install(dispatcher);
    texture::install(dispatcher);
    buffer::install(dispatcher);
    framebuffer::install(dispatcher);
    renderbuffer::install(dispatcher);
    program::install(dispatcher);
    shader::install(dispatcher);
    pipeline::install(dispatcher);
}

/// Shadow bookkeeping for one object kind, run after the real call on the
/// current context.
pub trait ObjectAction: Send + Sync {
    fn apply(
        &self,
        interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        ret: Option<&Value>,
    ) -> Result<()>;
}

/// Runs an [`ObjectAction`] only when the real call left no driver error.
pub struct WhenNoError<A>(pub A);

impl<A: ObjectAction> Stage for WhenNoError<A> {
    fn post(&self, call: &CallRecord, ret: Option<&Value>, next: Next<'_>) -> Result<()> {
        let interceptor = next.interceptor();
        match thread::current_context() {
            Some(ctx) => {
                let error = ctx.lock().peek_error(interceptor.host());
                if error == GL_NO_ERROR {
                    self.0.apply(interceptor, &ctx, call, ret)?;
                } else {
                    log::debug!("{} failed with {:#x}, shadow untouched", call.entry_point, error);
                }
            }
            None => log::debug!("{} without a current context", call.entry_point),
        }
        next.post(call, ret)
    }
}

fn register<A: ObjectAction + 'static>(dispatcher: &Dispatcher, entry_points: &[EntryPoint], action: A) {
    dispatcher.register_all(entry_points, Arc::new(WhenNoError(action)));
}

/// Names written by `glGen*(n, names)` or read by `glDelete*(n, names)`.
fn name_array(call: &CallRecord) -> Result<Vec<u32>> {
    let count = call.arg_i64(0)?.max(0) as usize;
    let ptr = call.arg_u64(1)?;
    // SAFETY: the application passed `count` names at `ptr`.
    Ok(unsafe { memory::read_array::<u32>(ptr, count) })
}

/// Unsigned return value of a creation call, zero when there is none.
fn returned_name(ret: Option<&Value>) -> u32 {
    ret.and_then(Value::as_u64).unwrap_or(0) as u32
}

fn succeeded(ret: Option<&Value>) -> bool {
    ret.map_or(false, Value::is_truthy)
}
