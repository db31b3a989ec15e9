use super::{name_array, register, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::Context;
use crate::value::{CallRecord, Value};
use crate::Interceptor;

struct BufferAction;

impl ObjectAction for BufferAction {
    fn apply(
        &self,
        _interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        _ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlGenBuffers => {
                let shared = ctx.shared();
                let access = shared.lock();
                let mut buffers = access.buffers();
                for name in name_array(call)? {
                    buffers.ensure(name);
                }
            }
            EntryPoint::GlDeleteBuffers => {
                for name in name_array(call)? {
                    ctx.delete_buffer(name);
                }
            }
            EntryPoint::GlBindBuffer => {
                let target = call.arg_u32(0)?;
                let name = call.arg_u32(1)?;
                if name != 0 {
                    let shared = ctx.shared();
                    let access = shared.lock();
                    let mut buffers = access.buffers();
                    let buffer = buffers.ensure(name);
                    buffer.target.get_or_insert(target);
                }
                ctx.lock().bind_buffer(target, name);
            }
            EntryPoint::GlBufferData => {
                let target = call.arg_u32(0)?;
                let size = call.arg_i64(1)?;
                let usage = call.arg_u32(3)?;
                let bound = ctx.lock().bound_buffer(target);
                if let Some(name) = bound {
                    let shared = ctx.shared();
                    let access = shared.lock();
                    let mut buffers = access.buffers();
                    let buffer = buffers.ensure(name);
                    buffer.size = size;
                    buffer.usage = Some(usage);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

pub(super) fn install(dispatcher: &Dispatcher) {
    register(
        dispatcher,
        &[
            EntryPoint::GlGenBuffers,
            EntryPoint::GlDeleteBuffers,
            EntryPoint::GlBindBuffer,
            EntryPoint::GlBufferData,
        ],
        BufferAction,
    );
}
