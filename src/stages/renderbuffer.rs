use super::{name_array, register, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::{Context, LevelDesc};
use crate::value::{CallRecord, Value};
use crate::Interceptor;

struct RenderbufferAction;

impl ObjectAction for RenderbufferAction {
    fn apply(
        &self,
        _interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        _ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlGenRenderbuffers => {
                let names = name_array(call)?;
                let mut state = ctx.lock();
                for name in names {
                    state.renderbuffers.ensure(name);
                }
            }
            EntryPoint::GlDeleteRenderbuffers => {
                let names = name_array(call)?;
                let mut state = ctx.lock();
                for name in names {
                    state.renderbuffers.remove(name);
                    if state.renderbuffer_binding == name {
                        state.renderbuffer_binding = 0;
                    }
                }
            }
            EntryPoint::GlBindRenderbuffer => {
                let target = call.arg_u32(0)?;
                let name = call.arg_u32(1)?;
                let mut state = ctx.lock();
                if name != 0 {
                    state.renderbuffers.ensure(name).target.get_or_insert(target);
                }
                state.renderbuffer_binding = name;
            }
            EntryPoint::GlRenderbufferStorage => {
                let storage = LevelDesc {
                    internal_format: call.arg_u32(1)?,
                    width: call.arg_i64(2)? as i32,
                    height: call.arg_i64(3)? as i32,
                };
                let mut state = ctx.lock();
                let bound = state.renderbuffer_binding;
                if bound != 0 {
                    state.renderbuffers.ensure(bound).storage = Some(storage);
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
            EntryPoint::GlGenRenderbuffers,
            EntryPoint::GlDeleteRenderbuffers,
            EntryPoint::GlBindRenderbuffer,
            EntryPoint::GlRenderbufferStorage,
        ],
        RenderbufferAction,
    );
}
