use super::{register, returned_name, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::Context;
use crate::value::{CallRecord, Value};
use crate::Interceptor;

struct ProgramAction;

impl ObjectAction for ProgramAction {
    fn apply(
        &self,
        interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlCreateProgram => {
                let name = returned_name(ret);
                if name != 0 {
                    ctx.lock().programs.ensure(name);
                }
            }
            EntryPoint::GlDeleteProgram => {
                let name = call.arg_u32(0)?;
                if name != 0 {
                    ctx.lock().delete_program(name);
                }
            }
            EntryPoint::GlUseProgram => ctx.lock().use_program(call.arg_u32(0)?),
            EntryPoint::GlAttachShader => {
                ctx.lock().attach_shader(call.arg_u32(0)?, call.arg_u32(1)?)
            }
            EntryPoint::GlDetachShader => {
                ctx.lock().detach_shader(call.arg_u32(0)?, call.arg_u32(1)?)
            }
            EntryPoint::GlLinkProgram => {
                let name = call.arg_u32(0)?;
                let linked = interceptor.host().program_link_status(name);
                ctx.lock().programs.ensure(name).link_status = Some(linked);
                if !linked {
                    log::debug!("Program {} failed to link", name);
                    interceptor
                        .controller()
                        .break_state()
                        .set_break_at_compile_or_link_error();
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
            EntryPoint::GlCreateProgram,
            EntryPoint::GlDeleteProgram,
            EntryPoint::GlUseProgram,
            EntryPoint::GlAttachShader,
            EntryPoint::GlDetachShader,
            EntryPoint::GlLinkProgram,
        ],
        ProgramAction,
    );
}
