use super::{register, returned_name, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::Context;
use crate::value::{memory, CallRecord, Value};
use crate::Interceptor;

struct ShaderAction;

impl ObjectAction for ShaderAction {
    fn apply(
        &self,
        interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlCreateShader => {
                let name = returned_name(ret);
                if name != 0 {
                    ctx.lock().shaders.ensure(name).shader_type = Some(call.arg_u32(0)?);
                }
            }
            EntryPoint::GlDeleteShader => {
                let name = call.arg_u32(0)?;
                if name != 0 {
                    ctx.lock().delete_shader(name);
                }
            }
            EntryPoint::GlShaderSource => {
                let name = call.arg_u32(0)?;
                let count = call.arg_i64(1)?.max(0) as usize;
                // SAFETY: same contract as the real glShaderSource.
                let source =
                    unsafe { memory::read_sources(call.arg_u64(2)?, count, call.arg_u64(3)?) };
                let mut state = ctx.lock();
                let shader = state.shaders.ensure(name);
                shader.source = Some(source);
                shader.edited_source = None;
            }
            EntryPoint::GlCompileShader => {
                let name = call.arg_u32(0)?;
                let compiled = interceptor.host().shader_compile_status(name);
                ctx.lock().shaders.ensure(name).compile_status = Some(compiled);
                if !compiled {
                    log::debug!("Shader {} failed to compile", name);
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
            EntryPoint::GlCreateShader,
            EntryPoint::GlDeleteShader,
            EntryPoint::GlShaderSource,
            EntryPoint::GlCompileShader,
        ],
        ShaderAction,
    );
}
