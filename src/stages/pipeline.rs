use super::{name_array, register, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::Context;
use crate::value::{CallRecord, Value};
use crate::Interceptor;

struct PipelineAction;

impl ObjectAction for PipelineAction {
    fn apply(
        &self,
        _interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        _ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlGenProgramPipelines => {
                let names = name_array(call)?;
                let mut state = ctx.lock();
                for name in names {
                    state.pipelines.ensure(name);
                }
            }
            EntryPoint::GlDeleteProgramPipelines => {
                let names = name_array(call)?;
                let mut state = ctx.lock();
                for name in names {
                    state.pipelines.remove(name);
                    if state.pipeline_binding == name {
                        state.pipeline_binding = 0;
                    }
                }
            }
            EntryPoint::GlBindProgramPipeline => {
                let name = call.arg_u32(0)?;
                let mut state = ctx.lock();
                if name != 0 {
                    state.pipelines.ensure(name);
                }
                state.pipeline_binding = name;
            }
            EntryPoint::GlUseProgramStages => {
                let pipeline = call.arg_u32(0)?;
                let stages = call.arg_u32(1)?;
                let program = call.arg_u32(2)?;
                let mut state = ctx.lock();
                let stage_programs = &mut state.pipelines.ensure(pipeline).stages;
                if program == 0 {
                    stage_programs.remove(&stages);
                } else {
                    stage_programs.insert(stages, program);
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
            EntryPoint::GlGenProgramPipelines,
            EntryPoint::GlDeleteProgramPipelines,
            EntryPoint::GlBindProgramPipeline,
            EntryPoint::GlUseProgramStages,
        ],
        PipelineAction,
    );
}
