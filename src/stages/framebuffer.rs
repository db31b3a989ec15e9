use super::{name_array, register, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::{Attachment, Context, ObjectKind};
use crate::value::{CallRecord, Value};
use crate::Interceptor;

struct FramebufferAction;

impl FramebufferAction {
    /// Records an attachment on the framebuffer bound to `target`. Name 0 detaches.
    fn attach(ctx: &Context, target: u32, point: u32, attachment: Attachment) {
        let mut state = ctx.lock();
        let framebuffer = match state.bound_framebuffer(target) {
            Some(framebuffer) => framebuffer,
            None => {
                log::debug!("Attachment to the default framebuffer ignored");
                return;
            }
        };
        let attachment = (attachment.name != 0).then_some(attachment);
        state.framebuffers.ensure(framebuffer).attach(point, attachment);
    }
}

impl ObjectAction for FramebufferAction {
    fn apply(
        &self,
        _interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        _ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlGenFramebuffers => {
                let names = name_array(call)?;
                let mut state = ctx.lock();
                for name in names {
                    state.framebuffers.ensure(name);
                }
            }
            EntryPoint::GlDeleteFramebuffers => {
                let names = name_array(call)?;
                let mut state = ctx.lock();
                for name in names {
                    state.delete_framebuffer(name);
                }
            }
            EntryPoint::GlBindFramebuffer => {
                let target = call.arg_u32(0)?;
                let name = call.arg_u32(1)?;
                let mut state = ctx.lock();
                if name != 0 {
                    state.framebuffers.ensure(name).target.get_or_insert(target);
                }
                state.bind_framebuffer(target, name);
            }
            EntryPoint::GlFramebufferTexture2D => {
                let target = call.arg_u32(0)?;
                let point = call.arg_u32(1)?;
                let attachment = Attachment {
                    kind: ObjectKind::Texture,
                    name: call.arg_u32(3)?,
                    level: call.arg_i64(4)? as i32,
                };
                Self::attach(ctx, target, point, attachment);
            }
            EntryPoint::GlFramebufferRenderbuffer => {
                let target = call.arg_u32(0)?;
                let point = call.arg_u32(1)?;
                let attachment = Attachment {
                    kind: ObjectKind::Renderbuffer,
                    name: call.arg_u32(3)?,
                    level: 0,
                };
                Self::attach(ctx, target, point, attachment);
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
            EntryPoint::GlGenFramebuffers,
            EntryPoint::GlDeleteFramebuffers,
            EntryPoint::GlBindFramebuffer,
            EntryPoint::GlFramebufferTexture2D,
            EntryPoint::GlFramebufferRenderbuffer,
        ],
        FramebufferAction,
    );
}
