use super::{name_array, register, ObjectAction};
use crate::dispatch::Dispatcher;
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::{Context, LevelDesc, GL_TEXTURE0};
use crate::value::{CallRecord, Value};
use crate::Interceptor;

const GL_TEXTURE_CUBE_MAP: u32 = 0x8513;
const GL_TEXTURE_CUBE_MAP_POSITIVE_X: u32 = 0x8515;
const GL_TEXTURE_CUBE_MAP_NEGATIVE_Z: u32 = 0x851A;

/// Cube faces are bound through the cube map target.
fn binding_target(target: u32) -> u32 {
    if (GL_TEXTURE_CUBE_MAP_POSITIVE_X..=GL_TEXTURE_CUBE_MAP_NEGATIVE_Z).contains(&target) {
        GL_TEXTURE_CUBE_MAP
    } else {
        target
    }
}

struct TextureAction;

impl TextureAction {
    fn bound(ctx: &Context, target: u32) -> Option<u32> {
        ctx.lock().bound_texture(binding_target(target))
    }
}

impl ObjectAction for TextureAction {
    fn apply(
        &self,
        _interceptor: &Interceptor,
        ctx: &Context,
        call: &CallRecord,
        _ret: Option<&Value>,
    ) -> Result<()> {
        match call.entry_point {
            EntryPoint::GlGenTextures => {
                let shared = ctx.shared();
                let access = shared.lock();
                let mut textures = access.textures();
                for name in name_array(call)? {
                    textures.ensure(name);
                }
            }
            EntryPoint::GlDeleteTextures => {
                for name in name_array(call)? {
                    ctx.delete_texture(name);
                }
            }
            EntryPoint::GlBindTexture => {
                let target = call.arg_u32(0)?;
                let name = call.arg_u32(1)?;
                if name != 0 {
                    ctx.shared().lock().textures().ensure(name).set_target(target);
                }
                ctx.lock().bind_texture(target, name);
            }
            EntryPoint::GlActiveTexture => {
                let unit = call.arg_u32(0)?;
                ctx.lock().active_texture_unit = unit.saturating_sub(GL_TEXTURE0);
            }
            EntryPoint::GlTexImage2D => {
                let target = call.arg_u32(0)?;
                let level = call.arg_i64(1)? as i32;
                let desc = LevelDesc {
                    internal_format: call.arg_u32(2)?,
                    width: call.arg_i64(3)? as i32,
                    height: call.arg_i64(4)? as i32,
                };
                if let Some(name) = Self::bound(ctx, target) {
                    ctx.shared()
                        .lock()
                        .textures()
                        .ensure(name)
                        .levels
                        .insert(level, desc);
                }
            }
            EntryPoint::GlTexStorage2D => {
                let target = call.arg_u32(0)?;
                let levels = call.arg_i64(1)?.max(0) as i32;
                let internal_format = call.arg_u32(2)?;
                let width = call.arg_i64(3)? as i32;
                let height = call.arg_i64(4)? as i32;
                if let Some(name) = Self::bound(ctx, target) {
                    let shared = ctx.shared();
                    let access = shared.lock();
                    let mut textures = access.textures();
                    let texture = textures.ensure(name);
                    texture.immutable = true;
                    texture.levels.clear();
                    for level in 0..levels {
                        texture.levels.insert(
                            level,
                            LevelDesc {
                                internal_format,
                                width: (width >> level).max(1),
                                height: (height >> level).max(1),
                            },
                        );
                    }
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
            EntryPoint::GlGenTextures,
            EntryPoint::GlDeleteTextures,
            EntryPoint::GlBindTexture,
            EntryPoint::GlActiveTexture,
            EntryPoint::GlTexImage2D,
            EntryPoint::GlTexStorage2D,
        ],
        TextureAction,
    );
}
