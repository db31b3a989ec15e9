mod context;
mod display;
mod namespace;
mod objects;
mod shared;
pub mod thread;

pub use context::{
    Api, Context, ContextInfo, ContextState, ContextVersion, DebugOutput, ObjectInventory,
    GL_DRAW_FRAMEBUFFER, GL_FRAMEBUFFER, GL_NO_ERROR, GL_READ_FRAMEBUFFER, GL_TEXTURE0,
};
pub use display::{Display, DisplayRegistry, Surface, DEFAULT_DISPLAY};
pub use namespace::{DeleteState, Lifetime, ObjectNamespace, ShadowObject, FAST_NAMES};
pub use objects::{
    Attachment, BufferObj, Describe, FramebufferObj, LevelDesc, ObjectInfo, ObjectKind,
    PipelineObj, ProgramObj, RenderbufferObj, ShaderObj, TextureObj,
};
pub use shared::{SharedAccess, SharedNamespace};
