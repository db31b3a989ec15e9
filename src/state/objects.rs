use super::namespace::{Lifetime, ShadowObject};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Texture,
    Buffer,
    Program,
    Shader,
    Framebuffer,
    Renderbuffer,
    Pipeline,
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Texture => "texture",
            ObjectKind::Buffer => "buffer",
            ObjectKind::Program => "program",
            ObjectKind::Shader => "shader",
            ObjectKind::Framebuffer => "framebuffer",
            ObjectKind::Renderbuffer => "renderbuffer",
            ObjectKind::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

/// Summary of one shadow record, as sent to the debugger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub kind: ObjectKind,
    pub name: u32,
    pub details: Json,
}

pub trait Describe {
    fn describe(&self) -> ObjectInfo;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LevelDesc {
    pub internal_format: u32,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug)]
pub struct TextureObj {
    pub name: u32,
    pub target: Option<u32>,
    pub immutable: bool,
    pub levels: BTreeMap<i32, LevelDesc>,
}

impl ShadowObject for TextureObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            target: None,
            immutable: false,
            levels: BTreeMap::new(),
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl TextureObj {
    /// The first bind fixes the target; later binds to another target are driver errors.
    pub fn set_target(&mut self, target: u32) {
        if self.target.is_none() {
            self.target = Some(target);
        }
    }
}

impl Describe for TextureObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Texture,
            name: self.name,
            details: json!({
                "target": self.target,
                "immutable": self.immutable,
                "levels": self.levels,
            }),
        }
    }
}

#[derive(Debug)]
pub struct BufferObj {
    pub name: u32,
    pub target: Option<u32>,
    pub size: i64,
    pub usage: Option<u32>,
}

impl ShadowObject for BufferObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            target: None,
            size: 0,
            usage: None,
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl Describe for BufferObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Buffer,
            name: self.name,
            details: json!({
                "target": self.target,
                "size": self.size,
                "usage": self.usage,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub kind: ObjectKind,
    pub name: u32,
    pub level: i32,
}

#[derive(Debug)]
pub struct FramebufferObj {
    pub name: u32,
    pub target: Option<u32>,
    pub attachments: BTreeMap<u32, Attachment>,
}

impl ShadowObject for FramebufferObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            target: None,
            attachments: BTreeMap::new(),
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl FramebufferObj {
    pub fn attach(&mut self, point: u32, attachment: Option<Attachment>) {
        match attachment {
            Some(a) => {
                self.attachments.insert(point, a);
            }
            None => {
                self.attachments.remove(&point);
            }
        }
    }
}

impl Describe for FramebufferObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Framebuffer,
            name: self.name,
            details: json!({
                "target": self.target,
                "attachments": self.attachments,
            }),
        }
    }
}

#[derive(Debug)]
pub struct RenderbufferObj {
    pub name: u32,
    pub target: Option<u32>,
    pub storage: Option<LevelDesc>,
}

impl ShadowObject for RenderbufferObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            target: None,
            storage: None,
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl Describe for RenderbufferObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Renderbuffer,
            name: self.name,
            details: json!({
                "target": self.target,
                "storage": self.storage,
            }),
        }
    }
}

#[derive(Debug)]
pub struct ShaderObj {
    pub name: u32,
    pub shader_type: Option<u32>,
    pub source: Option<String>,
    pub edited_source: Option<String>,
    pub compile_status: Option<bool>,
    /// Counts programs the shader is attached to.
    pub lifetime: Lifetime,
}

impl ShadowObject for ShaderObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            shader_type: None,
            source: None,
            edited_source: None,
            compile_status: None,
            lifetime: Lifetime::default(),
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl ShaderObj {
    /// Source the driver is currently compiling from.
    pub fn active_source(&self) -> Option<&str> {
        self.edited_source.as_deref().or(self.source.as_deref())
    }
}

impl Describe for ShaderObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Shader,
            name: self.name,
            details: json!({
                "type": self.shader_type,
                "source": self.source,
                "edited_source": self.edited_source,
                "compile_status": self.compile_status,
                "ref_count": self.lifetime.ref_count(),
                "delete_requested": self.lifetime.is_delete_requested(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct ProgramObj {
    pub name: u32,
    pub attached: BTreeSet<u32>,
    pub link_status: Option<bool>,
    /// Counts contexts using the program as current.
    pub lifetime: Lifetime,
}

impl ShadowObject for ProgramObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            attached: BTreeSet::new(),
            link_status: None,
            lifetime: Lifetime::default(),
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl Describe for ProgramObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Program,
            name: self.name,
            details: json!({
                "attached_shaders": self.attached,
                "link_status": self.link_status,
                "ref_count": self.lifetime.ref_count(),
                "delete_requested": self.lifetime.is_delete_requested(),
            }),
        }
    }
}

#[derive(Debug)]
pub struct PipelineObj {
    pub name: u32,
    /// Stage bitfield to program name.
    pub stages: BTreeMap<u32, u32>,
}

impl ShadowObject for PipelineObj {
    fn new(name: u32) -> Self {
        Self {
            name,
            stages: BTreeMap::new(),
        }
    }

    fn name(&self) -> u32 {
        self.name
    }
}

impl Describe for PipelineObj {
    fn describe(&self) -> ObjectInfo {
        ObjectInfo {
            kind: ObjectKind::Pipeline,
            name: self.name,
            details: json!({ "stages": self.stages }),
        }
    }
}
