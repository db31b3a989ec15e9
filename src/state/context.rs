use super::namespace::{DeleteState, ObjectNamespace};
use super::objects::{
    Describe, FramebufferObj, ObjectInfo, ObjectKind, PipelineObj, ProgramObj, RenderbufferObj,
    ShaderObj,
};
use super::shared::SharedNamespace;
use crate::host::Host;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

pub const GL_NO_ERROR: u32 = 0;
pub const GL_TEXTURE0: u32 = 0x84C0;
pub const GL_FRAMEBUFFER: u32 = 0x8D40;
pub const GL_READ_FRAMEBUFFER: u32 = 0x8CA8;
pub const GL_DRAW_FRAMEBUFFER: u32 = 0x8CA9;

/// Errors kept for replay to the application's glGetError.
const MAX_PENDING_ERRORS: usize = 1000;
/// Error flags drained from the driver per peek.
const MAX_ERRORS_PER_PEEK: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Api {
    Desktop,
    Es,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextVersion {
    pub api: Api,
    pub major: u32,
}

impl ContextVersion {
    pub const DESKTOP: ContextVersion = ContextVersion {
        api: Api::Desktop,
        major: 0,
    };

    pub fn es(major: u32) -> Self {
        Self {
            api: Api::Es,
            major,
        }
    }
}

/// Per-context object names, sent with every pause notification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectInventory {
    pub textures: Vec<u32>,
    pub buffers: Vec<u32>,
    pub programs: Vec<u32>,
    pub shaders: Vec<u32>,
    pub framebuffers: Vec<u32>,
    pub renderbuffers: Vec<u32>,
    pub pipelines: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextInfo {
    pub id: u64,
    pub display: u64,
    pub version: ContextVersion,
    pub bound_threads: u32,
    pub pending_delete: bool,
    pub draw_surface: Option<u64>,
    pub read_surface: Option<u64>,
    pub objects: ObjectInventory,
}

/// Mutable state of one context, behind the context's own lock.
#[derive(Default)]
pub struct ContextState {
    pub draw_surface: Option<u64>,
    pub read_surface: Option<u64>,
    bound_threads: u32,
    delete: DeleteState,

    pub programs: ObjectNamespace<ProgramObj>,
    pub shaders: ObjectNamespace<ShaderObj>,
    pub framebuffers: ObjectNamespace<FramebufferObj>,
    pub renderbuffers: ObjectNamespace<RenderbufferObj>,
    pub pipelines: ObjectNamespace<PipelineObj>,

    pub active_texture_unit: u32,
    /// unit -> target -> texture
    texture_units: BTreeMap<u32, BTreeMap<u32, u32>>,
    buffer_bindings: BTreeMap<u32, u32>,
    framebuffer_bindings: BTreeMap<u32, u32>,
    pub renderbuffer_binding: u32,
    pub pipeline_binding: u32,
    pub current_program: u32,

    /// Driver errors consumed by peeking that the application has not fetched yet.
    pending_errors: VecDeque<u32>,
    /// Result of the driver poll for the call in flight.
    call_error: Option<u32>,
    pub immediate_mode: bool,
}

impl ContextState {
    pub fn bind_texture(&mut self, target: u32, name: u32) {
        let unit = self.texture_units.entry(self.active_texture_unit).or_default();
        if name == 0 {
            unit.remove(&target);
        } else {
            unit.insert(target, name);
        }
    }

    pub fn bound_texture(&self, target: u32) -> Option<u32> {
        self.texture_units
            .get(&self.active_texture_unit)
            .and_then(|unit| unit.get(&target))
            .copied()
    }

    pub fn texture_on_unit(&self, unit: u32, target: u32) -> Option<u32> {
        self.texture_units
            .get(&unit)
            .and_then(|u| u.get(&target))
            .copied()
    }

    /// Drops `name` from every unit and target it is bound to.
    pub fn unbind_texture_everywhere(&mut self, name: u32) {
        for unit in self.texture_units.values_mut() {
            unit.retain(|_, bound| *bound != name);
        }
    }

    pub fn bind_buffer(&mut self, target: u32, name: u32) {
        if name == 0 {
            self.buffer_bindings.remove(&target);
        } else {
            self.buffer_bindings.insert(target, name);
        }
    }

    pub fn bound_buffer(&self, target: u32) -> Option<u32> {
        self.buffer_bindings.get(&target).copied()
    }

    pub fn unbind_buffer_everywhere(&mut self, name: u32) {
        self.buffer_bindings.retain(|_, bound| *bound != name);
    }

    pub fn bind_framebuffer(&mut self, target: u32, name: u32) {
        let targets: &[u32] = if target == GL_FRAMEBUFFER {
            &[GL_DRAW_FRAMEBUFFER, GL_READ_FRAMEBUFFER]
        } else {
            &[target]
        };
        for &t in targets {
            if name == 0 {
                self.framebuffer_bindings.remove(&t);
            } else {
                self.framebuffer_bindings.insert(t, name);
            }
        }
    }

    pub fn bound_framebuffer(&self, target: u32) -> Option<u32> {
        let target = if target == GL_FRAMEBUFFER {
            GL_DRAW_FRAMEBUFFER
        } else {
            target
        };
        self.framebuffer_bindings.get(&target).copied()
    }

    pub fn delete_framebuffer(&mut self, name: u32) {
        self.framebuffers.remove(name);
        self.framebuffer_bindings.retain(|_, bound| *bound != name);
    }

    pub fn attach_shader(&mut self, program: u32, shader: u32) {
        let program = self.programs.ensure(program);
        if program.attached.insert(shader) {
            self.shaders.ensure(shader).lifetime.acquire();
        }
    }

    pub fn detach_shader(&mut self, program: u32, shader: u32) {
        let detached = self
            .programs
            .get_mut(program)
            .map_or(false, |p| p.attached.remove(&shader));
        if detached {
            self.release_shader(shader);
        }
    }

    fn release_shader(&mut self, name: u32) {
        let remove = match self.shaders.get_mut(name) {
            Some(shader) => {
                shader.lifetime.release();
                shader.lifetime.may_delete()
            }
            None => false,
        };
        if remove {
            self.shaders.remove(name);
        }
    }

    pub fn delete_shader(&mut self, name: u32) {
        let shader = self.shaders.ensure(name);
        shader.lifetime.request_delete();
        if shader.lifetime.may_delete() {
            self.shaders.remove(name);
        }
    }

    pub fn delete_program(&mut self, name: u32) {
        let program = self.programs.ensure(name);
        program.lifetime.request_delete();
        if program.lifetime.may_delete() {
            self.remove_program(name);
        }
    }

    /// Physically drops a program, detaching its shaders first.
    fn remove_program(&mut self, name: u32) {
        if let Some(program) = self.programs.remove(name) {
            for shader in program.attached.iter().copied() {
                self.release_shader(shader);
            }
        }
    }

    pub fn use_program(&mut self, name: u32) {
        let previous = self.current_program;
        if previous == name {
            return;
        }
        if previous != 0 {
            let remove = match self.programs.get_mut(previous) {
                Some(program) => {
                    program.lifetime.release();
                    program.lifetime.may_delete()
                }
                None => false,
            };
            if remove {
                self.remove_program(previous);
            }
        }
        if name != 0 {
            self.programs.ensure(name).lifetime.acquire();
        }
        self.current_program = name;
    }

    /// Error raised by the call in flight. The driver is polled once per
    /// call; every flag drained is queued for the application.
    pub fn peek_error(&mut self, host: &dyn Host) -> u32 {
        if self.immediate_mode {
            return GL_NO_ERROR;
        }
        if let Some(error) = self.call_error {
            return error;
        }

        let mut first = GL_NO_ERROR;
        for _ in 0..MAX_ERRORS_PER_PEEK {
            let error = host.get_error();
            if error == GL_NO_ERROR {
                break;
            }
            if first == GL_NO_ERROR {
                first = error;
            }
            if self.pending_errors.len() < MAX_PENDING_ERRORS {
                self.pending_errors.push_back(error);
            } else {
                log::warn!("Dropping driver error {:#x}, too many unfetched", error);
            }
        }
        self.call_error = Some(first);
        first
    }

    /// Peeks for the call in flight and closes it, so the next call polls the driver again.
    pub fn finish_call(&mut self, host: &dyn Host) -> Option<u32> {
        let error = self.peek_error(host);
        self.call_error = None;
        (error != GL_NO_ERROR).then_some(error)
    }

    /// Oldest error the application has not fetched yet.
    pub fn take_poked_error(&mut self) -> Option<u32> {
        self.pending_errors.pop_front()
    }

    pub fn bound_threads(&self) -> u32 {
        self.bound_threads
    }

    pub fn is_pending_delete(&self) -> bool {
        self.delete == DeleteState::PendingDelete
    }
}

/// Driver debug messages waiting for the next post-call, plus the
/// application's own callback. Kept apart from [`ContextState`] because the
/// driver may call back while that lock is held.
#[derive(Debug, Default)]
pub struct DebugOutput {
    messages: VecDeque<String>,
    /// Application callback and its user pointer.
    pub app_callback: Option<(u64, u64)>,
}

impl DebugOutput {
    pub fn push(&mut self, message: String) {
        self.messages.push_back(message);
    }

    /// Drains queued messages into one newline-separated string.
    pub fn pop(&mut self) -> Option<String> {
        if self.messages.is_empty() {
            return None;
        }
        let text: Vec<String> = self.messages.drain(..).collect();
        Some(text.join("\n"))
    }
}

/// Shadow of one native rendering context.
pub struct Context {
    id: u64,
    display: u64,
    version: ContextVersion,
    attributes: Vec<(i32, i32)>,
    shared: Mutex<Arc<SharedNamespace>>,
    state: Mutex<ContextState>,
    debug_output: Mutex<DebugOutput>,
}

impl Context {
    pub fn new(
        id: u64,
        display: u64,
        version: ContextVersion,
        attributes: Vec<(i32, i32)>,
        shared: Arc<SharedNamespace>,
    ) -> Self {
        Self {
            id,
            display,
            version,
            attributes,
            shared: Mutex::new(shared),
            state: Mutex::new(ContextState::default()),
            debug_output: Mutex::new(DebugOutput::default()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn display(&self) -> u64 {
        self.display
    }

    pub fn version(&self) -> ContextVersion {
        self.version
    }

    pub fn attributes(&self) -> &[(i32, i32)] {
        &self.attributes
    }

    pub fn lock(&self) -> MutexGuard<'_, ContextState> {
        self.state.lock()
    }

    pub fn debug_output(&self) -> MutexGuard<'_, DebugOutput> {
        self.debug_output.lock()
    }

    pub fn shared(&self) -> Arc<SharedNamespace> {
        Arc::clone(&self.shared.lock())
    }

    pub fn set_shared(&self, shared: Arc<SharedNamespace>) {
        *self.shared.lock() = shared;
    }

    pub fn shares_with(&self, other: &Context) -> bool {
        Arc::ptr_eq(&self.shared(), &other.shared())
    }

    /// Returns true when the context may be dropped right away.
    pub fn request_delete(&self) -> bool {
        let mut state = self.lock();
        state.delete = DeleteState::PendingDelete;
        state.bound_threads == 0
    }

    pub fn bind_thread(&self, draw: Option<u64>, read: Option<u64>) {
        let mut state = self.lock();
        state.bound_threads += 1;
        state.draw_surface = draw;
        state.read_surface = read;
    }

    pub fn set_surfaces(&self, draw: Option<u64>, read: Option<u64>) {
        let mut state = self.lock();
        state.draw_surface = draw;
        state.read_surface = read;
    }

    /// Returns true when this was the last binding of a context pending deletion.
    pub fn unbind_thread(&self) -> bool {
        let mut state = self.lock();
        state.bound_threads = state.bound_threads.saturating_sub(1);
        state.bound_threads == 0 && state.delete == DeleteState::PendingDelete
    }

    pub fn delete_texture(&self, name: u32) {
        self.shared().lock().textures().remove(name);
        self.lock().unbind_texture_everywhere(name);
    }

    pub fn delete_buffer(&self, name: u32) {
        self.shared().lock().buffers().remove(name);
        self.lock().unbind_buffer_everywhere(name);
    }

    pub fn describe_object(&self, kind: ObjectKind, name: u32) -> Option<ObjectInfo> {
        let shared = self.shared();
        let access = shared.lock();
        let state = self.lock();
        let info = match kind {
            ObjectKind::Texture => access.textures().get(name).map(|o| o.describe()),
            ObjectKind::Buffer => access.buffers().get(name).map(|o| o.describe()),
            ObjectKind::Program => state.programs.get(name).map(|o| o.describe()),
            ObjectKind::Shader => state.shaders.get(name).map(|o| o.describe()),
            ObjectKind::Framebuffer => state.framebuffers.get(name).map(|o| o.describe()),
            ObjectKind::Renderbuffer => state.renderbuffers.get(name).map(|o| o.describe()),
            ObjectKind::Pipeline => state.pipelines.get(name).map(|o| o.describe()),
        };
        info
    }

    pub fn describe(&self) -> ContextInfo {
        let shared = self.shared();
        let access = shared.lock();
        let state = self.lock();
        let textures = access.textures().names();
        let buffers = access.buffers().names();
        let objects = ObjectInventory {
            textures,
            buffers,
            programs: state.programs.names(),
            shaders: state.shaders.names(),
            framebuffers: state.framebuffers.names(),
            renderbuffers: state.renderbuffers.names(),
            pipelines: state.pipelines.names(),
        };
        ContextInfo {
            id: self.id,
            display: self.display,
            version: self.version,
            bound_threads: state.bound_threads,
            pending_delete: state.is_pending_delete(),
            draw_surface: state.draw_surface,
            read_surface: state.read_surface,
            objects,
        }
    }
}
