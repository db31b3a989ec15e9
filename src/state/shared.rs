use super::namespace::ObjectNamespace;
use super::objects::{BufferObj, TextureObj};
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use std::cell::{RefCell, RefMut};
use std::sync::Arc;

#[derive(Default)]
pub struct SharedObjects {
    textures: ObjectNamespace<TextureObj>,
    buffers: ObjectNamespace<BufferObj>,
}

/// Object tables owned by a whole share group.
///
/// Every context of the group holds an `Arc` to it; the tables go away with
/// the last context.
#[derive(Default)]
pub struct SharedNamespace {
    objects: ReentrantMutex<RefCell<SharedObjects>>,
}

impl SharedNamespace {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Locks the tables. The same thread may lock again while holding an access.
    pub fn lock(&self) -> SharedAccess<'_> {
        SharedAccess {
            guard: self.objects.lock(),
        }
    }
}

/// Scoped access to the shared tables; cannot outlive the lock.
pub struct SharedAccess<'a> {
    guard: ReentrantMutexGuard<'a, RefCell<SharedObjects>>,
}

impl SharedAccess<'_> {
    pub fn textures(&self) -> RefMut<'_, ObjectNamespace<TextureObj>> {
        RefMut::map(self.guard.borrow_mut(), |o| &mut o.textures)
    }

    pub fn buffers(&self) -> RefMut<'_, ObjectNamespace<BufferObj>> {
        RefMut::map(self.guard.borrow_mut(), |o| &mut o.buffers)
    }
}
