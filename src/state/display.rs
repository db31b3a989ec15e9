use super::context::{Context, ContextInfo, ContextVersion};
use super::shared::SharedNamespace;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Display id used by window-system APIs that have no display handle.
pub const DEFAULT_DISPLAY: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub id: u64,
    pub config: Option<u64>,
}

/// One native display with its contexts and surfaces.
pub struct Display {
    id: u64,
    contexts: Mutex<HashMap<u64, Arc<Context>>>,
    surfaces: Mutex<HashMap<u64, Arc<Surface>>>,
}

impl Display {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            contexts: Mutex::new(HashMap::new()),
            surfaces: Mutex::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the shadow for `id`, creating it on first sight. A new context
    /// joins the share group of `share` when that context is known.
    pub fn ensure_context(
        &self,
        id: u64,
        version: ContextVersion,
        share: Option<u64>,
        attributes: Vec<(i32, i32)>,
    ) -> Arc<Context> {
        let mut contexts = self.contexts.lock();
        if let Some(existing) = contexts.get(&id) {
            return Arc::clone(existing);
        }

        let shared = match share.filter(|&s| s != 0) {
            Some(share_id) => match contexts.get(&share_id) {
                Some(share_ctx) => share_ctx.shared(),
                None => {
                    log::warn!(
                        "Context {:#x} shares with unknown context {:#x}",
                        id,
                        share_id
                    );
                    SharedNamespace::new()
                }
            },
            None => SharedNamespace::new(),
        };

        log::debug!("New context {:#x} on display {:#x}", id, self.id);
        let ctx = Arc::new(Context::new(id, self.id, version, attributes, shared));
        contexts.insert(id, Arc::clone(&ctx));
        ctx
    }

    pub fn get_context(&self, id: u64) -> Option<Arc<Context>> {
        self.contexts.lock().get(&id).cloned()
    }

    /// Deletes now if no thread has the context current, otherwise marks it
    /// and leaves the removal to the last unbind.
    pub fn lazy_delete_context(&self, id: u64) {
        let ctx = match self.get_context(id) {
            Some(ctx) => ctx,
            None => return,
        };
        if ctx.request_delete() {
            self.remove_context(id);
        } else {
            log::debug!("Context {:#x} still current, deleting on unbind", id);
        }
    }

    pub fn remove_context(&self, id: u64) {
        if self.contexts.lock().remove(&id).is_some() {
            log::debug!("Context {:#x} deleted", id);
        }
    }

    pub fn contexts(&self) -> Vec<Arc<Context>> {
        let mut contexts: Vec<_> = self.contexts.lock().values().cloned().collect();
        contexts.sort_by_key(|c| c.id());
        contexts
    }

    pub fn add_surface(&self, id: u64, config: Option<u64>) -> Arc<Surface> {
        let surface = Arc::new(Surface { id, config });
        self.surfaces.lock().insert(id, Arc::clone(&surface));
        surface
    }

    pub fn ensure_surface(&self, id: u64) -> Arc<Surface> {
        let mut surfaces = self.surfaces.lock();
        Arc::clone(
            surfaces
                .entry(id)
                .or_insert_with(|| Arc::new(Surface { id, config: None })),
        )
    }

    pub fn get_surface(&self, id: u64) -> Option<Arc<Surface>> {
        self.surfaces.lock().get(&id).cloned()
    }

    pub fn remove_surface(&self, id: u64) {
        self.surfaces.lock().remove(&id);
    }
}

/// All displays seen so far. Displays are never torn down.
#[derive(Default)]
pub struct DisplayRegistry {
    displays: Mutex<HashMap<u64, Arc<Display>>>,
}

impl DisplayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u64) -> Arc<Display> {
        let mut displays = self.displays.lock();
        Arc::clone(
            displays
                .entry(id)
                .or_insert_with(|| Arc::new(Display::new(id))),
        )
    }

    pub fn default_display(&self) -> Arc<Display> {
        self.get(DEFAULT_DISPLAY)
    }

    pub fn displays(&self) -> Vec<Arc<Display>> {
        let mut displays: Vec<_> = self.displays.lock().values().cloned().collect();
        displays.sort_by_key(|d| d.id());
        displays
    }

    pub fn find_context(&self, id: u64) -> Option<Arc<Context>> {
        self.displays()
            .iter()
            .find_map(|display| display.get_context(id))
    }

    pub fn describe_all(&self) -> Vec<ContextInfo> {
        self.displays()
            .iter()
            .flat_map(|display| display.contexts())
            .map(|ctx| ctx.describe())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_created_once() {
        let registry = DisplayRegistry::new();
        let a = registry.get(7);
        let b = registry.get(7);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.displays().len(), 1);
    }

    #[test]
    fn test_share_group_shares_textures_not_programs() {
        let registry = DisplayRegistry::new();
        let display = registry.get(1);
        let first = display.ensure_context(0x10, ContextVersion::DESKTOP, None, Vec::new());
        let second = display.ensure_context(0x20, ContextVersion::DESKTOP, Some(0x10), Vec::new());
        let loner = display.ensure_context(0x30, ContextVersion::DESKTOP, None, Vec::new());

        assert!(first.shares_with(&second));
        assert!(!first.shares_with(&loner));

        let shared = first.shared();
        let access = shared.lock();
        let via_first = access.textures().ensure(1) as *const _;
        drop(access);
        let shared = second.shared();
        let access = shared.lock();
        let via_second = access.textures().ensure(1) as *const _;
        drop(access);
        assert_eq!(via_first, via_second);

        let p1 = first.lock().programs.ensure(1) as *const _;
        let p2 = second.lock().programs.ensure(1) as *const _;
        assert_ne!(p1, p2);
    }

    #[test]
    fn test_ensure_context_is_idempotent() {
        let display = Display::new(0);
        let a = display.ensure_context(5, ContextVersion::es(2), None, Vec::new());
        let b = display.ensure_context(5, ContextVersion::DESKTOP, None, Vec::new());
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(b.version(), ContextVersion::es(2));
    }

    #[test]
    fn test_unbound_context_deleted_immediately() {
        let display = Display::new(0);
        display.ensure_context(5, ContextVersion::DESKTOP, None, Vec::new());
        display.lazy_delete_context(5);
        assert!(display.get_context(5).is_none());
        display.lazy_delete_context(5);
    }

    #[test]
    fn test_surfaces() {
        let display = Display::new(0);
        display.add_surface(3, Some(9));
        assert_eq!(display.ensure_surface(3).config, Some(9));
        assert_eq!(display.ensure_surface(4).config, None);
        display.remove_surface(3);
        assert!(display.get_surface(3).is_none());
    }
}
