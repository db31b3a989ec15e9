mod common;

use common::*;
use gl_debug_wrapper::state::{thread, ObjectKind};
use gl_debug_wrapper::{CallRecord, Config, EntryPoint, Next, Result, Stage, Value};
use std::os::raw::{c_char, c_void};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const GL_TEXTURE_2D: u64 = 0x0DE1;
const GL_TEXTURE0: u64 = 0x84C0;
const GL_INVALID_ENUM: u32 = 0x0500;
const GL_INVALID_OPERATION: u32 = 0x0502;

fn bind_texture(h: &Harness, name: u32) {
    call(
        &h.interceptor,
        EntryPoint::GlBindTexture,
        vec![Value::UInt(GL_TEXTURE_2D), Value::UInt(name as u64)],
    );
}

#[cfg(test)]
mod shadow_tests {
    use super::*;

    #[test]
    fn test_share_group_shares_textures_only() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0xA, 0);
        create_context(&h.interceptor, 0xB, 0xA);

        make_current(&h.interceptor, 0xA);
        gen_names(&h.interceptor, EntryPoint::GlGenTextures, &[4]);
        bind_texture(&h, 4);
        call_returning(
            &h.interceptor,
            EntryPoint::GlCreateProgram,
            Vec::new(),
            Value::UInt(9),
        );

        let display = h.interceptor.displays().get(DISPLAY);
        let a = display.get_context(0xA).expect("context A");
        let b = display.get_context(0xB).expect("context B");
        assert!(a.shares_with(&b), "B was created sharing with A");

        let seen_from_b = b
            .describe_object(ObjectKind::Texture, 4)
            .expect("texture visible through the share group");
        assert_eq!(seen_from_b.details["target"], GL_TEXTURE_2D);
        assert!(a.describe_object(ObjectKind::Program, 9).is_some());
        assert!(
            b.describe_object(ObjectKind::Program, 9).is_none(),
            "Programs stay per context"
        );

        make_current(&h.interceptor, 0);
    }

    #[test]
    fn test_context_deleted_after_last_unbind() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0xC, 0);
        make_current(&h.interceptor, 0xC);

        call_returning(
            &h.interceptor,
            EntryPoint::EglDestroyContext,
            vec![Value::Ptr(DISPLAY), Value::Ptr(0xC)],
            Value::UInt(1),
        );
        let display = h.interceptor.displays().get(DISPLAY);
        let ctx = display.get_context(0xC).expect("still current, so still alive");
        assert!(ctx.describe().pending_delete);

        make_current(&h.interceptor, 0);
        assert!(display.get_context(0xC).is_none(), "Removed once released");
        assert_eq!(thread::current_context_id(), 0);
    }

    #[test]
    fn test_rebinding_current_context_keeps_shadow() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0x21, 0);
        make_current(&h.interceptor, 0x21);
        call_returning(
            &h.interceptor,
            EntryPoint::GlCreateProgram,
            Vec::new(),
            Value::UInt(3),
        );
        call_returning(
            &h.interceptor,
            EntryPoint::EglDestroyContext,
            vec![Value::Ptr(DISPLAY), Value::Ptr(0x21)],
            Value::UInt(1),
        );

        make_current(&h.interceptor, 0x21);
        let display = h.interceptor.displays().get(DISPLAY);
        let ctx = display.get_context(0x21).expect("still current");
        assert!(ctx.describe_object(ObjectKind::Program, 3).is_some());
        assert!(ctx.describe().pending_delete, "Delete request survives the rebind");

        make_current(&h.interceptor, 0);
        assert!(display.get_context(0x21).is_none());
    }

    #[test]
    fn test_describe_all_with_shared_objects() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0x11, 0);
        make_current(&h.interceptor, 0x11);
        gen_names(&h.interceptor, EntryPoint::GlGenTextures, &[1]);
        gen_names(&h.interceptor, EntryPoint::GlGenBuffers, &[2]);

        let contexts = h.interceptor.displays().describe_all();
        assert_eq!(contexts.len(), 1);
        assert_eq!(contexts[0].objects.textures, vec![1]);
        assert_eq!(contexts[0].objects.buffers, vec![2]);

        make_current(&h.interceptor, 0);
    }

    #[test]
    fn test_unfetched_error_does_not_hide_later_calls() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0x12, 0);
        make_current(&h.interceptor, 0x12);

        h.driver.push_error(GL_INVALID_ENUM);
        call(&h.interceptor, EntryPoint::GlEnable, vec![Value::UInt(0xFFFF)]);
        gen_names(&h.interceptor, EntryPoint::GlGenTextures, &[4]);
        let ctx = thread::current_context().expect("current context");
        assert!(
            ctx.describe_object(ObjectKind::Texture, 4).is_some(),
            "Later successful call still updates the shadow"
        );

        h.driver.push_error(0x0501);
        call(&h.interceptor, EntryPoint::GlViewport, Vec::new());
        let last = h.interceptor.controller().history().last().cloned();
        assert_eq!(last.and_then(|r| r.error), Some(0x0501));

        let replayed: Vec<Value> = (0..3)
            .map(|_| {
                call_returning(
                    &h.interceptor,
                    EntryPoint::GlGetError,
                    Vec::new(),
                    Value::UInt(0),
                )
            })
            .collect();
        assert_eq!(
            replayed,
            vec![
                Value::UInt(GL_INVALID_ENUM as u64),
                Value::UInt(0x0501),
                Value::UInt(0)
            ]
        );

        make_current(&h.interceptor, 0);
    }

    #[test]
    fn test_deleting_bound_texture_clears_every_unit() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0xD, 0);
        make_current(&h.interceptor, 0xD);
        gen_names(&h.interceptor, EntryPoint::GlGenTextures, &[1, 2]);

        bind_texture(&h, 1);
        call(
            &h.interceptor,
            EntryPoint::GlActiveTexture,
            vec![Value::UInt(GL_TEXTURE0 + 3)],
        );
        bind_texture(&h, 1);

        let ctx = thread::current_context().expect("current context");
        assert_eq!(ctx.lock().texture_on_unit(0, GL_TEXTURE_2D as u32), Some(1));
        assert_eq!(ctx.lock().texture_on_unit(3, GL_TEXTURE_2D as u32), Some(1));

        let names = [1u32];
        call(
            &h.interceptor,
            EntryPoint::GlDeleteTextures,
            vec![Value::Int(1), Value::Ptr(names.as_ptr() as u64)],
        );
        assert_eq!(ctx.lock().texture_on_unit(0, GL_TEXTURE_2D as u32), None);
        assert_eq!(ctx.lock().texture_on_unit(3, GL_TEXTURE_2D as u32), None);
        assert!(ctx.describe_object(ObjectKind::Texture, 1).is_none());
        assert!(ctx.describe_object(ObjectKind::Texture, 2).is_some());

        make_current(&h.interceptor, 0);
    }

    #[test]
    fn test_get_error_replays_peeked_error_once() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0xE, 0);
        make_current(&h.interceptor, 0xE);

        h.driver.push_error(GL_INVALID_ENUM);
        bind_texture(&h, 7);

        let ctx = thread::current_context().expect("current context");
        assert_eq!(
            ctx.lock().bound_texture(GL_TEXTURE_2D as u32),
            None,
            "Failed call leaves the shadow alone"
        );
        {
            let history = h.interceptor.controller().history();
            let last = history.last().expect("recorded");
            assert_eq!(last.entry_point, EntryPoint::GlBindTexture);
            assert_eq!(last.error, Some(GL_INVALID_ENUM));
        }

        let first = call_returning(
            &h.interceptor,
            EntryPoint::GlGetError,
            Vec::new(),
            Value::UInt(0),
        );
        assert_eq!(first, Value::UInt(GL_INVALID_ENUM as u64));

        let second = call_returning(
            &h.interceptor,
            EntryPoint::GlGetError,
            Vec::new(),
            Value::UInt(0),
        );
        assert_eq!(second, Value::UInt(0), "Falls through to the driver afterwards");

        make_current(&h.interceptor, 0);
    }

    #[test]
    fn test_error_attached_to_raising_call_only() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0xF, 0);
        make_current(&h.interceptor, 0xF);

        h.driver.push_error(GL_INVALID_OPERATION);
        call(&h.interceptor, EntryPoint::GlEnable, vec![Value::UInt(0x0B71)]);
        call(&h.interceptor, EntryPoint::GlFlush, Vec::new());

        let history = h.interceptor.controller().history();
        let records = history.query(0, 2);
        assert_eq!(records[0].entry_point, EntryPoint::GlEnable);
        assert_eq!(records[0].error, Some(GL_INVALID_OPERATION));
        assert_eq!(records[1].entry_point, EntryPoint::GlFlush);
        assert_eq!(records[1].error, None, "Reported with the call that raised it");
        drop(history);

        make_current(&h.interceptor, 0);
    }

    #[test]
    fn test_errors_not_polled_between_begin_and_end() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0x10, 0);
        make_current(&h.interceptor, 0x10);

        call(&h.interceptor, EntryPoint::GlBegin, vec![Value::UInt(4)]);
        h.driver.push_error(GL_INVALID_OPERATION);
        call(
            &h.interceptor,
            EntryPoint::GlVertex3f,
            vec![Value::Float(0.0), Value::Float(1.0), Value::Float(0.0)],
        );
        assert_eq!(
            h.interceptor.controller().history().last().and_then(|r| r.error),
            None
        );

        call(&h.interceptor, EntryPoint::GlEnd, Vec::new());
        let last = h.interceptor.controller().history().last().cloned();
        let last = last.expect("glEnd recorded");
        assert_eq!(last.entry_point, EntryPoint::GlEnd);
        assert_eq!(last.error, Some(GL_INVALID_OPERATION));

        make_current(&h.interceptor, 0);
    }
}

#[cfg(test)]
mod proc_address_tests {
    use super::*;

    fn lookup(h: &Harness, name: &str, real: u64) -> Value {
        call_returning(
            &h.interceptor,
            EntryPoint::EglGetProcAddress,
            vec![Value::Str(name.to_string())],
            Value::Ptr(real),
        )
    }

    #[test]
    fn test_known_names_resolve_to_wrappers() {
        let h = harness(Config::default());
        let expected = 0x1000 + EntryPoint::GlDrawArrays.index() as u64;
        assert_eq!(lookup(&h, "glDrawArrays", 0x4444), Value::Ptr(expected));
    }

    #[test]
    fn test_missing_driver_entry_point_resolves_null() {
        let h = harness(Config::default());
        h.driver.remove_entry_point(EntryPoint::GlTexStorage2D);
        assert_eq!(lookup(&h, "glTexStorage2D", 0x4444), Value::Ptr(0));
    }

    #[test]
    fn test_unknown_names_pass_through() {
        let h = harness(Config::default());
        assert_eq!(lookup(&h, "glFancyVendorThing", 0x4444), Value::Ptr(0x4444));
    }
}

struct Counting {
    pre: AtomicUsize,
    post: AtomicUsize,
}

impl Stage for Counting {
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        self.pre.fetch_add(1, Ordering::SeqCst);
        next.pre(call)
    }

    fn post(&self, call: &CallRecord, ret: Option<&Value>, next: Next<'_>) -> Result<()> {
        self.post.fetch_add(1, Ordering::SeqCst);
        next.post(call, ret)
    }
}

/// Issues a nested glFlush from inside its own pre-hook.
struct Nesting;

impl Stage for Nesting {
    fn pre(&self, call: &CallRecord, next: Next<'_>) -> Result<Option<Value>> {
        let interceptor = next.interceptor();
        interceptor.call(&CallRecord::new(EntryPoint::GlFlush, Vec::new()), |_| {
            Value::Void
        });
        next.pre(call)
    }
}

#[cfg(test)]
mod chain_tests {
    use super::*;

    #[test]
    fn test_registered_stage_wraps_default() {
        let h = harness(Config::default());
        let counting = Arc::new(Counting {
            pre: AtomicUsize::new(0),
            post: AtomicUsize::new(0),
        });
        h.interceptor
            .register(EntryPoint::GlClear, Arc::clone(&counting) as Arc<dyn Stage>);

        call(&h.interceptor, EntryPoint::GlClear, vec![Value::UInt(0x4000)]);
        call(&h.interceptor, EntryPoint::GlClear, vec![Value::UInt(0x4000)]);

        assert_eq!(counting.pre.load(Ordering::SeqCst), 2);
        assert_eq!(counting.post.load(Ordering::SeqCst), 2);
        assert_eq!(
            h.interceptor.controller().history().len(),
            2,
            "Default stage still ran once per call"
        );
    }

    #[test]
    fn test_nested_calls_bypass_the_chain() {
        let h = harness(Config::default());
        h.interceptor
            .register(EntryPoint::GlFinish, Arc::new(Nesting));

        call(&h.interceptor, EntryPoint::GlFinish, Vec::new());

        let history = h.interceptor.controller().history();
        assert_eq!(history.len(), 1, "Nested glFlush is not recorded");
        assert_eq!(
            history.last().map(|r| r.entry_point),
            Some(EntryPoint::GlFinish)
        );
        drop(history);

        call(&h.interceptor, EntryPoint::GlFlush, Vec::new());
        assert_eq!(h.interceptor.controller().history().len(), 2);
    }
}

static APP_MESSAGES: AtomicUsize = AtomicUsize::new(0);

extern "system" fn app_callback(
    _source: u32,
    _kind: u32,
    _id: u32,
    _severity: u32,
    _length: i32,
    _message: *const c_char,
    user_param: *const c_void,
) {
    assert_eq!(user_param as usize, 0xAB);
    APP_MESSAGES.fetch_add(1, Ordering::SeqCst);
}

#[cfg(test)]
mod debug_output_tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn test_driver_messages_reach_record_and_application() {
        let h = harness(Config::default());
        create_context(&h.interceptor, 0x20, 0);
        make_current(&h.interceptor, 0x20);

        let ret = call_returning(
            &h.interceptor,
            EntryPoint::GlDebugMessageCallback,
            vec![Value::Ptr(app_callback as usize as u64), Value::Ptr(0xAB)],
            Value::UInt(0xDEAD),
        );
        assert_eq!(ret, Value::Void, "Real call replaced by the wrapper's");
        let installed = h.driver.debug_callback.lock().expect("wrapper callback installed");

        let message = CString::new("shader recompiled").unwrap();
        let before = APP_MESSAGES.load(Ordering::SeqCst);
        call_returning(
            &h.interceptor,
            EntryPoint::GlDrawArrays,
            vec![Value::UInt(4), Value::Int(0), Value::Int(3)],
            Value::Void,
        );
        // The driver reports after the fact; emulate it from inside a call.
        let ret = h.interceptor.call(
            &CallRecord::new(EntryPoint::GlFinish, Vec::new()),
            |_| {
                installed(0x8246, 0x824C, 1, 0x9146, -1, message.as_ptr(), std::ptr::null());
                Value::Void
            },
        );
        assert_eq!(ret, Value::Void);

        assert_eq!(APP_MESSAGES.load(Ordering::SeqCst), before + 1);
        let last = h.interceptor.controller().history().last().cloned();
        let last = last.expect("glFinish recorded");
        assert_eq!(last.entry_point, EntryPoint::GlFinish);
        assert_eq!(last.debug_output.as_deref(), Some("shader recompiled"));

        make_current(&h.interceptor, 0);
    }
}
