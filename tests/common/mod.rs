#![allow(dead_code)]

use gl_debug_wrapper::host::DebugProc;
use gl_debug_wrapper::net::{MemoryConnector, MemoryEndpoint};
use gl_debug_wrapper::{CallRecord, Config, EntryPoint, Error, Host, Interceptor, Result, Value};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TIMEOUT: Duration = Duration::from_secs(10);

pub const DISPLAY: u64 = 0xD15;
pub const SURFACE: u64 = 0x5F;

/// Scripted stand-in for the real driver.
#[derive(Default)]
pub struct FakeDriver {
    errors: Mutex<VecDeque<u32>>,
    missing: Mutex<HashSet<EntryPoint>>,
    failing_shaders: Mutex<HashSet<u32>>,
    failing_programs: Mutex<HashSet<u32>>,
    pub compiled: Mutex<Vec<(u32, String)>>,
    pub linked: Mutex<Vec<u32>>,
    pub debug_callback: Mutex<Option<DebugProc>>,
    pub terminated: AtomicBool,
}

impl FakeDriver {
    pub fn push_error(&self, error: u32) {
        self.errors.lock().push_back(error);
    }

    pub fn remove_entry_point(&self, entry_point: EntryPoint) {
        self.missing.lock().insert(entry_point);
    }

    pub fn fail_shader(&self, shader: u32) {
        self.failing_shaders.lock().insert(shader);
    }

    pub fn fail_program(&self, program: u32) {
        self.failing_programs.lock().insert(program);
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Host for FakeDriver {
    fn wrapper_pointer(&self, entry_point: EntryPoint) -> u64 {
        0x1000 + entry_point.index() as u64
    }

    fn ensure_pointer(&self, entry_point: EntryPoint) -> Result<u64> {
        if self.missing.lock().contains(&entry_point) {
            Err(Error::Internal(format!("{} missing", entry_point)))
        } else {
            Ok(0x9000 + entry_point.index() as u64)
        }
    }

    fn get_error(&self) -> u32 {
        self.errors.lock().pop_front().unwrap_or(0)
    }

    fn shader_compile_status(&self, shader: u32) -> bool {
        !self.failing_shaders.lock().contains(&shader)
    }

    fn program_link_status(&self, program: u32) -> bool {
        !self.failing_programs.lock().contains(&program)
    }

    fn compile_shader(&self, shader: u32, source: &str) -> Result<()> {
        self.compiled.lock().push((shader, source.to_string()));
        Ok(())
    }

    fn link_program(&self, program: u32) -> Result<()> {
        self.linked.lock().push(program);
        Ok(())
    }

    fn install_debug_callback(&self, _entry_point: EntryPoint, callback: DebugProc, _user_param: u64) {
        *self.debug_callback.lock() = Some(callback);
    }

    fn terminate_process(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    fn fatal(&self, message: &str) {
        panic!("fatal wrapper error: {}", message);
    }
}

pub struct Harness {
    pub interceptor: Arc<Interceptor>,
    pub driver: Arc<FakeDriver>,
    pub connector: MemoryConnector,
}

pub fn harness(config: Config) -> Harness {
    let (endpoint, connector) = MemoryEndpoint::new();
    let driver = Arc::new(FakeDriver::default());
    let interceptor = Arc::new(Interceptor::new(
        config,
        Arc::clone(&driver) as Arc<dyn Host>,
        Box::new(endpoint),
    ));
    Harness {
        interceptor,
        driver,
        connector,
    }
}

/// Intercepted call whose real implementation returns `ret`.
pub fn call_returning(
    interceptor: &Interceptor,
    entry_point: EntryPoint,
    args: Vec<Value>,
    ret: Value,
) -> Value {
    interceptor.call(&CallRecord::new(entry_point, args), |_| ret)
}

pub fn call(interceptor: &Interceptor, entry_point: EntryPoint, args: Vec<Value>) -> Value {
    call_returning(interceptor, entry_point, args, Value::Void)
}

pub fn create_context(interceptor: &Interceptor, context: u64, share: u64) {
    let attribs = [0x3098i32, 3, 0x3038];
    call_returning(
        interceptor,
        EntryPoint::EglCreateContext,
        vec![
            Value::Ptr(DISPLAY),
            Value::Ptr(1),
            Value::Ptr(share),
            Value::Ptr(attribs.as_ptr() as u64),
        ],
        Value::Ptr(context),
    );
}

pub fn make_current(interceptor: &Interceptor, context: u64) {
    let surface = if context == 0 { 0 } else { SURFACE };
    call_returning(
        interceptor,
        EntryPoint::EglMakeCurrent,
        vec![
            Value::Ptr(DISPLAY),
            Value::Ptr(surface),
            Value::Ptr(surface),
            Value::Ptr(context),
        ],
        Value::UInt(1),
    );
}

/// `glGen*(names.len(), names)` with the names the driver "generated".
pub fn gen_names(interceptor: &Interceptor, entry_point: EntryPoint, names: &[u32]) {
    call(
        interceptor,
        entry_point,
        vec![
            Value::Int(names.len() as i64),
            Value::Ptr(names.as_ptr() as u64),
        ],
    );
}
