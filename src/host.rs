//! Boundary to the trampoline layer and the real driver.

use crate::entrypoint::EntryPoint;
use crate::error::{Error, Result};
use std::os::raw::{c_char, c_void};

/// Signature of `GLDEBUGPROC`.
pub type DebugProc = extern "system" fn(
    source: u32,
    kind: u32,
    id: u32,
    severity: u32,
    length: i32,
    message: *const c_char,
    user_param: *const c_void,
);

/// Services the wrapper needs from the hooking layer. Calls made through
/// these methods go straight to the driver and are never intercepted.
pub trait Host: Send + Sync {
    /// Address of the wrapper trampoline for `entry_point`.
    fn wrapper_pointer(&self, entry_point: EntryPoint) -> u64;

    /// Resolves the driver's implementation, failing when the driver lacks it.
    fn ensure_pointer(&self, entry_point: EntryPoint) -> Result<u64>;

    fn get_error(&self) -> u32;

    fn shader_compile_status(&self, shader: u32) -> bool;

    fn program_link_status(&self, program: u32) -> bool;

    /// Replaces the source of `shader` and compiles it.
    fn compile_shader(&self, shader: u32, source: &str) -> Result<()>;

    fn link_program(&self, program: u32) -> Result<()>;

    /// Installs `callback` through the real `entry_point` (one of the
    /// glDebugMessageCallback variants).
    fn install_debug_callback(&self, entry_point: EntryPoint, callback: DebugProc, user_param: u64);

    fn terminate_process(&self) {
        std::process::exit(0);
    }

    fn fatal(&self, message: &str) {
        log::error!("Fatal: {}", message);
        std::process::abort();
    }
}

/// A host with no driver behind it. Every query reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

impl Host for NullHost {
    fn wrapper_pointer(&self, _entry_point: EntryPoint) -> u64 {
        0
    }

    fn ensure_pointer(&self, entry_point: EntryPoint) -> Result<u64> {
        Err(Error::Internal(format!("{} is not available", entry_point)))
    }

    fn get_error(&self) -> u32 {
        0
    }

    fn shader_compile_status(&self, _shader: u32) -> bool {
        true
    }

    fn program_link_status(&self, _program: u32) -> bool {
        true
    }

    fn compile_shader(&self, _shader: u32, _source: &str) -> Result<()> {
        Ok(())
    }

    fn link_program(&self, _program: u32) -> Result<()> {
        Ok(())
    }

    fn install_debug_callback(&self, _entry_point: EntryPoint, _callback: DebugProc, _user_param: u64) {}
}
