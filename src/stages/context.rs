//! Window-system context and surface lifetimes for EGL, GLX and WGL.

use super::succeeded;
use crate::dispatch::{Dispatcher, Next, Stage};
use crate::entrypoint::EntryPoint;
use crate::error::Result;
use crate::state::thread::{self, EGL_OPENGL_API, EGL_OPENGL_ES_API};
use crate::state::{Api, ContextVersion, DEFAULT_DISPLAY};
use crate::value::{memory, CallRecord, Value};
use crate::Interceptor;
use std::sync::Arc;

const EGL_NONE: i32 = 0x3038;
const EGL_CONTEXT_CLIENT_VERSION: i32 = 0x3098;
/// GLX_CONTEXT_MAJOR_VERSION_ARB and WGL_CONTEXT_MAJOR_VERSION_ARB share a value.
const CONTEXT_MAJOR_VERSION_ARB: i32 = 0x2091;

fn attribute(attributes: &[(i32, i32)], key: i32) -> Option<i32> {
    attributes.iter().find(|(k, _)| *k == key).map(|&(_, v)| v)
}

fn nonzero(handle: u64) -> Option<u64> {
    (handle != 0).then_some(handle)
}

struct ContextStage;

impl ContextStage {
    fn create(
        interceptor: &Interceptor,
        display: u64,
        context: u64,
        share: u64,
        version: ContextVersion,
        attributes: Vec<(i32, i32)>,
    ) {
        if context == 0 {
            return;
        }
        interceptor
            .displays()
            .get(display)
            .ensure_context(context, version, nonzero(share), attributes);
    }

    fn make_current(interceptor: &Interceptor, display: u64, context: u64, draw: u64, read: u64) {
        let display = interceptor.displays().get(display);
        if let Some(id) = nonzero(draw) {
            display.ensure_surface(id);
        }
        if let Some(id) = nonzero(read) {
            display.ensure_surface(id);
        }
        thread::bind_context(&display, context, nonzero(draw), nonzero(read));
    }

    fn egl(interceptor: &Interceptor, call: &CallRecord, ret: Option<&Value>) -> Result<()> {
        match call.entry_point {
            EntryPoint::EglBindApi if succeeded(ret) => thread::bind_egl_api(call.arg_u32(0)?),
            EntryPoint::EglCreateContext => {
                // SAFETY: EGL attribute lists are EGL_NONE terminated.
                let attributes = unsafe { memory::read_attrib_list(call.arg_u64(3)?, EGL_NONE) };
                let version = if thread::egl_api() == EGL_OPENGL_API {
                    ContextVersion::DESKTOP
                } else {
                    let major = attribute(&attributes, EGL_CONTEXT_CLIENT_VERSION).unwrap_or(1);
                    ContextVersion::es(major.max(1) as u32)
                };
                let context = ret.and_then(Value::as_u64).unwrap_or(0);
                Self::create(
                    interceptor,
                    call.arg_u64(0)?,
                    context,
                    call.arg_u64(2)?,
                    version,
                    attributes,
                );
            }
            EntryPoint::EglMakeCurrent if succeeded(ret) => Self::make_current(
                interceptor,
                call.arg_u64(0)?,
                call.arg_u64(3)?,
                call.arg_u64(1)?,
                call.arg_u64(2)?,
            ),
            EntryPoint::EglDestroyContext if succeeded(ret) => interceptor
                .displays()
                .get(call.arg_u64(0)?)
                .lazy_delete_context(call.arg_u64(1)?),
            EntryPoint::EglCreateWindowSurface | EntryPoint::EglCreatePbufferSurface => {
                if let Some(surface) = ret.and_then(Value::as_u64).and_then(nonzero) {
                    interceptor
                        .displays()
                        .get(call.arg_u64(0)?)
                        .add_surface(surface, Some(call.arg_u64(1)?));
                }
            }
            EntryPoint::EglDestroySurface if succeeded(ret) => interceptor
                .displays()
                .get(call.arg_u64(0)?)
                .remove_surface(call.arg_u64(1)?),
            EntryPoint::EglReleaseThread => {
                thread::release();
                thread::bind_egl_api(EGL_OPENGL_ES_API);
            }
            _ => {}
        }
        Ok(())
    }

    fn glx(interceptor: &Interceptor, call: &CallRecord, ret: Option<&Value>) -> Result<()> {
        let created = ret.and_then(Value::as_u64).unwrap_or(0);
        match call.entry_point {
            EntryPoint::GlxCreateContext => Self::create(
                interceptor,
                call.arg_u64(0)?,
                created,
                call.arg_u64(2)?,
                ContextVersion::DESKTOP,
                Vec::new(),
            ),
            EntryPoint::GlxCreateNewContext => Self::create(
                interceptor,
                call.arg_u64(0)?,
                created,
                call.arg_u64(3)?,
                ContextVersion::DESKTOP,
                Vec::new(),
            ),
            EntryPoint::GlxCreateContextAttribsArb => {
                // SAFETY: GLX attribute lists are zero terminated.
                let attributes = unsafe { memory::read_attrib_list(call.arg_u64(4)?, 0) };
                let version = desktop_version(&attributes);
                Self::create(
                    interceptor,
                    call.arg_u64(0)?,
                    created,
                    call.arg_u64(2)?,
                    version,
                    attributes,
                );
            }
            EntryPoint::GlxMakeCurrent if succeeded(ret) => {
                let drawable = call.arg_u64(1)?;
                Self::make_current(
                    interceptor,
                    call.arg_u64(0)?,
                    call.arg_u64(2)?,
                    drawable,
                    drawable,
                )
            }
            EntryPoint::GlxMakeContextCurrent if succeeded(ret) => Self::make_current(
                interceptor,
                call.arg_u64(0)?,
                call.arg_u64(3)?,
                call.arg_u64(1)?,
                call.arg_u64(2)?,
            ),
            EntryPoint::GlxDestroyContext => interceptor
                .displays()
                .get(call.arg_u64(0)?)
                .lazy_delete_context(call.arg_u64(1)?),
            _ => {}
        }
        Ok(())
    }

    fn wgl(interceptor: &Interceptor, call: &CallRecord, ret: Option<&Value>) -> Result<()> {
        let created = ret.and_then(Value::as_u64).unwrap_or(0);
        match call.entry_point {
            EntryPoint::WglCreateContext => Self::create(
                interceptor,
                DEFAULT_DISPLAY,
                created,
                0,
                ContextVersion::DESKTOP,
                Vec::new(),
            ),
            EntryPoint::WglCreateContextAttribsArb => {
                // SAFETY: WGL attribute lists are zero terminated.
                let attributes = unsafe { memory::read_attrib_list(call.arg_u64(2)?, 0) };
                let version = desktop_version(&attributes);
                Self::create(
                    interceptor,
                    DEFAULT_DISPLAY,
                    created,
                    call.arg_u64(1)?,
                    version,
                    attributes,
                );
            }
            EntryPoint::WglMakeCurrent if succeeded(ret) => {
                let dc = call.arg_u64(0)?;
                Self::make_current(interceptor, DEFAULT_DISPLAY, call.arg_u64(1)?, dc, dc)
            }
            EntryPoint::WglDeleteContext if succeeded(ret) => interceptor
                .displays()
                .default_display()
                .lazy_delete_context(call.arg_u64(0)?),
            EntryPoint::WglShareLists if succeeded(ret) => {
                let display = interceptor.displays().default_display();
                let source = display.get_context(call.arg_u64(0)?);
                let target = display.get_context(call.arg_u64(1)?);
                match (source, target) {
                    (Some(source), Some(target)) => target.set_shared(source.shared()),
                    _ => log::warn!("wglShareLists on a context never seen created"),
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn desktop_version(attributes: &[(i32, i32)]) -> ContextVersion {
    ContextVersion {
        api: Api::Desktop,
        major: attribute(attributes, CONTEXT_MAJOR_VERSION_ARB).map_or(0, |v| v.max(0) as u32),
    }
}

impl Stage for ContextStage {
    fn post(&self, call: &CallRecord, ret: Option<&Value>, next: Next<'_>) -> Result<()> {
        let interceptor = next.interceptor();
        let name = call.entry_point.name();
        if name.starts_with("egl") {
            Self::egl(interceptor, call, ret)?;
        } else if name.starts_with("glX") {
            Self::glx(interceptor, call, ret)?;
        } else {
            Self::wgl(interceptor, call, ret)?;
        }
        next.post(call, ret)
    }
}

pub(super) fn install(dispatcher: &Dispatcher) {
    dispatcher.register_all(
        &[
            EntryPoint::EglBindApi,
            EntryPoint::EglCreateContext,
            EntryPoint::EglMakeCurrent,
            EntryPoint::EglDestroyContext,
            EntryPoint::EglCreateWindowSurface,
            EntryPoint::EglCreatePbufferSurface,
            EntryPoint::EglDestroySurface,
            EntryPoint::EglReleaseThread,
            EntryPoint::GlxCreateContext,
            EntryPoint::GlxCreateNewContext,
            EntryPoint::GlxCreateContextAttribsArb,
            EntryPoint::GlxMakeCurrent,
            EntryPoint::GlxMakeContextCurrent,
            EntryPoint::GlxDestroyContext,
            EntryPoint::WglCreateContext,
            EntryPoint::WglCreateContextAttribsArb,
            EntryPoint::WglMakeCurrent,
            EntryPoint::WglDeleteContext,
            EntryPoint::WglShareLists,
        ],
        Arc::new(ContextStage),
    );
}
