use super::break_state::{BreakState, BreakTriggers};
use super::history::CallHistory;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::host::Host;
use crate::net::{Endpoint, Message, Reply, Request, Server, ServerEvent};
use crate::state::{thread, Context, DisplayRegistry, ObjectKind};
use crate::value::{CallRecord, Value};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NoServer,
    Listening,
    Connected,
    /// The last debugger went away; the next intercepted call listens again.
    Disconnected,
    /// Listening failed; the process runs without a debugger.
    Unavailable,
}

struct ServerSlot {
    server: Option<Server>,
    state: ConnectionState,
    /// Bumped on every accepted connection.
    generation: u64,
}

/// Owns the break loop and the connection to the debugger.
///
/// Lock order is server slot first, then break state or history.
pub struct DebugController {
    config: Config,
    endpoint: Box<dyn Endpoint>,
    displays: Arc<DisplayRegistry>,
    host: Arc<dyn Host>,
    slot: Mutex<ServerSlot>,
    break_state: Mutex<BreakState>,
    history: Mutex<CallHistory>,
}

impl DebugController {
    pub fn new(
        config: Config,
        endpoint: Box<dyn Endpoint>,
        displays: Arc<DisplayRegistry>,
        host: Arc<dyn Host>,
    ) -> Self {
        let triggers = BreakTriggers {
            on_error: config.break_on_error,
            on_debug_output: config.break_on_debug_output,
            on_compile_error: config.break_on_compile_error,
        };
        let history = CallHistory::new(config.history_capacity);
        Self {
            config,
            endpoint,
            displays,
            host,
            slot: Mutex::new(ServerSlot {
                server: None,
                state: ConnectionState::NoServer,
                generation: 0,
            }),
            break_state: Mutex::new(BreakState::new(triggers)),
            history: Mutex::new(history),
        }
    }

    pub fn break_state(&self) -> MutexGuard<'_, BreakState> {
        self.break_state.lock()
    }

    pub fn history(&self) -> MutexGuard<'_, CallHistory> {
        self.history.lock()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.slot.lock().state
    }

    pub fn is_breaked(&self) -> bool {
        self.break_state.lock().is_breaked()
    }

    /// Runs before the real call: absorbs pending debugger messages, pauses
    /// here while breaked, then appends `record` to the history.
    pub fn pre_call(&self, record: &CallRecord) -> Result<()> {
        loop {
            let generation = {
                let mut slot = self.slot.lock();
                self.ensure_server(&mut slot)?;
                while self.pump(&mut slot, false)? {}

                let breaked = self.break_state.lock().may_break_at(record.entry_point);
                if breaked {
                    let position = self.history.lock().next_seq();
                    self.send(
                        &mut slot,
                        Message::BreakedCall {
                            call: record.clone(),
                            position,
                            context: thread::current_context_id(),
                            contexts: self.displays.describe_all(),
                        },
                    )?;
                }
                slot.generation
            };

            if !self.wait_while_breaked(generation)? {
                break;
            }
            log::debug!("New debugger connected while paused, restarting");
        }

        self.history.lock().add(record.clone());
        Ok(())
    }

    /// Returns true when a new debugger connected during the wait.
    fn wait_while_breaked(&self, generation: u64) -> Result<bool> {
        while self.is_breaked() {
            let mut slot = self.slot.lock();
            if slot.server.is_none() {
                return Ok(false);
            }
            self.pump(&mut slot, true)?;
            if slot.generation != generation {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs after the real call: finalizes the newest history record and
    /// evaluates the error and debug-output triggers.
    pub fn post_call(&self, ret: Option<&Value>) -> Result<()> {
        let _slot = self.slot.lock();

        if let Some(ctx) = thread::current_context() {
            let error = ctx.lock().finish_call(self.host.as_ref());
            let output = ctx.debug_output().pop();

            if let Some(text) = output {
                self.history.lock().set_debug_output(text);
                self.break_state.lock().set_break_at_debug_output();
            }
            if let Some(error) = error {
                self.history.lock().set_error(error);
                self.break_state.lock().set_break_at_error(error);
            }
        }

        if let Some(ret) = ret {
            self.history.lock().set_ret(ret.clone());
        }
        Ok(())
    }

    fn ensure_server(&self, slot: &mut ServerSlot) -> Result<()> {
        match slot.state {
            ConnectionState::NoServer | ConnectionState::Disconnected => {}
            _ => return Ok(()),
        }

        let mut server = match Server::listen(self.endpoint.as_ref(), self.config.debugger_port()) {
            Ok(server) => server,
            Err(e) => {
                log::warn!(
                    "Cannot listen for a debugger on port {}: {}",
                    self.config.debugger_port(),
                    e
                );
                slot.state = ConnectionState::Unavailable;
                return Ok(());
            }
        };
        slot.state = ConnectionState::Listening;

        let must_wait = self.config.wait_for_connection() || self.is_breaked();
        if must_wait {
            log::info!("Waiting for a debugger to connect");
            if let Err(e) = server.wait_for_connection() {
                log::warn!("Waiting for a debugger failed: {}", e);
                slot.state = ConnectionState::Unavailable;
                return Ok(());
            }
        }
        slot.server = Some(server);
        if must_wait {
            self.on_connected(slot)?;
        }
        Ok(())
    }

    /// Handles one transport event. Returns false once nothing is pending.
    fn pump(&self, slot: &mut ServerSlot, blocking: bool) -> Result<bool> {
        let server = match slot.server.as_mut() {
            Some(server) => server,
            None => return Ok(false),
        };
        let event = if blocking {
            server.run_one()
        } else {
            server.poll()
        };

        let result = match event {
            Ok(ServerEvent::Idle) => return Ok(false),
            Ok(ServerEvent::Connected) => self.on_connected(slot),
            Ok(ServerEvent::Message(message)) => self.handle_message(slot, message),
            Ok(ServerEvent::Invalid(reason)) => self.send(
                slot,
                Message::Error {
                    message: format!("Malformed message: {}", reason),
                },
            ),
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(true),
            Err(Error::Io(e)) => {
                log::info!("Debugger transport failed: {}", e);
                self.on_disconnected(slot);
                Ok(false)
            }
            Err(Error::Disconnected) => {
                self.on_disconnected(slot);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Sends to the connected debugger. A failed send counts as a disconnect.
    fn send(&self, slot: &mut ServerSlot, message: Message) -> Result<()> {
        let server = match slot.server.as_mut() {
            Some(server) => server,
            None => return Ok(()),
        };
        match server.send(message) {
            Err(Error::Io(_)) | Err(Error::Disconnected) => {
                self.on_disconnected(slot);
                Ok(())
            }
            other => other,
        }
    }

    fn on_connected(&self, slot: &mut ServerSlot) -> Result<()> {
        slot.state = ConnectionState::Connected;
        slot.generation += 1;
        log::info!("Debugger connected (connection {})", slot.generation);

        {
            let mut break_state = self.break_state.lock();
            break_state.set_enabled(true);
            if self.config.wait_for_connection() {
                break_state.request_break();
            }
        }

        self.send(
            slot,
            Message::Hello {
                version: env!("CARGO_PKG_VERSION").to_string(),
                pid: std::process::id(),
            },
        )
    }

    fn on_disconnected(&self, slot: &mut ServerSlot) {
        log::info!("Debugger disconnected, breaking disabled");
        self.break_state.lock().reset();
        slot.server = None;
        slot.state = ConnectionState::Disconnected;
    }

    fn handle_message(&self, slot: &mut ServerSlot, message: Message) -> Result<()> {
        match message {
            Message::Configuration(triggers) => {
                log::debug!("Break triggers now {:?}", triggers);
                self.break_state.lock().set_triggers(triggers);
                Ok(())
            }
            Message::ContinueBreak { paused, step } => {
                self.break_state.lock().continue_break(paused, step);
                Ok(())
            }
            Message::SetBreakPoints { entry_points } => {
                self.break_state
                    .lock()
                    .breakpoints_mut()
                    .replace(entry_points);
                Ok(())
            }
            Message::QueryCallTrace { start, end } => {
                let records = self.history.lock().query(start, end);
                self.send(slot, Message::CallTrace { start, records })
            }
            Message::Request(request) => {
                let reply = match self.handle_request(request) {
                    Ok(reply) => Message::RequestReply(reply),
                    Err(Error::Terminate) => return Err(Error::Terminate),
                    Err(e) => {
                        log::warn!("Request failed: {}", e);
                        Message::Error {
                            message: e.to_string(),
                        }
                    }
                };
                self.send(slot, reply)
            }
            Message::Terminate => {
                log::info!("Debugger requested termination");
                Err(Error::Terminate)
            }
            other => {
                log::warn!("Unexpected message from debugger: {:?}", other);
                self.send(
                    slot,
                    Message::Error {
                        message: "Message is not accepted by the wrapper".to_string(),
                    },
                )
            }
        }
    }

    fn handle_request(&self, request: Request) -> Result<Reply> {
        match request {
            Request::ListContexts => Ok(Reply::Contexts {
                contexts: self.displays.describe_all(),
            }),
            Request::QueryObject {
                context,
                object,
                name,
            } => {
                let ctx = self
                    .displays
                    .find_context(context)
                    .ok_or(Error::UnknownContext(context))?;
                let info = ctx
                    .describe_object(object, name)
                    .ok_or_else(|| unknown_object(context, object, name))?;
                Ok(Reply::Object { object: info })
            }
            Request::EditShaderSource {
                context,
                shader,
                source,
            } => {
                let ctx = self.current_target(context)?;
                with_shader(&ctx, shader, |obj| obj.edited_source = Some(source.clone()))?;
                self.recompile(&ctx, shader, &source)
            }
            Request::ResetShaderSource { context, shader } => {
                let ctx = self.current_target(context)?;
                let source = with_shader(&ctx, shader, |obj| {
                    obj.edited_source = None;
                    obj.source.clone().unwrap_or_default()
                })?;
                self.recompile(&ctx, shader, &source)
            }
            Request::ForceRelink { context, program } => {
                let ctx = self.current_target(context)?;
                if !ctx.lock().programs.contains(program) {
                    return Err(unknown_object(context, ObjectKind::Program, program));
                }
                self.host.link_program(program)?;
                let linked = self.host.program_link_status(program);
                if let Some(obj) = ctx.lock().programs.get_mut(program) {
                    obj.link_status = Some(linked);
                }
                Ok(Reply::ProgramLinked { program, linked })
            }
        }
    }

    /// Driver-side edits only work on the context current on the paused thread.
    fn current_target(&self, context: u64) -> Result<Arc<Context>> {
        if self.displays.find_context(context).is_none() {
            return Err(Error::UnknownContext(context));
        }
        thread::current_context()
            .filter(|ctx| ctx.id() == context)
            .ok_or_else(|| {
                Error::Protocol(format!(
                    "Context {:#x} is not current on the paused thread",
                    context
                ))
            })
    }

    fn recompile(&self, ctx: &Context, shader: u32, source: &str) -> Result<Reply> {
        self.host.compile_shader(shader, source)?;
        let compiled = self.host.shader_compile_status(shader);
        if let Some(obj) = ctx.lock().shaders.get_mut(shader) {
            obj.compile_status = Some(compiled);
        }
        Ok(Reply::ShaderCompiled { shader, compiled })
    }
}

fn unknown_object(context: u64, kind: ObjectKind, name: u32) -> Error {
    Error::UnknownObject {
        context,
        kind: kind.to_string(),
        name,
    }
}

fn with_shader<R>(
    ctx: &Context,
    shader: u32,
    f: impl FnOnce(&mut crate::state::ShaderObj) -> R,
) -> Result<R> {
    let mut state = ctx.lock();
    match state.shaders.get_mut(shader) {
        Some(obj) => Ok(f(obj)),
        None => Err(unknown_object(ctx.id(), ObjectKind::Shader, shader)),
    }
}
