//! In-process GL interception layer with a remote debugger protocol.
//!
//! The hooking layer builds a [`CallRecord`] for every intercepted call and
//! brackets the real call with [`Interceptor::dispatch_pre`] and
//! [`Interceptor::dispatch_post`].

pub mod config;
pub mod debugger;
pub mod dispatch;
pub mod entrypoint;
pub mod error;
pub mod host;
pub mod net;
pub mod stages;
pub mod state;
pub mod value;

pub use config::Config;
pub use dispatch::{Dispatcher, Next, Stage};
pub use entrypoint::EntryPoint;
pub use error::{Error, Result};
pub use host::{Host, NullHost};
pub use value::{CallRecord, Value};

use debugger::DebugController;
use net::{Endpoint, TcpEndpoint};
use state::DisplayRegistry;
use std::sync::{Arc, OnceLock};

/// Everything one wrapped process needs: the chains, the debugger side and
/// the shadow state.
pub struct Interceptor {
    dispatcher: Dispatcher,
    controller: DebugController,
    displays: Arc<DisplayRegistry>,
    host: Arc<dyn Host>,
}

impl Interceptor {
    pub fn new(config: Config, host: Arc<dyn Host>, endpoint: Box<dyn Endpoint>) -> Self {
        let displays = Arc::new(DisplayRegistry::new());
        let controller =
            DebugController::new(config, endpoint, Arc::clone(&displays), Arc::clone(&host));
        let dispatcher = Dispatcher::new();
        stages::install(&dispatcher);
        Self {
            dispatcher,
            controller,
            displays,
            host,
        }
    }

    pub fn controller(&self) -> &DebugController {
        &self.controller
    }

    pub fn displays(&self) -> &DisplayRegistry {
        &self.displays
    }

    pub fn host(&self) -> &dyn Host {
        self.host.as_ref()
    }

    /// Adds `stage` at the head of the chain for `entry_point`.
    pub fn register(&self, entry_point: EntryPoint, stage: Arc<dyn Stage>) {
        self.dispatcher.register(entry_point, stage);
    }

    /// Returns a value to hand back instead of making the real call.
    pub fn dispatch_pre(&self, call: &CallRecord) -> Option<Value> {
        match self.dispatcher.pre(self, call) {
            Ok(value) => value,
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    pub fn dispatch_post(&self, call: &CallRecord, ret: Option<&Value>) {
        if let Err(e) = self.dispatcher.post(self, call, ret) {
            self.fail(e);
        }
    }

    /// Runs a whole call through the chain, making the real call unless a stage answered it.
    pub fn call(&self, call: &CallRecord, real: impl FnOnce(&CallRecord) -> Value) -> Value {
        let ret = match self.dispatch_pre(call) {
            Some(value) => value,
            None => real(call),
        };
        self.dispatch_post(call, Some(&ret));
        ret
    }

    fn fail(&self, error: Error) {
        match error {
            Error::Terminate => {
                log::info!("Terminating at the debugger's request");
                self.host.terminate_process();
            }
            other => {
                log::error!("Interception failed: {}", other);
                self.host.fatal(&other.to_string());
            }
        }
    }
}

static INTERCEPTOR: OnceLock<Interceptor> = OnceLock::new();

/// Sets up logging and the process-wide interceptor on first use.
pub fn init(host: Arc<dyn Host>) -> &'static Interceptor {
    INTERCEPTOR.get_or_init(|| {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::new().filter_or("GLDBG_LOG", "warn"),
        )
        .try_init();

        let config = Config::from_env().unwrap_or_else(|e| {
            log::warn!("Ignoring invalid configuration: {}", e);
            Config::default()
        });
        log::info!(
            "Debugger port {}, wait for connection: {}",
            config.debugger_port(),
            config.wait_for_connection()
        );
        Interceptor::new(config, host, Box::new(TcpEndpoint))
    })
}

/// The process-wide interceptor, once [`init`] ran.
pub fn interceptor() -> Option<&'static Interceptor> {
    INTERCEPTOR.get()
}
