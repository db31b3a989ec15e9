use crate::debugger::{BreakTriggers, StepMode};
use crate::entrypoint::EntryPoint;
use crate::state::{ContextInfo, ObjectInfo, ObjectKind};
use crate::value::CallRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub message: Message,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "snake_case")]
pub enum Message {
    Hello {
        version: String,
        pid: u32,
    },
    BreakedCall {
        call: CallRecord,
        position: u64,
        context: u64,
        contexts: Vec<ContextInfo>,
    },
    Configuration(BreakTriggers),
    /// `paused: false` resumes, optionally arming a step; `paused: true` interrupts.
    ContinueBreak {
        paused: bool,
        step: Option<StepMode>,
    },
    SetBreakPoints {
        entry_points: Vec<EntryPoint>,
    },
    QueryCallTrace {
        start: usize,
        end: usize,
    },
    CallTrace {
        start: usize,
        records: Vec<CallRecord>,
    },
    Request(Request),
    RequestReply(Reply),
    Error {
        message: String,
    },
    Terminate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    ListContexts,
    QueryObject {
        context: u64,
        object: ObjectKind,
        name: u32,
    },
    EditShaderSource {
        context: u64,
        shader: u32,
        source: String,
    },
    ResetShaderSource {
        context: u64,
        shader: u32,
    },
    ForceRelink {
        context: u64,
        program: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reply {
    Contexts { contexts: Vec<ContextInfo> },
    Object { object: ObjectInfo },
    ShaderCompiled { shader: u32, compiled: bool },
    ProgramLinked { program: u32, linked: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let envelope = Envelope {
            seq: 3,
            message: Message::ContinueBreak {
                paused: false,
                step: Some(StepMode::DrawCall),
            },
        };
        let json: serde_json::Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["seq"], 3);
        assert_eq!(json["message"]["type"], "continue_break");
        assert_eq!(json["message"]["body"]["step"], "draw_call");
    }

    #[test]
    fn test_parse_debugger_messages() {
        let text = r#"{"seq":1,"message":{"type":"set_break_points","body":{"entry_points":["glDrawArrays","eglSwapBuffers"]}}}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        assert_eq!(
            envelope.message,
            Message::SetBreakPoints {
                entry_points: vec![EntryPoint::GlDrawArrays, EntryPoint::EglSwapBuffers]
            }
        );

        let text = r#"{"seq":2,"message":{"type":"request","body":{"kind":"query_object","context":16,"object":"texture","name":1}}}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        assert_eq!(
            envelope.message,
            Message::Request(Request::QueryObject {
                context: 16,
                object: ObjectKind::Texture,
                name: 1
            })
        );

        let text = r#"{"seq":3,"message":{"type":"terminate"}}"#;
        let envelope: Envelope = serde_json::from_str(text).unwrap();
        assert_eq!(envelope.message, Message::Terminate);
    }
}
