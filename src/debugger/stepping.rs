use crate::entrypoint::EntryPoint;
use serde::{Deserialize, Serialize};

/// Step granularity armed by a continue command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepMode {
    Call,
    DrawCall,
    Frame,
}

impl StepMode {
    pub fn stops_at(self, entry_point: EntryPoint) -> bool {
        match self {
            StepMode::Call => true,
            StepMode::DrawCall => entry_point.is_draw_call(),
            StepMode::Frame => entry_point.is_frame_delimiter(),
        }
    }
}
