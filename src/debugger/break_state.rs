use super::breakpoints::Breakpoints;
use super::stepping::StepMode;
use crate::entrypoint::EntryPoint;
use serde::{Deserialize, Serialize};

/// Conditions that pause execution on their own, without a breakpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakTriggers {
    pub on_error: bool,
    pub on_debug_output: bool,
    pub on_compile_error: bool,
}

/// Paused/running status of the process.
///
/// `breaked` is only ever written while breaking is enabled, so a process
/// with no debugger attached can never be paused.
#[derive(Debug)]
pub struct BreakState {
    breaked: bool,
    enabled: bool,
    step: Option<StepMode>,
    breakpoints: Breakpoints,
    triggers: BreakTriggers,
}

impl BreakState {
    pub fn new(triggers: BreakTriggers) -> Self {
        Self {
            breaked: false,
            enabled: false,
            step: None,
            breakpoints: Breakpoints::new(),
            triggers,
        }
    }

    pub fn is_breaked(&self) -> bool {
        self.breaked && self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_breaked(&mut self, breaked: bool) {
        if self.enabled {
            self.breaked = breaked;
        }
    }

    /// Pauses at the next intercepted call.
    pub fn request_break(&mut self) {
        self.set_breaked(true);
    }

    pub fn step_mode(&self) -> Option<StepMode> {
        self.step
    }

    pub fn may_break_at(&mut self, entry_point: EntryPoint) -> bool {
        let mut hit = self.step.map_or(false, |mode| mode.stops_at(entry_point));
        if self.breakpoints.contains(entry_point) {
            hit = true;
        }
        if hit && self.enabled {
            self.step = None;
            self.set_breaked(true);
        }
        self.is_breaked()
    }

    pub fn continue_break(&mut self, paused: bool, step: Option<StepMode>) {
        self.set_breaked(paused);
        self.step = if paused { None } else { step };
    }

    pub fn set_break_at_error(&mut self, error: u32) {
        if error != 0 && self.triggers.on_error {
            self.set_breaked(true);
        }
    }

    pub fn set_break_at_debug_output(&mut self) {
        if self.triggers.on_debug_output {
            self.set_breaked(true);
        }
    }

    pub fn set_break_at_compile_or_link_error(&mut self) {
        if self.triggers.on_compile_error {
            self.set_breaked(true);
        }
    }

    pub fn set_triggers(&mut self, triggers: BreakTriggers) {
        self.triggers = triggers;
    }

    pub fn breakpoints_mut(&mut self) -> &mut Breakpoints {
        &mut self.breakpoints
    }

    /// Forgets pending steps and disables breaking, used when the debugger goes away.
    pub fn reset(&mut self) {
        self.enabled = false;
        self.step = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_TRIGGERS: BreakTriggers = BreakTriggers {
        on_error: true,
        on_debug_output: true,
        on_compile_error: true,
    };

    #[test]
    fn test_disabled_state_never_pauses() {
        let mut state = BreakState::new(ALL_TRIGGERS);
        state.breakpoints_mut().add(EntryPoint::GlDrawArrays);
        state.continue_break(false, Some(StepMode::Call));

        assert!(!state.may_break_at(EntryPoint::GlDrawArrays));
        state.request_break();
        state.set_break_at_error(0x0500);
        state.set_break_at_debug_output();
        state.set_break_at_compile_or_link_error();
        state.continue_break(true, None);
        assert!(!state.is_breaked());

        // nothing was latched while disabled
        state.set_enabled(true);
        assert!(!state.is_breaked());
    }

    #[test]
    fn test_breakpoint_hit() {
        let mut state = BreakState::new(BreakTriggers::default());
        state.set_enabled(true);
        state.breakpoints_mut().add(EntryPoint::GlClear);

        assert!(!state.may_break_at(EntryPoint::GlBindTexture));
        assert!(state.may_break_at(EntryPoint::GlClear));
        state.continue_break(false, None);
        assert!(!state.is_breaked());
    }

    #[test]
    fn test_step_modes_are_consumed() {
        let mut state = BreakState::new(BreakTriggers::default());
        state.set_enabled(true);

        state.continue_break(false, Some(StepMode::DrawCall));
        assert!(!state.may_break_at(EntryPoint::GlBindBuffer));
        assert!(state.may_break_at(EntryPoint::GlDrawElements));
        assert_eq!(state.step_mode(), None);

        state.continue_break(false, Some(StepMode::Frame));
        assert!(!state.may_break_at(EntryPoint::GlDrawElements));
        assert!(state.may_break_at(EntryPoint::EglSwapBuffers));

        state.continue_break(false, Some(StepMode::Call));
        assert!(state.may_break_at(EntryPoint::GlViewport));
    }

    #[test]
    fn test_disabling_masks_pause_without_clearing_it() {
        let mut state = BreakState::new(BreakTriggers::default());
        state.set_enabled(true);
        state.request_break();
        assert!(state.is_breaked());

        state.set_enabled(false);
        assert!(!state.is_breaked());
        state.set_enabled(true);
        assert!(state.is_breaked());
    }

    #[test]
    fn test_triggers_gate_their_breaks() {
        let mut state = BreakState::new(BreakTriggers::default());
        state.set_enabled(true);
        state.set_break_at_error(0x0502);
        state.set_break_at_debug_output();
        state.set_break_at_compile_or_link_error();
        assert!(!state.is_breaked());

        state.set_triggers(BreakTriggers {
            on_compile_error: true,
            ..Default::default()
        });
        state.set_break_at_compile_or_link_error();
        assert!(state.is_breaked());
    }

    #[test]
    fn test_no_error_never_triggers() {
        let mut state = BreakState::new(ALL_TRIGGERS);
        state.set_enabled(true);
        state.set_break_at_error(0);
        assert!(!state.is_breaked());
    }
}
