/// Debounce state for one digital button input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    Pressing,
    Valid,
}

/// Single-threshold debouncer: the simpler sibling of the analog detector.
/// No hysteresis, no buffering, no attribution ambiguity.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    press_duration_ms: u64,
    state: DebounceState,
    pressed_at_ms: u64,
}

impl Debouncer {
    pub fn new(press_duration_ms: u64) -> Self {
        Self {
            press_duration_ms,
            state: DebounceState::Idle,
            pressed_at_ms: 0,
        }
    }

    /// Feed one level sample. Returns true exactly once per hold, when the
    /// level has stayed high for the full press duration.
    pub fn update(&mut self, is_high: bool, now_ms: u64) -> bool {
        if !is_high {
            self.state = DebounceState::Idle;
            return false;
        }

        match self.state {
            DebounceState::Idle => {
                self.state = DebounceState::Pressing;
                self.pressed_at_ms = now_ms;
                false
            }
            DebounceState::Pressing => {
                if now_ms.saturating_sub(self.pressed_at_ms) >= self.press_duration_ms {
                    self.state = DebounceState::Valid;
                    true
                } else {
                    false
                }
            }
            DebounceState::Valid => false,
        }
    }
}
