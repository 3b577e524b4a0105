use renderer::{AdjustmentKind, AdjustmentParameters};

/// Amount one arrow-key press moves the selected adjustment.
pub const NUDGE_STEP: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKey {
    /// `1`..`9` select the first nine adjustments, `0` the tenth.
    Digit(u8),
    /// Cycles to the next adjustment, reaching all eleven.
    Next,
    Increase,
    Decrease,
    /// Resets the selected adjustment to neutral.
    Reset,
}

/// Keyboard editing state of the preview window.
#[derive(Debug, Clone, Copy)]
pub struct AdjustmentControls {
    selected: AdjustmentKind,
}

impl Default for AdjustmentControls {
    fn default() -> Self {
        Self {
            selected: AdjustmentKind::ALL[0],
        }
    }
}

impl AdjustmentControls {
    pub fn selected(&self) -> AdjustmentKind {
        self.selected
    }

    /// Applies `key`. Returns the new record when the key changed a value;
    /// selection changes return `None`.
    pub fn handle(
        &mut self,
        key: ControlKey,
        current: &AdjustmentParameters,
    ) -> Option<AdjustmentParameters> {
        let kinds = AdjustmentKind::ALL;
        match key {
            ControlKey::Digit(digit) => {
                let index = match digit {
                    0 => 9,
                    1..=9 => usize::from(digit) - 1,
                    _ => return None,
                };
                self.select(kinds[index]);
                None
            }
            ControlKey::Next => {
                let index = kinds
                    .iter()
                    .position(|kind| *kind == self.selected)
                    .unwrap_or(0);
                self.select(kinds[(index + 1) % kinds.len()]);
                None
            }
            ControlKey::Increase => Some(self.nudge(current, NUDGE_STEP)),
            ControlKey::Decrease => Some(self.nudge(current, -NUDGE_STEP)),
            ControlKey::Reset => Some(current.with(self.selected, 0.0)),
        }
    }

    fn select(&mut self, kind: AdjustmentKind) {
        self.selected = kind;
        tracing::info!(adjustment = %kind, "selected adjustment");
    }

    fn nudge(&self, current: &AdjustmentParameters, delta: f32) -> AdjustmentParameters {
        let value = current.get(self.selected) + delta;
        tracing::info!(adjustment = %self.selected, value, "adjusted");
        current.with(self.selected, value)
    }
}
