//! Volume control with mute memory
//!
//! Volume is a linear gain in `[0.0, 1.0]`. Zero is muted; toggling mute
//! swaps between zero and the last audible level.

/// Volume controller
#[derive(Debug, Clone)]
pub struct Volume {
    level: f32,

    /// Last non-zero level, restored when unmuting
    last_audible: f32,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial gain, clamped to `[0.0, 1.0]`
    pub fn new(level: f32) -> Self {
        let level = clamp(level);
        Self {
            level,
            last_audible: if level > 0.0 { level } else { 1.0 },
        }
    }

    /// Set the gain, clamped to `[0.0, 1.0]`
    pub fn set_level(&mut self, level: f32) {
        self.level = clamp(level);
        if self.level > 0.0 {
            self.last_audible = self.level;
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn is_muted(&self) -> bool {
        self.level == 0.0
    }

    /// Swap between silence and the last audible level
    pub fn toggle_mute(&mut self) {
        if self.is_muted() {
            self.level = self.last_audible;
        } else {
            self.last_audible = self.level;
            self.level = 0.0;
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(1.0)
    }
}

fn clamp(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}
