/// Decides when the user is considered away from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AfkEvaluator {
    threshold_s: u64,
}

impl AfkEvaluator {
    pub fn from_seconds(threshold_s: u64) -> Self {
        Self { threshold_s }
    }

    pub fn threshold_seconds(&self) -> u64 {
        self.threshold_s
    }

    pub fn is_afk(&self, idle_seconds: u64) -> bool {
        self.threshold_s < idle_seconds
    }
}
