// reset.rs — 边沿触发的复位信号

/// Turns a monotonically increasing counter into one-shot reset requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetController {
    last_seen: u64,
}

impl ResetController {
    /// Start from the counter value present at mount so an already-bumped
    /// counter does not fire on the first frame.
    pub fn new(initial: u64) -> Self {
        Self { last_seen: initial }
    }

    /// True once per increment. Zero, repeats and decreases are ignored;
    /// a decrease re-arms from the lower value.
    pub fn observe(&mut self, signal: u64) -> bool {
        let fire = signal > self.last_seen;
        self.last_seen = signal;
        fire
    }
}
