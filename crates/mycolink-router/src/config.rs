/// Largest ring capacity a channel may request by default.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 10_000;

/// Controls router behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Channel ring capacities above this are clamped at registration.
    pub max_buffer_size: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE,
        }
    }
}
