//! Per-movie runtime configuration.

/// Settings fixed when a [`crate::runtime::Context`] is created.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// Version byte from the SWF header. Selects name case sensitivity
    /// (versions above 6) and the undefined/empty-string coercion quirks.
    pub swf_version: u8,

    /// Fixed seed for `Math.random`. `None` seeds from the clock.
    pub random_seed: Option<u64>,

    /// Most array elements read in one pass (joins, `apply`).
    /// Default: 1048576
    pub max_array_elements: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            swf_version: 10,
            random_seed: None,
            max_array_elements: 1 << 20,
        }
    }
}

impl ContextConfig {
    pub fn with_swf_version(mut self, swf_version: u8) -> Self {
        self.swf_version = swf_version;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_max_array_elements(mut self, limit: usize) -> Self {
        self.max_array_elements = limit;
        self
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.swf_version > 6
    }
}
