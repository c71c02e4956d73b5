/// Default capacity of the first block: 4 KiB
pub const DEFAULT_CAPACITY: usize = 4 * 1024;

/// How the arena finds room once the current block is exhausted
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum GrowthPolicy {
    /// Move into the already-linked next block when it can hold the request, else splice a new one
    ///
    /// Blocks retained by `Arena::reset` get reused before any new memory is requested.
    #[default]
    ReuseNext,
    /// Always splice a freshly allocated block after the current one
    AlwaysSplice,
}

/// Configuration for arena creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Capacity in bytes of the first block
    pub capacity: usize,
    /// Growth behavior once a block fills up
    pub growth: GrowthPolicy,
    /// Upper bound on the total capacity of all linked blocks
    pub limit: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            growth: GrowthPolicy::default(),
            limit: None,
        }
    }
}

impl ArenaConfig {
    /// Set the capacity of the first block
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set the growth policy
    pub fn with_growth(mut self, growth: GrowthPolicy) -> Self {
        self.growth = growth;
        self
    }

    /// Cap the total reserved bytes; growth past this fails with `Error::OutOfMemory`
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether `reserved` bytes stay within the configured limit
    #[inline]
    pub(crate) fn admits(&self, reserved: usize) -> bool {
        self.limit.map_or(true, |limit| reserved <= limit)
    }
}
