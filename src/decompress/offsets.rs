//! Repeated match offsets (R0, R1, R2).

/// Three most recently used match offsets, most recent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatedOffsets([u32; 3]);

impl RepeatedOffsets {
    /// Initial state: all three offsets are 1.
    pub const fn new() -> Self {
        Self([1, 1, 1])
    }

    /// Replace all three slots, as an uncompressed block header does.
    pub const fn from_raw(offsets: [u32; 3]) -> Self {
        Self(offsets)
    }

    /// Current slots as `[R0, R1, R2]`.
    pub const fn get(&self) -> [u32; 3] {
        self.0
    }

    /// Reuse slot 0, 1 or 2; the chosen slot swaps places with R0.
    #[inline]
    pub fn reuse(&mut self, slot: usize) -> u32 {
        debug_assert!(slot < 3);
        self.0.swap(0, slot);
        self.0[0]
    }

    /// Push a freshly decoded offset to the front.
    #[inline]
    pub fn push(&mut self, offset: u32) {
        self.0 = [offset, self.0[0], self.0[1]];
    }
}

impl Default for RepeatedOffsets {
    fn default() -> Self {
        Self::new()
    }
}
