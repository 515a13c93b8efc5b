//! Unique jump targets.

/// Break and continue targets of the innermost enclosing loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopLabels {
    pub break_label: String,
    pub continue_label: String,
}

/// Hands out label names from a counter shared by the whole compilation.
#[derive(Debug, Default)]
pub struct LabelAllocator {
    counter: usize,
}

impl LabelAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new local label namespaced by `prefix` (e.g. `.Lwhile_start_3`).
    pub fn fresh(&mut self, prefix: &str) -> String {
        let label = format!(".L{}_{}", prefix, self.counter);
        self.counter += 1;
        label
    }
}
