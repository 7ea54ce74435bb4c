//! Work configuration - switches that change how nodes are rendered.
//!
//! Passed by reference into every [`WorkContext`](crate::pipeline::WorkContext),
//! the same way the render mode selects renderer behavior in a mounted app.
//!
//! ```ignore
//! let config = WorkConfig::default()
//!     .with_double_invoke_in_strict_mode(true)
//!     .with_profiler_timer(true);
//! ```

/// Dispatcher switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkConfig {
    /// Render class instances twice inside `STRICT` subtrees, keeping the
    /// first result. Function components still render once.
    pub double_invoke_in_strict_mode: bool,

    /// Mark Profiler fibers with an `UPDATE` effect so the commit phase
    /// records their timings.
    pub profiler_timer: bool,
}

impl WorkConfig {
    pub fn with_double_invoke_in_strict_mode(mut self, enabled: bool) -> Self {
        self.double_invoke_in_strict_mode = enabled;
        self
    }

    pub fn with_profiler_timer(mut self, enabled: bool) -> Self {
        self.profiler_timer = enabled;
        self
    }
}
