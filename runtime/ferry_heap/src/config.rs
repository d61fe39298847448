//! Evaluator tuning knobs.

/// Environment variable overriding [`EvalConfig::gc_threshold`].
pub const GC_THRESHOLD_VAR: &str = "FERRY_GC_THRESHOLD";
/// Environment variable overriding [`EvalConfig::max_depth`].
pub const MAX_DEPTH_VAR: &str = "FERRY_MAX_DEPTH";

/// Configuration for one evaluator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EvalConfig {
    /// Allocations since the last cycle before
    /// [`Evaluator::collect_garbage_if_due`](crate::Evaluator::collect_garbage_if_due)
    /// runs one.
    pub gc_threshold: usize,
    /// Maximum nesting of forces before evaluation fails with a stack
    /// overflow error.
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            gc_threshold: 4096,
            max_depth: 10_000,
        }
    }
}

impl EvalConfig {
    /// Defaults overridden by `FERRY_GC_THRESHOLD` and `FERRY_MAX_DEPTH`.
    ///
    /// Unparseable or zero values are logged and ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`EvalConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = EvalConfig::default();
        if let Some(value) = read_positive(&lookup, GC_THRESHOLD_VAR) {
            config.gc_threshold = value;
        }
        if let Some(value) = read_positive(&lookup, MAX_DEPTH_VAR) {
            config.max_depth = value;
        }
        config
    }

    #[must_use]
    pub fn with_gc_threshold(mut self, gc_threshold: usize) -> Self {
        self.gc_threshold = gc_threshold;
        self
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

fn read_positive(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<usize> {
    let raw = lookup(key)?;
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Some(value),
        _ => {
            tracing::warn!(key, value = %raw, "ignoring invalid evaluator setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_without_environment() {
        let config = EvalConfig::from_lookup(|_| None);
        assert_eq!(config, EvalConfig::default());
    }

    #[test]
    fn test_overrides_from_lookup() {
        let config = EvalConfig::from_lookup(|key| match key {
            GC_THRESHOLD_VAR => Some("16".to_string()),
            MAX_DEPTH_VAR => Some(" 200 ".to_string()),
            _ => None,
        });
        assert_eq!(
            config,
            EvalConfig {
                gc_threshold: 16,
                max_depth: 200,
            }
        );
    }

    #[test]
    fn test_invalid_values_are_ignored() {
        let config = EvalConfig::from_lookup(|key| match key {
            GC_THRESHOLD_VAR => Some("lots".to_string()),
            MAX_DEPTH_VAR => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config, EvalConfig::default());
    }
}
