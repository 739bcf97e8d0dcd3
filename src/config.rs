use serde::{Deserialize, Serialize};

pub const ENV_SPARSITY_TURN_POINT: &str = "UAGG_ENGINE_SPARSITY_TURN_POINT";
pub const ENV_FAST_PATH: &str = "UAGG_ENGINE_FAST_PATH";
pub const ENV_TRACE: &str = "UAGG_ENGINE_TRACE";

/// Below this nonzero fraction a multi-column result is stored sparse.
pub const DEFAULT_SPARSITY_TURN_POINT: f64 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    pub sparsity_turn_point: f64,
    /// Allow the sorted counting kernel for comparison + sum aggregates.
    pub fast_path: bool,
    /// Log every processed instruction at debug level.
    pub trace: bool,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            sparsity_turn_point: DEFAULT_SPARSITY_TURN_POINT,
            fast_path: true,
            trace: false,
        }
    }
}

impl ExecConfig {
    /// Defaults overridden by `UAGG_ENGINE_*` environment variables. Values
    /// that do not parse are ignored.
    pub fn from_env() -> Self {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_json_str(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_SPARSITY_TURN_POINT) {
            match raw.trim().parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => self.sparsity_turn_point = v,
                _ => log::warn!("ignoring {ENV_SPARSITY_TURN_POINT}={raw}: expected a value in [0,1]"),
            }
        }
        if let Some(raw) = lookup(ENV_FAST_PATH) {
            self.fast_path = parse_flag(&raw);
        }
        if let Some(raw) = lookup(ENV_TRACE) {
            self.trace = parse_flag(&raw);
        }
        self
    }
}

#[inline]
fn parse_flag(raw: &str) -> bool {
    let v = raw.trim().to_ascii_lowercase();
    matches!(v.as_str(), "1" | "true" | "yes" | "on")
}
