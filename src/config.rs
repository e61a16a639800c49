//! Runtime configuration for accelerator backends

/// Environment variable enabling tensor-core math for reduced-precision GEMM
pub const ALLOW_TENSOR_CORE_ENV: &str = "NUMLA_ALLOW_TENSOR_CORE";

/// Settings an accelerator client reads when issuing calls
///
/// The client captures a config when it is created and keeps it for its
/// lifetime; changing the environment afterwards has no effect on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceleratorConfig {
    /// Let the f16 GEMM switch the BLAS handle to tensor-op math for the
    /// duration of the call
    pub allow_tensor_core: bool,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            allow_tensor_core: true,
        }
    }
}

impl AcceleratorConfig {
    /// Read the config from the environment
    ///
    /// `NUMLA_ALLOW_TENSOR_CORE` accepts `1`/`true`/`yes`/`on` and
    /// `0`/`false`/`no`/`off` (case-insensitive). Unset or unrecognized values
    /// keep the default (enabled).
    pub fn from_env() -> Self {
        let default = Self::default();
        let allow_tensor_core = std::env::var(ALLOW_TENSOR_CORE_ENV)
            .ok()
            .and_then(|v| {
                let parsed = parse_flag(&v);
                if parsed.is_none() {
                    tracing::warn!(
                        var = ALLOW_TENSOR_CORE_ENV,
                        value = %v,
                        "unrecognized flag value, keeping default"
                    );
                }
                parsed
            })
            .unwrap_or(default.allow_tensor_core);

        Self { allow_tensor_core }
    }

    /// Same config with tensor-core math set to `allow`
    pub fn with_tensor_core(self, allow: bool) -> Self {
        Self {
            allow_tensor_core: allow,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
