//! Environment variable-based configuration for the coroutine runtime.
//!
//! ## `CHECKROUTE_STACK_SIZE`
//!
//! Sets the stack size for handler coroutines. Accepts decimal (`16384`) or
//! hexadecimal (`0x4000`) values; defaults to 16 KiB. Total memory is
//! `stack_size × concurrent coroutines`, so tune it to your handler depth.

use std::env;

/// Runtime configuration loaded from environment variables.
///
/// Load this at startup with [`RuntimeConfig::from_env`] before spawning any
/// handler coroutines.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    /// Stack size for handler coroutines in bytes (default: 16 KiB / 0x4000)
    pub stack_size: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_STACK_SIZE: usize = 0x4000;

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let stack_size = match env::var("CHECKROUTE_STACK_SIZE") {
            Ok(val) => {
                if let Some(hex) = val.strip_prefix("0x") {
                    usize::from_str_radix(hex, 16).unwrap_or(Self::DEFAULT_STACK_SIZE)
                } else {
                    val.parse().unwrap_or(Self::DEFAULT_STACK_SIZE)
                }
            }
            Err(_) => Self::DEFAULT_STACK_SIZE,
        };
        RuntimeConfig { stack_size }
    }
}
