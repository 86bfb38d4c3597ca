//! # Global platform configuration.
//!
//! Provides [`Config`], centralized settings for the platform runtime.
//!
//! Config is consumed once, by `PlatformBuilder::build`. It derives
//! `Deserialize` (every field defaulted) so embedders can load it from any
//! serde source; loading itself is left to the embedding application.
//!
//! ## Sentinel values
//! - `max_frames = 0` → the built-in limit ([`DEFAULT_MAX_FRAMES`])
//! - `bus_capacity = 0` → clamped to 1 by the bus

use serde::Deserialize;

/// Frame-depth limit used when `max_frames` is `0`.
pub const DEFAULT_MAX_FRAMES: usize = 256;

/// Global configuration for the platform runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `max_frames`: Frame-stack depth per runtime (`0` = built-in default)
/// - `log_ops`: Publish an `OpExecuted` event for every dispatched opcode
/// - `handle_signals`: `Platform::run` stops on SIGINT/SIGTERM/Ctrl-C
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items.
    pub bus_capacity: usize,

    /// Maximum number of frames a single runtime may stack.
    ///
    /// Exceeding it raises `VmError::FrameOverflow` on the executing actor.
    pub max_frames: usize,

    /// Trace every opcode on the bus (very chatty; debugging only).
    pub log_ops: bool,

    /// Whether `Platform::run` listens for OS termination signals.
    pub handle_signals: bool,
}

impl Config {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the effective frame-depth limit.
    #[inline]
    pub fn frame_limit(&self) -> usize {
        if self.max_frames == 0 {
            DEFAULT_MAX_FRAMES
        } else {
            self.max_frames
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024` (good baseline)
    /// - `max_frames = 256`
    /// - `log_ops = false`
    /// - `handle_signals = false` (embedders opt in)
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            max_frames: DEFAULT_MAX_FRAMES,
            log_ops: false,
            handle_signals: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinels() {
        let cfg = Config {
            bus_capacity: 0,
            max_frames: 0,
            ..Config::default()
        };
        assert_eq!(cfg.bus_capacity_clamped(), 1);
        assert_eq!(cfg.frame_limit(), DEFAULT_MAX_FRAMES);
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let cfg: Config = serde_json::from_str(r#"{ "max_frames": 8, "log_ops": true }"#).unwrap();
        assert_eq!(cfg.max_frames, 8);
        assert!(cfg.log_ops);
        assert_eq!(cfg.bus_capacity, 1024);
        assert!(!cfg.handle_signals);
    }
}
