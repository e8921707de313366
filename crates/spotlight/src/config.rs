#![forbid(unsafe_code)]

//! Focus engine configuration.

use std::time::Duration;

use crate::focus::accelerator::AcceleratorConfig;

/// Configuration for [`FocusManager`](crate::focus::FocusManager).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FocusConfig {
    /// Key-repeat throttling.
    pub accelerator: AcceleratorConfig,

    /// After the pointer is hidden, keys arriving within this window are
    /// dropped and pointer mode ends once it elapses. Default: 30ms.
    pub pointer_hide_debounce: Duration,

    /// Platform has no distinct pointer mode. Default: false.
    pub touch_only: bool,

    /// Mode entered at initialization. Default: false.
    pub initial_pointer_mode: bool,

    /// Log transient focus loss at `info` instead of `debug`. Default: false.
    pub verbose: bool,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            accelerator: AcceleratorConfig::default(),
            pointer_hide_debounce: Duration::from_millis(30),
            touch_only: false,
            initial_pointer_mode: false,
            verbose: false,
        }
    }
}

impl FocusConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set the accelerator configuration.
    #[must_use]
    pub fn with_accelerator(mut self, accelerator: AcceleratorConfig) -> Self {
        self.accelerator = accelerator;
        self
    }

    /// Builder: set the pointer-hide debounce window.
    #[must_use]
    pub fn with_pointer_hide_debounce(mut self, debounce: Duration) -> Self {
        self.pointer_hide_debounce = debounce;
        self
    }

    /// Builder: mark the platform as touch-only.
    #[must_use]
    pub fn with_touch_only(mut self, touch_only: bool) -> Self {
        self.touch_only = touch_only;
        self
    }

    /// Builder: start in pointer mode.
    #[must_use]
    pub fn with_initial_pointer_mode(mut self, pointer_mode: bool) -> Self {
        self.initial_pointer_mode = pointer_mode;
        self
    }

    /// Builder: verbose fallback logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
