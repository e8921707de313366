#![forbid(unsafe_code)]

//! Key-repeat accelerator.
//!
//! Holding a direction key produces a stream of repeated key-downs. The
//! accelerator lets only some of them through: one of every `N` repeats,
//! where `N` comes from a frequency table indexed by whole seconds since the
//! key went down. The default table `[3, 3, 3, 2, 2, 2, 1]` starts slow and
//! settles at full rate after six seconds.
//!
//! # Invariants
//!
//! 1. The first key-down of a new key code always dispatches.
//! 2. A key release always dispatches and resets the streak.
//! 3. After [`Accelerator::cancel`], repeats of the same key are suppressed
//!    until the key is released or a different key goes down.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Empty frequency table | Every repeat dispatches |
//! | Table entry of 0 | Treated as 1 (no skipping) |
//! | Clock goes backwards | Elapsed time saturates at 0 |

use spotlight_core::event::{KeyCode, KeyEvent, KeyEventKind};
use web_time::Instant;

/// Frequency table used when none is configured.
pub const DEFAULT_FREQUENCY: [u32; 7] = [3, 3, 3, 2, 2, 2, 1];

/// Configuration for the key-repeat accelerator.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AcceleratorConfig {
    /// "Allow 1 of every N repeats", indexed by elapsed whole seconds and
    /// clamped at the last entry.
    pub frequency: Vec<u32>,
}

impl Default for AcceleratorConfig {
    fn default() -> Self {
        Self {
            frequency: DEFAULT_FREQUENCY.to_vec(),
        }
    }
}

impl AcceleratorConfig {
    /// Builder: replace the frequency table.
    #[must_use]
    pub fn with_frequency(mut self, frequency: impl Into<Vec<u32>>) -> Self {
        self.frequency = frequency.into();
        self
    }
}

/// Outcome of feeding one key event to the accelerator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    /// Let the event through.
    Dispatch,
    /// Swallow the event; the caller should treat it as handled.
    Suppress,
}

impl KeyDecision {
    /// Whether the event should be acted on.
    #[inline]
    #[must_use]
    pub const fn is_dispatch(self) -> bool {
        matches!(self, Self::Dispatch)
    }
}

/// Throttles repeated key-down events.
#[derive(Debug, Clone, Default)]
pub struct Accelerator {
    config: AcceleratorConfig,
    skipped: u32,
    window_start: Option<Instant>,
    active_key: Option<KeyCode>,
    canceled: bool,
    accelerating: bool,
}

impl Accelerator {
    /// Create an accelerator with the given configuration.
    #[must_use]
    pub fn new(config: AcceleratorConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &AcceleratorConfig {
        &self.config
    }

    /// Feed a key event using the current time.
    pub fn process_key(&mut self, event: &KeyEvent) -> KeyDecision {
        self.process_key_at(event, Instant::now())
    }

    /// Feed a key event observed at `now`.
    pub fn process_key_at(&mut self, event: &KeyEvent, now: Instant) -> KeyDecision {
        if event.kind == KeyEventKind::Release {
            self.reset();
            return KeyDecision::Dispatch;
        }

        if self.active_key != Some(event.code) {
            self.reset();
            self.window_start = Some(now);
            self.active_key = Some(event.code);
            return KeyDecision::Dispatch;
        }

        if self.canceled {
            return KeyDecision::Suppress;
        }

        let elapsed = self
            .window_start
            .map(|start| now.saturating_duration_since(start).as_secs())
            .unwrap_or(0);
        let last = self.config.frequency.len().saturating_sub(1);
        let index = usize::try_from(elapsed).unwrap_or(usize::MAX).min(last);
        let to_skip = self
            .config
            .frequency
            .get(index)
            .map_or(0, |n| n.saturating_sub(1));

        self.accelerating = !(index == 0 && self.skipped == 0);

        if self.skipped >= to_skip {
            self.skipped = 0;
            KeyDecision::Dispatch
        } else {
            self.skipped += 1;
            KeyDecision::Suppress
        }
    }

    /// Suppress further repeats of the current key.
    pub fn cancel(&mut self) {
        self.canceled = true;
    }

    /// Clear all streak state, including the canceled flag.
    pub fn reset(&mut self) {
        self.skipped = 0;
        self.window_start = None;
        self.active_key = None;
        self.canceled = false;
        self.accelerating = false;
    }

    /// Whether a repeat streak is in progress.
    #[must_use]
    pub fn is_accelerating(&self) -> bool {
        self.accelerating
    }

    /// Whether the current streak was canceled.
    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }

    /// Key code of the current streak.
    #[must_use]
    pub fn active_key(&self) -> Option<KeyCode> {
        self.active_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn down() -> KeyEvent {
        KeyEvent::press(KeyCode::Down)
    }

    fn feed(acc: &mut Accelerator, ev: &KeyEvent, at: Instant, n: usize) -> Vec<KeyDecision> {
        (0..n).map(|_| acc.process_key_at(ev, at)).collect()
    }

    #[test]
    fn first_press_dispatches() {
        let mut acc = Accelerator::default();
        assert_eq!(acc.process_key_at(&down(), Instant::now()), KeyDecision::Dispatch);
        assert!(!acc.is_accelerating());
        assert_eq!(acc.active_key(), Some(KeyCode::Down));
    }

    #[test]
    fn one_in_three_during_first_second() {
        let mut acc = Accelerator::default();
        let t0 = Instant::now();
        acc.process_key_at(&down(), t0);
        let decisions = feed(&mut acc, &down(), t0 + Duration::from_millis(100), 6);
        assert_eq!(
            decisions,
            vec![
                KeyDecision::Suppress,
                KeyDecision::Suppress,
                KeyDecision::Dispatch,
                KeyDecision::Suppress,
                KeyDecision::Suppress,
                KeyDecision::Dispatch,
            ]
        );
        assert!(acc.is_accelerating());
    }

    #[test]
    fn rate_rises_with_elapsed_time() {
        let mut acc = Accelerator::default();
        let t0 = Instant::now();
        acc.process_key_at(&down(), t0);

        let at_4s = t0 + Duration::from_secs(4);
        assert_eq!(
            feed(&mut acc, &down(), at_4s, 4),
            vec![
                KeyDecision::Suppress,
                KeyDecision::Dispatch,
                KeyDecision::Suppress,
                KeyDecision::Dispatch,
            ]
        );

        let at_30s = t0 + Duration::from_secs(30);
        assert!(
            feed(&mut acc, &down(), at_30s, 5)
                .iter()
                .all(|d| d.is_dispatch())
        );
    }

    #[test]
    fn cancel_swallows_until_release() {
        let mut acc = Accelerator::default();
        let t0 = Instant::now();
        acc.process_key_at(&down(), t0);
        acc.cancel();
        assert!(acc.is_canceled());
        let later = t0 + Duration::from_secs(10);
        assert!(
            feed(&mut acc, &down(), later, 5)
                .iter()
                .all(|d| *d == KeyDecision::Suppress)
        );

        assert_eq!(
            acc.process_key_at(&KeyEvent::release(KeyCode::Down), later),
            KeyDecision::Dispatch
        );
        assert!(!acc.is_canceled());
        assert_eq!(acc.process_key_at(&down(), later), KeyDecision::Dispatch);
    }

    #[test]
    fn cancel_cleared_by_new_key() {
        let mut acc = Accelerator::default();
        let t0 = Instant::now();
        acc.process_key_at(&down(), t0);
        acc.cancel();
        assert_eq!(
            acc.process_key_at(&KeyEvent::press(KeyCode::Up), t0),
            KeyDecision::Dispatch
        );
        assert!(!acc.is_canceled());
    }

    #[test]
    fn release_resets_streak() {
        let mut acc = Accelerator::default();
        let t0 = Instant::now();
        acc.process_key_at(&down(), t0);
        acc.process_key_at(&down(), t0);
        assert!(!acc.is_accelerating());
        acc.process_key_at(&down(), t0);
        assert!(acc.is_accelerating());
        acc.process_key_at(&KeyEvent::release(KeyCode::Down), t0);
        assert!(!acc.is_accelerating());
        assert_eq!(acc.active_key(), None);
    }

    #[test]
    fn empty_table_never_skips() {
        let mut acc = Accelerator::new(AcceleratorConfig::default().with_frequency(Vec::new()));
        let t0 = Instant::now();
        assert!(feed(&mut acc, &down(), t0, 8).iter().all(|d| d.is_dispatch()));
    }

    #[test]
    fn zero_entry_means_no_skipping() {
        let mut acc = Accelerator::new(AcceleratorConfig::default().with_frequency([0]));
        let t0 = Instant::now();
        assert!(feed(&mut acc, &down(), t0, 4).iter().all(|d| d.is_dispatch()));
    }
}
