// Options for Xdotoolify, chain execution and checkUntil actions
//
// `XdotoolifyOptions` seeds a `Settings` handle. The handle is shared by the
// `Xdotoolify` instance and every page it attaches, so adjusting the default
// checkUntil timeout affects actions built afterwards and nothing else.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default checkUntil timeout in milliseconds.
pub const DEFAULT_CHECK_UNTIL_TIMEOUT_MS: u64 = 3000;

/// Default delay between two checkUntil polls in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Environment variable overriding the default checkUntil timeout.
pub const CHECK_UNTIL_TIMEOUT_ENV: &str = "XDOTOOLIFY_CHECK_UNTIL_TIMEOUT_MS";

/// Environment variable overriding the poll interval.
pub const POLL_INTERVAL_ENV: &str = "XDOTOOLIFY_POLL_INTERVAL_MS";

/// Options for creating an [`Xdotoolify`](crate::Xdotoolify) instance
///
/// All options are optional and fall back to the crate defaults.
///
/// # Example
///
/// ```ignore
/// use xdotoolify::{Xdotoolify, XdotoolifyOptions};
///
/// let options = XdotoolifyOptions::new()
///     .check_until_timeout_ms(5000)
///     .poll_interval_ms(50);
/// let xdo = Xdotoolify::new(options);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XdotoolifyOptions {
    /// Default timeout for checkUntil actions (default: 3000)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_until_timeout_ms: Option<u64>,

    /// Delay between checkUntil polls (default: 100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
}

impl XdotoolifyOptions {
    /// Creates a new XdotoolifyOptions with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads options from `XDOTOOLIFY_CHECK_UNTIL_TIMEOUT_MS` and
    /// `XDOTOOLIFY_POLL_INTERVAL_MS`. Unset variables are left as `None`.
    pub fn from_env() -> Result<Self> {
        Self::new().overlay(|name| std::env::var(name).ok())
    }

    /// Fills options from a variable lookup, keeping values already set.
    pub(crate) fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if self.check_until_timeout_ms.is_none() {
            self.check_until_timeout_ms =
                parse_ms(CHECK_UNTIL_TIMEOUT_ENV, lookup(CHECK_UNTIL_TIMEOUT_ENV))?;
        }
        if self.poll_interval_ms.is_none() {
            self.poll_interval_ms = parse_ms(POLL_INTERVAL_ENV, lookup(POLL_INTERVAL_ENV))?;
        }
        Ok(self)
    }

    /// Set the default checkUntil timeout
    pub fn check_until_timeout_ms(mut self, ms: u64) -> Self {
        self.check_until_timeout_ms = Some(ms);
        self
    }

    /// Set the delay between checkUntil polls
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = Some(ms);
        self
    }
}

fn parse_ms(name: &str, raw: Option<String>) -> Result<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            Error::InvalidArgument(format!(
                "{name} must be a number of milliseconds, got '{raw}': {e}"
            ))
        }),
    }
}

/// Settings shared by an `Xdotoolify` instance and the pages it attaches.
#[derive(Debug, Clone)]
pub struct Settings {
    check_until_timeout_ms: Arc<AtomicU64>,
    poll_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_options(&XdotoolifyOptions::default())
    }
}

impl Settings {
    pub fn from_options(options: &XdotoolifyOptions) -> Self {
        Self {
            check_until_timeout_ms: Arc::new(AtomicU64::new(
                options
                    .check_until_timeout_ms
                    .unwrap_or(DEFAULT_CHECK_UNTIL_TIMEOUT_MS),
            )),
            poll_interval: Duration::from_millis(
                options.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
        }
    }

    /// Timeout given to checkUntil actions built from now on.
    pub fn default_check_until_timeout(&self) -> Duration {
        Duration::from_millis(self.check_until_timeout_ms.load(Ordering::SeqCst))
    }

    pub fn set_default_check_until_timeout(&self, timeout: Duration) {
        let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self.check_until_timeout_ms.store(ms, Ordering::SeqCst);
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Overrides the default timeout until the returned guard is dropped.
    pub fn scoped_check_until_timeout(&self, timeout: Duration) -> TimeoutGuard {
        let previous = self.default_check_until_timeout();
        self.set_default_check_until_timeout(timeout);
        TimeoutGuard {
            settings: self.clone(),
            previous,
        }
    }
}

/// Restores the previous default checkUntil timeout on drop.
#[must_use = "the previous timeout is restored as soon as the guard is dropped"]
pub struct TimeoutGuard {
    settings: Settings,
    previous: Duration,
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.settings.set_default_check_until_timeout(self.previous);
    }
}

/// Options for the terminal `execute` call of a chain (`.do()`)
///
/// # Example
///
/// ```ignore
/// use xdotoolify::DoOptions;
///
/// // Allow interactions without verification in a narrowly scoped helper
/// let options = DoOptions::new().unsafe_mode(true);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoOptions {
    /// Permit deprecated `check` actions and unverified interactions (default: false)
    #[serde(rename = "unsafe")]
    pub unsafe_mode: bool,
    /// Treat errors raised by checkUntil projections and predicates as fatal (default: true)
    pub legacy_check_until: bool,
}

impl Default for DoOptions {
    fn default() -> Self {
        Self {
            unsafe_mode: false,
            legacy_check_until: true,
        }
    }
}

impl DoOptions {
    /// Creates a new DoOptions with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set unsafe mode
    pub fn unsafe_mode(mut self, enabled: bool) -> Self {
        self.unsafe_mode = enabled;
        self
    }

    /// Set legacy checkUntil semantics
    pub fn legacy_check_until(mut self, enabled: bool) -> Self {
        self.legacy_check_until = enabled;
        self
    }
}

/// Per-action overrides for checkUntil
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckUntilOptions {
    /// Overrides the `legacy_check_until` flag of the executing chain
    pub legacy_check_until: Option<bool>,
    /// Overrides the default timeout read when the action is built
    pub timeout: Option<Duration>,
}

impl CheckUntilOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn legacy_check_until(mut self, enabled: bool) -> Self {
        self.legacy_check_until = Some(enabled);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::default();
        assert_eq!(
            settings.default_check_until_timeout(),
            Duration::from_millis(DEFAULT_CHECK_UNTIL_TIMEOUT_MS)
        );
        assert_eq!(settings.poll_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_scoped_timeout_restores_previous_value() {
        let settings = Settings::default();
        {
            let _guard = settings.scoped_check_until_timeout(Duration::from_millis(50));
            assert_eq!(
                settings.default_check_until_timeout(),
                Duration::from_millis(50)
            );
        }
        assert_eq!(
            settings.default_check_until_timeout(),
            Duration::from_millis(3000)
        );
    }

    #[test]
    fn test_settings_clones_share_timeout() {
        let settings = Settings::default();
        let clone = settings.clone();
        settings.set_default_check_until_timeout(Duration::from_secs(7));
        assert_eq!(clone.default_check_until_timeout(), Duration::from_secs(7));
    }

    #[test]
    fn test_overlay_reads_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (CHECK_UNTIL_TIMEOUT_ENV, "1500"),
            (POLL_INTERVAL_ENV, " 20 "),
        ]);
        let options = XdotoolifyOptions::new()
            .overlay(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(options.check_until_timeout_ms, Some(1500));
        assert_eq!(options.poll_interval_ms, Some(20));
    }

    #[test]
    fn test_overlay_keeps_explicit_values() {
        let options = XdotoolifyOptions::new()
            .check_until_timeout_ms(10)
            .overlay(|_| Some("99".to_string()))
            .unwrap();
        assert_eq!(options.check_until_timeout_ms, Some(10));
        assert_eq!(options.poll_interval_ms, Some(99));
    }

    #[test]
    fn test_overlay_rejects_garbage() {
        let err = XdotoolifyOptions::new()
            .overlay(|_| Some("soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(CHECK_UNTIL_TIMEOUT_ENV));
    }

    #[test]
    fn test_do_options_defaults_and_serde() {
        let options = DoOptions::default();
        assert!(!options.unsafe_mode);
        assert!(options.legacy_check_until);

        let parsed: DoOptions =
            serde_json::from_str(r#"{"unsafe": true, "legacyCheckUntil": false}"#).unwrap();
        assert_eq!(
            parsed,
            DoOptions::new().unsafe_mode(true).legacy_check_until(false)
        );
    }

    #[test]
    fn test_options_serialization_skips_unset() {
        let json = serde_json::to_value(XdotoolifyOptions::new().poll_interval_ms(5)).unwrap();
        assert_eq!(json, serde_json::json!({"pollIntervalMs": 5}));
    }
}
