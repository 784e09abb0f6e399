//! Host-behavior overrides.
//!
//! Some callers need to intercept host behaviors that have nothing to do with
//! touch delivery: opening URLs, background/foreground notifications, battery
//! and volume readings, cursor visibility.  Each behavior sits behind the
//! [`HostBehavior`] trait and can be replaced at two scopes:
//!
//! - **static**: [`OverrideRegistry::replace_static`] replaces the behavior
//!   for every host created from the registry;
//! - **instance**: [`PatchedHost::replace_instance`] replaces it for one host
//!   only, and wins over a static replacement.
//!
//! Replacing is idempotent for the same `(origin, replacement)` pair and
//! permanent: there is no removal API.  Asking for a *different* replacement
//! of an already-replaced behavior fails with [`OverrideError::Conflict`].
//!
//! The touch engine never consults this module.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

/// Host behaviors that can be overridden.
#[cfg_attr(test, mockall::automock)]
pub trait HostBehavior: Send + Sync {
    /// Returns `true` if the URL was handled.
    fn open_url(&self, url: &str) -> bool;
    fn enter_background(&self);
    fn enter_foreground(&self);
    /// Charge level in `0.0..=1.0`.
    fn battery_level(&self) -> f32;
    /// Output volume in `0.0..=1.0`.
    fn volume_level(&self) -> f32;
    fn set_cursor_visible(&self, visible: bool);
}

/// Names one overridable entry point of [`HostBehavior`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Behavior {
    OpenUrl,
    EnterBackground,
    EnterForeground,
    BatteryLevel,
    VolumeLevel,
    CursorVisibility,
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Behavior::OpenUrl => "open_url",
            Behavior::EnterBackground => "enter_background",
            Behavior::EnterForeground => "enter_foreground",
            Behavior::BatteryLevel => "battery_level",
            Behavior::VolumeLevel => "volume_level",
            Behavior::CursorVisibility => "cursor_visibility",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverrideError {
    #[error("{scope} behavior {behavior} already replaced by {existing}, cannot replace with {requested}")]
    Conflict {
        scope: &'static str,
        behavior: Behavior,
        existing: String,
        requested: String,
    },
}

/// A named implementation to substitute for one behavior.
///
/// The name is the replacement's identity: replacing twice with the same name
/// is a no-op.
#[derive(Clone)]
pub struct Replacement {
    name: String,
    host: Arc<dyn HostBehavior>,
}

impl Replacement {
    pub fn new(name: impl Into<String>, host: Arc<dyn HostBehavior>) -> Self {
        Self {
            name: name.into(),
            host,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Replacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Replacement").field("name", &self.name).finish()
    }
}

#[derive(Default)]
struct OverrideTable {
    entries: Mutex<HashMap<Behavior, Replacement>>,
}

impl OverrideTable {
    fn replace(
        &self,
        scope: &'static str,
        origin: Behavior,
        replacement: Replacement,
    ) -> Result<(), OverrideError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&origin) {
            Some(existing) if existing.name == replacement.name => {
                debug!(scope, behavior = %origin, replacement = %replacement.name, "override already in place");
                Ok(())
            }
            Some(existing) => Err(OverrideError::Conflict {
                scope,
                behavior: origin,
                existing: existing.name.clone(),
                requested: replacement.name,
            }),
            None => {
                info!(scope, behavior = %origin, replacement = %replacement.name, "host behavior replaced");
                entries.insert(origin, replacement);
                Ok(())
            }
        }
    }

    fn get(&self, behavior: Behavior) -> Option<Arc<dyn HostBehavior>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&behavior)
            .map(|r| Arc::clone(&r.host))
    }
}

/// Static (class-level) overrides shared by every host it creates.
#[derive(Default)]
pub struct OverrideRegistry {
    statics: OverrideTable,
}

impl OverrideRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replaces `origin` for every host created from this registry.
    ///
    /// # Errors
    ///
    /// [`OverrideError::Conflict`] if `origin` already has a different
    /// static replacement.
    pub fn replace_static(
        &self,
        origin: Behavior,
        replacement: Replacement,
    ) -> Result<(), OverrideError> {
        self.statics.replace("static", origin, replacement)
    }

    /// Wraps `base` so its behaviors honour this registry's overrides.
    pub fn host(self: &Arc<Self>, base: Arc<dyn HostBehavior>) -> PatchedHost {
        PatchedHost {
            registry: Arc::clone(self),
            instance: OverrideTable::default(),
            base,
        }
    }
}

/// One host instance with its own overrides layered over the registry's.
pub struct PatchedHost {
    registry: Arc<OverrideRegistry>,
    instance: OverrideTable,
    base: Arc<dyn HostBehavior>,
}

impl PatchedHost {
    /// Replaces `origin` for this host only.
    ///
    /// # Errors
    ///
    /// [`OverrideError::Conflict`] if `origin` already has a different
    /// instance replacement on this host.
    pub fn replace_instance(
        &self,
        origin: Behavior,
        replacement: Replacement,
    ) -> Result<(), OverrideError> {
        self.instance.replace("instance", origin, replacement)
    }

    fn resolve(&self, behavior: Behavior) -> Arc<dyn HostBehavior> {
        self.instance
            .get(behavior)
            .or_else(|| self.registry.statics.get(behavior))
            .unwrap_or_else(|| Arc::clone(&self.base))
    }
}

impl HostBehavior for PatchedHost {
    fn open_url(&self, url: &str) -> bool {
        self.resolve(Behavior::OpenUrl).open_url(url)
    }

    fn enter_background(&self) {
        self.resolve(Behavior::EnterBackground).enter_background();
    }

    fn enter_foreground(&self) {
        self.resolve(Behavior::EnterForeground).enter_foreground();
    }

    fn battery_level(&self) -> f32 {
        self.resolve(Behavior::BatteryLevel).battery_level()
    }

    fn volume_level(&self) -> f32 {
        self.resolve(Behavior::VolumeLevel).volume_level()
    }

    fn set_cursor_visible(&self, visible: bool) {
        self.resolve(Behavior::CursorVisibility)
            .set_cursor_visible(visible);
    }
}

/// Host stand-in used when nothing real is attached: URLs are declined,
/// battery and volume read full, cursor visibility is remembered.
#[derive(Debug)]
pub struct DefaultHost {
    cursor_visible: AtomicBool,
}

impl Default for DefaultHost {
    fn default() -> Self {
        Self {
            cursor_visible: AtomicBool::new(true),
        }
    }
}

impl DefaultHost {
    pub fn cursor_visible(&self) -> bool {
        self.cursor_visible.load(Ordering::Relaxed)
    }
}

impl HostBehavior for DefaultHost {
    fn open_url(&self, url: &str) -> bool {
        debug!(url, "no host to open url");
        false
    }

    fn enter_background(&self) {
        debug!("host entered background");
    }

    fn enter_foreground(&self) {
        debug!("host entered foreground");
    }

    fn battery_level(&self) -> f32 {
        1.0
    }

    fn volume_level(&self) -> f32 {
        1.0
    }

    fn set_cursor_visible(&self, visible: bool) {
        self.cursor_visible.store(visible, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_battery(level: f32) -> Arc<dyn HostBehavior> {
        let mut mock = MockHostBehavior::new();
        mock.expect_battery_level().return_const(level);
        Arc::new(mock)
    }

    #[test]
    fn test_unpatched_host_uses_base_behavior() {
        let registry = OverrideRegistry::new();
        let host = registry.host(Arc::new(DefaultHost::default()));

        assert_eq!(host.battery_level(), 1.0);
        assert!(!host.open_url("https://example.com"));
    }

    #[test]
    fn test_static_replacement_applies_to_every_host() {
        // Arrange
        let registry = OverrideRegistry::new();
        let a = registry.host(Arc::new(DefaultHost::default()));
        let b = registry.host(Arc::new(DefaultHost::default()));

        // Act
        registry
            .replace_static(Behavior::BatteryLevel, Replacement::new("half", fixed_battery(0.5)))
            .unwrap();

        // Assert
        assert_eq!(a.battery_level(), 0.5);
        assert_eq!(b.battery_level(), 0.5);
        assert_eq!(a.volume_level(), 1.0, "other behaviors untouched");
    }

    #[test]
    fn test_instance_replacement_wins_over_static() {
        let registry = OverrideRegistry::new();
        let a = registry.host(Arc::new(DefaultHost::default()));
        let b = registry.host(Arc::new(DefaultHost::default()));
        registry
            .replace_static(Behavior::BatteryLevel, Replacement::new("half", fixed_battery(0.5)))
            .unwrap();

        a.replace_instance(Behavior::BatteryLevel, Replacement::new("low", fixed_battery(0.1)))
            .unwrap();

        assert_eq!(a.battery_level(), 0.1);
        assert_eq!(b.battery_level(), 0.5);
    }

    #[test]
    fn test_same_replacement_twice_is_idempotent() {
        let registry = OverrideRegistry::new();
        let replacement = Replacement::new("half", fixed_battery(0.5));

        registry
            .replace_static(Behavior::BatteryLevel, replacement.clone())
            .unwrap();
        let second = registry.replace_static(Behavior::BatteryLevel, replacement);

        assert_eq!(second, Ok(()));
    }

    #[test]
    fn test_conflicting_replacement_is_rejected() {
        // Arrange
        let registry = OverrideRegistry::new();
        let host = registry.host(Arc::new(DefaultHost::default()));
        host.replace_instance(Behavior::BatteryLevel, Replacement::new("half", fixed_battery(0.5)))
            .unwrap();

        // Act
        let err = host
            .replace_instance(Behavior::BatteryLevel, Replacement::new("low", fixed_battery(0.1)))
            .unwrap_err();

        // Assert – the first replacement stays in place
        assert_eq!(
            err,
            OverrideError::Conflict {
                scope: "instance",
                behavior: Behavior::BatteryLevel,
                existing: "half".to_string(),
                requested: "low".to_string(),
            }
        );
        assert_eq!(host.battery_level(), 0.5);
    }

    #[test]
    fn test_url_interception_forwards_the_url() {
        let mut mock = MockHostBehavior::new();
        mock.expect_open_url()
            .withf(|url| url == "app://settings")
            .times(1)
            .return_const(true);
        let registry = OverrideRegistry::new();
        let host = registry.host(Arc::new(DefaultHost::default()));
        host.replace_instance(Behavior::OpenUrl, Replacement::new("intercept", Arc::new(mock)))
            .unwrap();

        assert!(host.open_url("app://settings"));
    }

    #[test]
    fn test_default_host_remembers_cursor_visibility() {
        let host = DefaultHost::default();

        host.set_cursor_visible(false);

        assert!(!host.cursor_visible());
    }
}
