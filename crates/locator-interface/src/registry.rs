//! ChannelRegistry: process-wide registration of client channels
//!
//! Registering a channel makes it the carrier for every proxy bound through
//! it. Registration is keyed by channel kind and reference counted, so two
//! locators in the same process share one channel instead of fighting over
//! the slot.

use crate::{ClientChannel, Transport, TransportError};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Registry of client channels shared by everything in the process
pub trait TransportRegistry: Send + Sync {
    /// Return the channel registered for `transport.kind()`, opening and
    /// registering a new one if none is registered yet.
    ///
    /// Every successful call must be paired with one `release`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Registry` if a channel of the same kind is
    /// registered with a different `Transport::profile`.
    fn acquire(&self, transport: &dyn Transport) -> Result<Arc<dyn ClientChannel>, TransportError>;

    /// Drop one lease on the channel of `kind`.
    ///
    /// Returns `false` if no channel of that kind is registered.
    fn release(&self, kind: &str) -> bool;

    /// The channel currently registered for `kind`, if any
    fn registered(&self, kind: &str) -> Option<Arc<dyn ClientChannel>>;

    /// Number of outstanding leases on `kind`
    fn lease_count(&self, kind: &str) -> usize;
}

struct Registration {
    channel: Arc<dyn ClientChannel>,
    profile: String,
    leases: usize,
}

static GLOBAL: Lazy<Arc<ChannelRegistry>> = Lazy::new(|| Arc::new(ChannelRegistry::new()));

/// Mutex-guarded, reference-counted channel registry
#[derive(Default)]
pub struct ChannelRegistry {
    channels: Mutex<HashMap<String, Registration>>,
}

impl ChannelRegistry {
    /// Create an empty registry, independent of the process-wide one
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry
    pub fn global() -> Arc<ChannelRegistry> {
        GLOBAL.clone()
    }

    /// Kinds of all registered channels
    pub fn kinds(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Registration>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TransportRegistry for ChannelRegistry {
    fn acquire(&self, transport: &dyn Transport) -> Result<Arc<dyn ClientChannel>, TransportError> {
        let kind = transport.kind();
        let profile = transport.profile();
        let mut channels = self.lock();

        if let Some(registration) = channels.get_mut(kind) {
            if registration.profile != profile {
                return Err(TransportError::Registry(format!(
                    "{} channel already registered with [{}], requested [{}]",
                    kind, registration.profile, profile
                )));
            }
            registration.leases += 1;
            debug!(
                "Reusing registered {} channel ({} leases)",
                kind, registration.leases
            );
            return Ok(registration.channel.clone());
        }

        let channel = transport.open_channel()?;
        if channel.kind() != kind {
            return Err(TransportError::Registry(format!(
                "transport of kind {} opened a {} channel",
                kind,
                channel.kind()
            )));
        }

        info!("Registering {} channel", kind);
        channels.insert(
            kind.to_string(),
            Registration {
                channel: channel.clone(),
                profile,
                leases: 1,
            },
        );

        Ok(channel)
    }

    fn release(&self, kind: &str) -> bool {
        let mut channels = self.lock();

        let Some(registration) = channels.get_mut(kind) else {
            warn!("Release of unregistered {} channel ignored", kind);
            return false;
        };

        registration.leases -= 1;
        if registration.leases == 0 {
            channels.remove(kind);
            info!("Unregistered {} channel", kind);
        } else {
            debug!(
                "Released {} channel ({} leases left)",
                kind, registration.leases
            );
        }

        true
    }

    fn registered(&self, kind: &str) -> Option<Arc<dyn ClientChannel>> {
        self.lock().get(kind).map(|r| r.channel.clone())
    }

    fn lease_count(&self, kind: &str) -> usize {
        self.lock().get(kind).map_or(0, |r| r.leases)
    }
}
