//! Provider availability snapshot

use agent_core::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which providers can currently be called
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAvailability {
    available: BTreeSet<ProviderId>,
}

impl ProviderAvailability {
    /// Nothing available
    pub fn none() -> Self {
        Self::default()
    }

    /// Every provider available
    pub fn all_available() -> Self {
        Self {
            available: ProviderId::ALL.into_iter().collect(),
        }
    }

    /// A provider is available when its credential variable is set and non-empty
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`Self::from_env`] with a custom variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            available: ProviderId::ALL
                .into_iter()
                .filter(|p| {
                    lookup(p.credential_env_var()).is_some_and(|v| !v.trim().is_empty())
                })
                .collect(),
        }
    }

    pub fn with(mut self, provider: ProviderId, available: bool) -> Self {
        self.set(provider, available);
        self
    }

    pub fn set(&mut self, provider: ProviderId, available: bool) {
        if available {
            self.available.insert(provider);
        } else {
            self.available.remove(&provider);
        }
    }

    pub fn is_available(&self, provider: ProviderId) -> bool {
        self.available.contains(&provider)
    }

    pub fn providers(&self) -> impl Iterator<Item = ProviderId> + '_ {
        self.available.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_empty()
    }
}

impl FromIterator<ProviderId> for ProviderAvailability {
    fn from_iter<I: IntoIterator<Item = ProviderId>>(iter: I) -> Self {
        Self {
            available: iter.into_iter().collect(),
        }
    }
}
