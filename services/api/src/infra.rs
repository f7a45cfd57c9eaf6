//! In-memory collaborator implementations and shared server state.
//!
//! Real deployments would back the catalog and directory with the listing
//! and identity services; these mutexed maps carry the same contracts for
//! local serving, demos, and tests.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use metrics_exporter_prometheus::PrometheusHandle;
use pawstay::booking::directory::{
    AccountDirectory, AccountProfile, AccountRole, DirectoryError, HostApproval, PropertyCatalog,
    PropertySnapshot,
};
use pawstay::booking::domain::{AccountId, PropertyId};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryPropertyCatalog {
    properties: Arc<Mutex<HashMap<PropertyId, PropertySnapshot>>>,
}

impl InMemoryPropertyCatalog {
    pub(crate) fn upsert(&self, snapshot: PropertySnapshot) {
        let mut guard = self.properties.lock().expect("catalog mutex poisoned");
        guard.insert(snapshot.id.clone(), snapshot);
    }
}

impl PropertyCatalog for InMemoryPropertyCatalog {
    fn property(&self, id: &PropertyId) -> Result<Option<PropertySnapshot>, DirectoryError> {
        let guard = self.properties.lock().expect("catalog mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAccountDirectory {
    accounts: Arc<Mutex<HashMap<AccountId, AccountProfile>>>,
}

impl InMemoryAccountDirectory {
    pub(crate) fn upsert(&self, profile: AccountProfile) {
        let mut guard = self.accounts.lock().expect("directory mutex poisoned");
        guard.insert(profile.id.clone(), profile);
    }
}

impl AccountDirectory for InMemoryAccountDirectory {
    fn account(&self, id: &AccountId) -> Result<Option<AccountProfile>, DirectoryError> {
        let guard = self.accounts.lock().expect("directory mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

/// Seed a small fixture set: two active listings, one pending listing, one
/// guest, and the hosts behind the listings.
pub(crate) fn seed_fixtures(
    catalog: &InMemoryPropertyCatalog,
    directory: &InMemoryAccountDirectory,
) {
    directory.upsert(AccountProfile {
        id: AccountId("guest-ada".to_string()),
        role: AccountRole::Guest,
    });
    directory.upsert(AccountProfile {
        id: AccountId("host-bea".to_string()),
        role: AccountRole::Host,
    });
    directory.upsert(AccountProfile {
        id: AccountId("host-cal".to_string()),
        role: AccountRole::Host,
    });

    catalog.upsert(PropertySnapshot {
        id: PropertyId("den-riverside".to_string()),
        host_id: AccountId("host-bea".to_string()),
        nightly_rate_cents: 10_000,
        max_pets: 2,
        approval: HostApproval::Active,
    });
    catalog.upsert(PropertySnapshot {
        id: PropertyId("den-hillside".to_string()),
        host_id: AccountId("host-bea".to_string()),
        nightly_rate_cents: 14_500,
        max_pets: 1,
        approval: HostApproval::Active,
    });
    catalog.upsert(PropertySnapshot {
        id: PropertyId("den-meadow".to_string()),
        host_id: AccountId("host-cal".to_string()),
        nightly_rate_cents: 9_000,
        max_pets: 3,
        approval: HostApproval::Pending,
    });
}
