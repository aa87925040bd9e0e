//! Synchronous entry points for listing and bulk-deleting contacts.
//!
//! The interface owns the shared [`Persistor`] and hands its connection to one
//! request at a time. It is deliberately blocking; the HTTP layer calls into it
//! from the runtime's blocking pool.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use crate::bulk::{BulkDelete, Coordinator};
use crate::construct::{BulkOutcome, Contact, TenantId};
use crate::error::Result;
use crate::executor;
use crate::filter::{FilterPolicy, FilterState, RawFilterState};
use crate::persist::Persistor;
use crate::search;

pub struct ContactInterface {
    persistor: Arc<Mutex<Persistor>>,
    policy: FilterPolicy,
}

impl ContactInterface {
    pub fn new(persistor: Persistor, policy: FilterPolicy) -> Self {
        Self {
            persistor: Arc::new(Mutex::new(persistor)),
            policy,
        }
    }

    pub fn persistor(&self) -> Arc<Mutex<Persistor>> {
        Arc::clone(&self.persistor)
    }

    pub fn policy(&self) -> FilterPolicy {
        self.policy
    }

    /// Parses the `filters` query parameter of the list endpoint.
    ///
    /// Under the lenient policy text that is not a filter at all is logged and
    /// read as "no filter". A well formed filter with bad conditions is still
    /// rejected.
    pub fn parse_filters(&self, filters: Option<&str>) -> Result<Option<FilterState>> {
        let Some(text) = filters.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(None);
        };
        let raw = match RawFilterState::from_json(text) {
            Ok(raw) => raw,
            Err(e) if self.policy == FilterPolicy::Lenient => {
                warn!(error = %e, "ignoring unparsable filters");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        FilterState::from_wire(raw, self.policy).map(Some)
    }

    pub fn list(
        &self,
        tenant: &TenantId,
        filter: Option<&FilterState>,
        search_term: Option<&str>,
    ) -> Result<Vec<Contact>> {
        let query = search::matching(tenant, filter, search_term);
        let persistor = self.persistor.lock()?;
        let contacts = executor::fetch_contacts(persistor.connection(), &query)?;
        info!(tenant = %tenant, rows = contacts.len(), "contacts listed");
        Ok(contacts)
    }

    pub fn bulk_delete(&self, tenant: &TenantId, request: BulkDelete) -> Result<BulkOutcome> {
        let mut persistor = self.persistor.lock()?;
        Coordinator::new(tenant, request).run(persistor.connection_mut())
    }
}
