//! Leadsift – tenant scoped contact filtering and bulk deletion.
//!
//! Users describe a boolean query over their organization's contacts as a list
//! of `{field, operator, value}` conditions joined by AND or OR. The same query
//! either lists contacts or selects them for a bulk delete. Two things matter
//! above all else:
//! * Filters are untrusted. They are compiled into parameterized SQL where only
//!   allowlisted column names reach the statement text, values are always bound,
//!   and every statement carries the tenant scope.
//! * Bulk deletion is all-or-nothing. Contacts with in-flight workflow states are
//!   only deleted when the caller forces a cascade, and either everything the
//!   request resolved to is removed or nothing is.
//!
//! ## Modules
//! * [`registry`] – The allowlist of filterable fields and their kinds.
//! * [`filter`] – The filter AST, its wire form and validation policy.
//! * [`compile`] – Compiles a filter into a tenant scoped, parameterized clause.
//! * [`search`] – Adds a free-text search to a compiled clause.
//! * [`executor`] – Runs compiled clauses and shapes contact rows.
//! * [`bulk`] – The bulk delete coordinator.
//! * [`persist`] – SQLite schema and write helpers.
//! * [`interface`] – Blocking entry points shared by the HTTP layer and tests.
//! * [`server`] – The HTTP endpoints.
//!
//! ## Quick Start
//! ```
//! use leadsift::construct::{NewContact, PersistenceMode, TenantId};
//! use leadsift::filter::{Condition, FilterPolicy, FilterState};
//! use leadsift::interface::ContactInterface;
//! use leadsift::persist::Persistor;
//!
//! let persistor = Persistor::new(PersistenceMode::InMemory).unwrap();
//! let tenant = TenantId::new("acme");
//! persistor.add_contact(&tenant, &NewContact::new("c1").email("a@x.com")).unwrap();
//! persistor.add_contact(&tenant, &NewContact::new("c2").email("b@x.com")).unwrap();
//! let contacts = ContactInterface::new(persistor, FilterPolicy::Lenient);
//! let filter = FilterState::all(vec![Condition::contains("email", "a@")]);
//! let rows = contacts.list(&tenant, Some(&filter), None).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod bulk;
pub mod compile;
pub mod config;
pub mod construct;
pub mod datatype;
pub mod error;
pub mod executor;
pub mod filter;
pub mod interface;
pub mod persist;
pub mod registry;
pub mod search;
pub mod server;

pub use error::{LeadsiftError, Result};
