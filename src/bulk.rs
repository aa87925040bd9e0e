//! Bulk deletion of contacts.
//!
//! A [`Coordinator`] drives one request through
//! `Start -> ResolvingTargets -> CheckingDependents -> {Aborted | CascadingDeletes} -> Deleting -> Completed`
//! inside a single transaction. Every state is one function returning the next
//! state; a failure anywhere becomes `Aborted`, and an aborted run is rolled
//! back as a whole. Nothing is committed before `Completed`.
//!
//! An explicit id list of which the tenant owns none completes straight away
//! with zero counts. A select-all-matching request that matches nothing is
//! `NotFound`.

use std::collections::HashSet;
use std::fmt;

use rusqlite::{Connection, params_from_iter};
use tracing::{debug, info, warn};

use crate::compile::{CONTACT, Clause, Rendered};
use crate::construct::{BulkOutcome, TenantId};
use crate::error::{LeadsiftError, Result};
use crate::executor;
use crate::filter::FilterState;
use crate::search;

/// Ids per statement; keeps us well below SQLite's bound variable limit.
pub const ID_BATCH: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Exactly these contacts, as far as the tenant owns them.
    Explicit(Vec<String>),
    /// Whatever the filter and search term select right now.
    Matching {
        filter: Option<FilterState>,
        search_term: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkDelete {
    pub selection: Selection,
    /// Delete dependent workflow states instead of refusing.
    pub force: bool,
}
impl BulkDelete {
    pub fn explicit(ids: Vec<String>, force: bool) -> Self {
        Self {
            selection: Selection::Explicit(ids),
            force,
        }
    }
    pub fn matching(filter: Option<FilterState>, search_term: Option<String>, force: bool) -> Self {
        Self {
            selection: Selection::Matching {
                filter,
                search_term,
            },
            force,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    pub ids: Vec<String>,
    pub invalid_count: usize,
}

#[derive(Debug)]
enum Stage {
    Start,
    ResolvingTargets,
    CheckingDependents(TargetSet),
    CascadingDeletes(TargetSet),
    Deleting(TargetSet),
    Completed(BulkOutcome),
    Aborted(LeadsiftError),
}
impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Self::Start => "Start",
            Self::ResolvingTargets => "ResolvingTargets",
            Self::CheckingDependents(_) => "CheckingDependents",
            Self::CascadingDeletes(_) => "CascadingDeletes",
            Self::Deleting(_) => "Deleting",
            Self::Completed(_) => "Completed",
            Self::Aborted(_) => "Aborted",
        };
        f.write_str(name)
    }
}

pub struct Coordinator<'t> {
    tenant: &'t TenantId,
    request: BulkDelete,
}

impl<'t> Coordinator<'t> {
    pub fn new(tenant: &'t TenantId, request: BulkDelete) -> Self {
        Self { tenant, request }
    }

    pub fn run(&self, conn: &mut Connection) -> Result<BulkOutcome> {
        let tx = conn.transaction()?;
        let mut stage = Stage::Start;
        let finished = loop {
            debug!(tenant = %self.tenant, stage = %stage, "bulk delete");
            stage = match stage {
                Stage::Start => Stage::ResolvingTargets,
                Stage::ResolvingTargets => self.resolve_targets(&tx).unwrap_or_else(Stage::Aborted),
                Stage::CheckingDependents(targets) => self
                    .check_dependents(&tx, targets)
                    .unwrap_or_else(Stage::Aborted),
                Stage::CascadingDeletes(targets) => self
                    .cascade_deletes(&tx, targets)
                    .unwrap_or_else(Stage::Aborted),
                Stage::Deleting(targets) => self.delete(&tx, targets).unwrap_or_else(Stage::Aborted),
                Stage::Completed(outcome) => break Ok(outcome),
                Stage::Aborted(e) => break Err(e),
            };
        };
        match finished {
            Ok(outcome) => {
                tx.commit()?;
                info!(
                    tenant = %self.tenant,
                    deleted = outcome.deleted_count,
                    invalid = outcome.invalid_count,
                    "bulk delete committed"
                );
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(tenant = %self.tenant, error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    fn resolve_targets(&self, tx: &Connection) -> Result<Stage> {
        let targets = match &self.request.selection {
            Selection::Explicit(requested) => {
                let requested = distinct(requested);
                let owned = self.owned_ids(tx, &requested)?;
                let ids: Vec<String> = requested
                    .iter()
                    .filter(|id| owned.contains(*id))
                    .cloned()
                    .collect();
                // Nothing left that the tenant owns, e.g. a repeated request.
                // Completes as a no-op so the request stays idempotent.
                if ids.is_empty() {
                    debug!(tenant = %self.tenant, requested = requested.len(), "nothing to delete");
                    return Ok(Stage::Completed(BulkOutcome::default()));
                }
                TargetSet {
                    invalid_count: requested.len() - ids.len(),
                    ids,
                }
            }
            Selection::Matching {
                filter,
                search_term,
            } => {
                let query = search::matching(self.tenant, filter.as_ref(), search_term.as_deref());
                let ids = executor::fetch_ids(tx, &query)?;
                if ids.is_empty() {
                    return Err(LeadsiftError::NotFound(
                        "no contacts match the current filter".to_string(),
                    ));
                }
                TargetSet {
                    ids,
                    invalid_count: 0,
                }
            }
        };
        Ok(Stage::CheckingDependents(targets))
    }

    // Select-all-matching has no per-id confirmation from the user, so there is
    // nothing to report back; it goes straight on, cascading only when forced.
    fn check_dependents(&self, tx: &Connection, targets: TargetSet) -> Result<Stage> {
        if let Selection::Matching { .. } = self.request.selection {
            return Ok(if self.request.force {
                Stage::CascadingDeletes(targets)
            } else {
                Stage::Deleting(targets)
            });
        }
        let dependents = self.ids_with_workflow_states(tx, &targets.ids)?;
        Ok(match (dependents.is_empty(), self.request.force) {
            (true, _) => Stage::Deleting(targets),
            (false, true) => Stage::CascadingDeletes(targets),
            (false, false) => Stage::Aborted(LeadsiftError::DependencyConflict {
                contact_ids: dependents,
            }),
        })
    }

    fn cascade_deletes(&self, tx: &Connection, targets: TargetSet) -> Result<Stage> {
        let mut removed = 0;
        for chunk in targets.ids.chunks(ID_BATCH) {
            let statement = self.scoped_ids(
                "delete from \"WorkflowState\" where \"contactId\" in \
                 (select c.\"id\" from \"Contact\" c where ",
                CONTACT,
                chunk,
                ")",
            );
            removed += tx.execute(&statement.sql, params_from_iter(statement.params.iter()))?;
        }
        debug!(tenant = %self.tenant, workflow_states = removed, "cascaded workflow states");
        Ok(Stage::Deleting(targets))
    }

    fn delete(&self, tx: &Connection, targets: TargetSet) -> Result<Stage> {
        let mut deleted_count = 0;
        for chunk in targets.ids.chunks(ID_BATCH) {
            // scoped by tenant again, the resolved ids alone are not trusted
            let statement =
                self.scoped_ids("delete from \"Contact\" where ", "\"Contact\"", chunk, "");
            deleted_count += tx.execute(&statement.sql, params_from_iter(statement.params.iter()))?;
        }
        Ok(Stage::Completed(BulkOutcome {
            deleted_count,
            invalid_count: targets.invalid_count,
        }))
    }

    fn owned_ids(&self, tx: &Connection, ids: &[String]) -> Result<HashSet<String>> {
        let mut owned = HashSet::new();
        for chunk in ids.chunks(ID_BATCH) {
            let statement =
                self.scoped_ids("select c.\"id\" from \"Contact\" c where ", CONTACT, chunk, "");
            let mut query = tx.prepare(&statement.sql)?;
            let rows = query.query_map(params_from_iter(statement.params.iter()), |r| {
                r.get::<_, String>(0)
            })?;
            for id in rows {
                owned.insert(id?);
            }
        }
        Ok(owned)
    }

    /// The target ids that own at least one workflow state, in target order.
    fn ids_with_workflow_states(&self, tx: &Connection, ids: &[String]) -> Result<Vec<String>> {
        let mut dependent = HashSet::new();
        for chunk in ids.chunks(ID_BATCH) {
            let mut clause = Clause::new();
            clause.push_sql("select distinct \"contactId\" from \"WorkflowState\" where \"contactId\" in ");
            clause.bind_list(chunk);
            let statement = clause.render();
            let mut query = tx.prepare(&statement.sql)?;
            let rows = query.query_map(params_from_iter(statement.params.iter()), |r| {
                r.get::<_, String>(0)
            })?;
            for id in rows {
                dependent.insert(id?);
            }
        }
        Ok(ids.iter().filter(|id| dependent.contains(*id)).cloned().collect())
    }

    // `<prefix> <table>."organizationId" = ? and <table>."id" in (?, ...) <suffix>`
    fn scoped_ids(&self, prefix: &str, table: &str, ids: &[String], suffix: &str) -> Rendered {
        let mut clause = Clause::new();
        clause.push_sql(&format!("{prefix}{table}.\"organizationId\" = "));
        clause.bind(self.tenant.as_str());
        clause.push_sql(&format!(" and {table}.\"id\" in "));
        clause.bind_list(ids);
        clause.push_sql(suffix);
        clause.render()
    }
}

/// Drops repeated ids, keeping the first occurrence.
fn distinct(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}
