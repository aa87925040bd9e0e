//! Free-text search on top of a compiled filter.
//!
//! The list endpoint and the select-all-matching delete both build their query
//! through [`matching`], so what a user previews is exactly what gets deleted.

use crate::compile::{self, Clause, CompiledQuery, Slot};
use crate::construct::TenantId;
use crate::datatype;
use crate::filter::FilterState;

pub const SEARCH_COLUMNS: &[&str] = &[
    "firstName",
    "lastName",
    "email",
    "leadStatus",
    "title",
    "currentCompanyName",
];

/// ANDs an OR across the search columns onto `query`, all of them compared to
/// one shared parameter. Blank terms leave the query untouched.
pub fn combine(mut query: CompiledQuery, search_term: &str) -> CompiledQuery {
    let term = search_term.trim();
    if term.is_empty() {
        return query;
    }
    let mut group = Clause::new();
    let mut shared: Option<Slot> = None;
    for (i, name) in SEARCH_COLUMNS.iter().enumerate() {
        if i > 0 {
            group.push_sql(" OR ");
        }
        group.push_sql(&format!("{} LIKE ", compile::column(name)));
        match shared {
            Some(slot) => group.rebind(slot),
            None => shared = Some(group.bind(datatype::contains_pattern(term))),
        }
        group.push_sql(&compile::like_escape());
    }
    query.and_group(group);
    query
}

/// The query selecting the contacts a filter and search term refer to.
pub fn matching(
    tenant: &TenantId,
    filter: Option<&FilterState>,
    search_term: Option<&str>,
) -> CompiledQuery {
    let query = compile::compile_optional(filter, tenant);
    match search_term {
        Some(term) => combine(query, term),
        None => query,
    }
}
