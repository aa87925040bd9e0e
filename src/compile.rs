//! Filter compilation: a [`FilterState`] plus a tenant becomes a parameterized
//! WHERE clause over the contact table.
//!
//! Clauses are assembled from SQL text pieces and bound values. Nothing in here
//! writes a placeholder number; [`Clause::render`] numbers them in a single pass
//! at the very end, so the parameter list always lines up with the text.
//!
//! Compilation is total: conditions on fields outside the registry are skipped
//! without consuming a parameter.

use tracing::debug;

use crate::construct::TenantId;
use crate::datatype::{LIKE_ESCAPE, ValueKind};
use crate::filter::{FilterState, Predicate};
use crate::registry::{self, Field, FieldKind};

/// Alias of the contact table in every statement a compiled clause is used in.
pub const CONTACT: &str = "c";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Sql(String),
    Param(usize),
}

/// Handle to a value already bound in a [`Clause`], for referencing it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(usize);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clause {
    pieces: Vec<Piece>,
    binds: Vec<String>,
}

/// Clause text with numbered placeholders and the values they refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub sql: String,
    pub params: Vec<String>,
}

impl Clause {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }
    pub fn param_count(&self) -> usize {
        self.binds.len()
    }
    pub fn push_sql(&mut self, text: &str) {
        match self.pieces.last_mut() {
            Some(Piece::Sql(last)) => last.push_str(text),
            _ => self.pieces.push(Piece::Sql(text.to_string())),
        }
    }
    /// Binds a new value at this point of the text.
    pub fn bind(&mut self, value: impl Into<String>) -> Slot {
        let slot = Slot(self.binds.len());
        self.binds.push(value.into());
        self.pieces.push(Piece::Param(slot.0));
        slot
    }
    /// References an already bound value again.
    pub fn rebind(&mut self, slot: Slot) {
        self.pieces.push(Piece::Param(slot.0));
    }
    /// Binds every value as a parenthesized, comma separated list.
    pub fn bind_list(&mut self, values: &[String]) {
        self.push_sql("(");
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                self.push_sql(", ");
            }
            self.bind(value.clone());
        }
        self.push_sql(")");
    }
    /// Appends another clause, shifting its slots behind ours.
    pub fn append(&mut self, other: Clause) {
        let offset = self.binds.len();
        for piece in other.pieces {
            match piece {
                Piece::Sql(text) => self.push_sql(&text),
                Piece::Param(i) => self.pieces.push(Piece::Param(i + offset)),
            }
        }
        self.binds.extend(other.binds);
    }
    pub fn render(&self) -> Rendered {
        let mut sql = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Sql(text) => sql.push_str(text),
                Piece::Param(i) => {
                    sql.push('?');
                    sql.push_str(&(i + 1).to_string());
                }
            }
        }
        Rendered {
            sql,
            params: self.binds.clone(),
        }
    }
}

/// A tenant scoped WHERE clause over the contact table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    clause: Clause,
    references_relation: bool,
}

impl CompiledQuery {
    /// Just the tenant scope. This is what an absent filter compiles to.
    pub fn scoped(tenant: &TenantId) -> Self {
        let mut clause = Clause::new();
        clause.push_sql(&format!("{CONTACT}.\"organizationId\" = "));
        clause.bind(tenant.as_str());
        Self {
            clause,
            references_relation: false,
        }
    }
    /// ANDs a parenthesized group onto the clause. Empty groups are ignored.
    pub fn and_group(&mut self, group: Clause) {
        if group.is_empty() {
            return;
        }
        self.clause.push_sql(" AND (");
        self.clause.append(group);
        self.clause.push_sql(")");
    }
    pub fn references_relation(&self) -> bool {
        self.references_relation
    }
    pub fn param_count(&self) -> usize {
        self.clause.param_count()
    }
    pub fn render(&self) -> Rendered {
        self.clause.render()
    }
}

pub fn compile(filter: &FilterState, tenant: &TenantId) -> CompiledQuery {
    let mut query = CompiledQuery::scoped(tenant);
    let joiner = format!(" {} ", filter.logical_operator.keyword());
    let mut group = Clause::new();
    for condition in &filter.conditions {
        let Some(field) = registry::lookup(&condition.field) else {
            debug!(field = %condition.field, "dropping condition on unknown field");
            continue;
        };
        let clause = match field.kind {
            FieldKind::Scalar(kind) => scalar_clause(field, kind, &condition.predicate),
            FieldKind::Relation => {
                query.references_relation = true;
                relation_clause(field, &condition.predicate)
            }
        };
        if !group.is_empty() {
            group.push_sql(&joiner);
        }
        group.append(clause);
    }
    query.and_group(group);
    query
}

/// Compiles an optional filter; `None` is the tenant scope alone.
pub fn compile_optional(filter: Option<&FilterState>, tenant: &TenantId) -> CompiledQuery {
    match filter {
        Some(filter) => compile(filter, tenant),
        None => CompiledQuery::scoped(tenant),
    }
}

pub(crate) fn column(name: &str) -> String {
    format!("{CONTACT}.\"{name}\"")
}

fn scalar_clause(field: &Field, kind: ValueKind, predicate: &Predicate) -> Clause {
    let column = column(field.column);
    let mut clause = Clause::new();
    match (kind, predicate) {
        // dates are stored with a time component, equality is by calendar day
        (ValueKind::Date, Predicate::Equals(value)) => {
            clause.push_sql(&format!("date({column}) = date("));
            clause.bind(value.clone());
            clause.push_sql(")");
        }
        _ => comparison(&mut clause, &column, predicate),
    }
    clause
}

fn relation_clause(field: &Field, predicate: &Predicate) -> Clause {
    let mut clause = Clause::new();
    clause.push_sql(&format!(
        "EXISTS (SELECT 1 FROM \"ContactTag\" ct JOIN \"Tag\" t ON t.\"id\" = ct.\"tagId\" \
         WHERE ct.\"contactId\" = {CONTACT}.\"id\" AND "
    ));
    comparison(&mut clause, &format!("t.\"{}\"", field.column), predicate);
    clause.push_sql(")");
    clause
}

fn comparison(clause: &mut Clause, target: &str, predicate: &Predicate) {
    match predicate {
        Predicate::Equals(value) => {
            clause.push_sql(&format!("{target} = "));
            clause.bind(value.clone());
        }
        _ => {
            clause.push_sql(&format!("{target} LIKE "));
            clause.bind(predicate.bound_value());
            clause.push_sql(&like_escape());
        }
    }
}

pub(crate) fn like_escape() -> String {
    format!(" ESCAPE '{LIKE_ESCAPE}'")
}
