//! The allowlist of filterable contact fields.
//!
//! Only names listed here ever reach generated SQL, and the column text that is
//! emitted always comes from the entry, not from the request. Adding a
//! filterable field is a code change.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::datatype::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A column on the contact row itself.
    Scalar(ValueKind),
    /// Reached through a link table, compiled into a subquery.
    Relation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

pub const TAGS: &str = "tags";

const FIELDS: &[Field] = &[
    scalar("firstName", ValueKind::Text),
    scalar("lastName", ValueKind::Text),
    scalar("email", ValueKind::Text),
    scalar("title", ValueKind::Text),
    scalar("currentCompanyName", ValueKind::Text),
    scalar("leadStatus", ValueKind::Enum),
    scalar("city", ValueKind::Text),
    scalar("state", ValueKind::Text),
    scalar("country", ValueKind::Text),
    scalar("createdAt", ValueKind::Date),
    scalar("updatedAt", ValueKind::Date),
    scalar("lastActivityAt", ValueKind::Date),
    Field {
        name: TAGS,
        column: "name",
        kind: FieldKind::Relation,
    },
];

const fn scalar(name: &'static str, kind: ValueKind) -> Field {
    Field {
        name,
        column: name,
        kind: FieldKind::Scalar(kind),
    }
}

lazy_static! {
    static ref BY_NAME: HashMap<&'static str, &'static Field> =
        FIELDS.iter().map(|f| (f.name, f)).collect();
}

pub fn lookup(field: &str) -> Option<&'static Field> {
    BY_NAME.get(field).copied()
}

pub fn is_allowed(field: &str) -> bool {
    BY_NAME.contains_key(field)
}

pub fn kind(field: &str) -> Option<FieldKind> {
    lookup(field).map(|f| f.kind)
}

pub fn fields() -> &'static [Field] {
    FIELDS
}
