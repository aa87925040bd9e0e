//! Runs compiled queries against the store.
//!
//! There is one way in: a [`CompiledQuery`]. An unfiltered listing is simply the
//! tenant-only query, so it goes through the same projection, tag aggregation
//! included, as a filtered one.

use rusqlite::{Connection, Row, params_from_iter};
use serde_json::Value;
use tracing::{debug, warn};

use crate::compile::{CONTACT, CompiledQuery};
use crate::construct::Contact;
use crate::error::Result;

const STATUS_KEY: &str = "status";

fn contact_projection() -> String {
    format!(
        "select {c}.\"id\", {c}.\"organizationId\", {c}.\"firstName\", {c}.\"lastName\", \
         {c}.\"email\", {c}.\"title\", {c}.\"currentCompanyName\", {c}.\"leadStatus\", \
         {c}.\"city\", {c}.\"state\", {c}.\"country\", {c}.\"createdAt\", {c}.\"updatedAt\", \
         {c}.\"lastActivityAt\", {c}.\"additionalData\", \
         (select json_group_array(t.\"name\") from \"ContactTag\" ct \
          join \"Tag\" t on t.\"id\" = ct.\"tagId\" \
          where ct.\"contactId\" = {c}.\"id\") as \"tags\" \
         from \"Contact\" {c}",
        c = CONTACT
    )
}

fn ordering() -> String {
    format!(" order by {c}.\"createdAt\" desc, {c}.\"id\"", c = CONTACT)
}

/// Full contact rows, with tags and the lifted status.
pub fn fetch_contacts(conn: &Connection, query: &CompiledQuery) -> Result<Vec<Contact>> {
    let rendered = query.render();
    let sql = format!("{} where {}{}", contact_projection(), rendered.sql, ordering());
    debug!(params = rendered.params.len(), relation = query.references_relation(), "fetching contacts");
    let mut statement = conn.prepare(&sql)?;
    let contacts = statement
        .query_map(params_from_iter(rendered.params.iter()), contact_from_row)?
        .collect::<rusqlite::Result<Vec<Contact>>>()?;
    Ok(contacts)
}

/// Only the ids of the matching contacts, in listing order.
pub fn fetch_ids(conn: &Connection, query: &CompiledQuery) -> Result<Vec<String>> {
    let rendered = query.render();
    let sql = format!(
        "select {c}.\"id\" from \"Contact\" {c} where {}{}",
        rendered.sql,
        ordering(),
        c = CONTACT
    );
    debug!(params = rendered.params.len(), "fetching contact ids");
    let mut statement = conn.prepare(&sql)?;
    let ids = statement
        .query_map(params_from_iter(rendered.params.iter()), |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(ids)
}

fn contact_from_row(row: &Row) -> rusqlite::Result<Contact> {
    let id: String = row.get(0)?;
    let additional_data = parse_blob(&id, row.get::<_, Option<String>>(14)?);
    let mut tags: Vec<String> = match row.get::<_, Option<String>>(15)? {
        Some(text) => serde_json::from_str(&text).unwrap_or_default(),
        None => Vec::new(),
    };
    tags.sort();
    let mut contact = Contact {
        id,
        organization_id: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        title: row.get(5)?,
        current_company_name: row.get(6)?,
        lead_status: row.get(7)?,
        city: row.get(8)?,
        state: row.get(9)?,
        country: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
        last_activity_at: row.get(13)?,
        additional_data,
        status: None,
        tags,
    };
    lift_status(&mut contact);
    Ok(contact)
}

fn parse_blob(id: &str, text: Option<String>) -> Option<Value> {
    let text = text?;
    match serde_json::from_str(&text) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(contact = %id, error = %e, "ignoring malformed additionalData");
            None
        }
    }
}

/// Copies `additionalData.status` onto the row, if there is one. `null` counts
/// as absent.
pub fn lift_status(contact: &mut Contact) {
    contact.status = contact
        .additional_data
        .as_ref()
        .and_then(|data| data.get(STATUS_KEY))
        .filter(|status| !status.is_null())
        .cloned();
}
