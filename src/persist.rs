// used for persistence
use chrono::Utc;
use rusqlite::{Connection, params};

use crate::construct::{NewContact, PersistenceMode, TenantId};
use crate::error::Result;

// ------------- Persistence -------------
pub struct Persistor {
    conn: Connection,
}
impl Persistor {
    pub fn new(mode: PersistenceMode) -> Result<Persistor> {
        let conn = match mode {
            PersistenceMode::InMemory => Connection::open_in_memory()?,
            PersistenceMode::File(path) => Connection::open(path)?,
        };
        Self::with_connection(conn)
    }
    pub fn with_connection(conn: Connection) -> Result<Persistor> {
        // Foreign keys are off by default in SQLite and have to be enabled
        // per connection, they are what makes workflow states a dependency.
        conn.execute_batch(
            "
            pragma foreign_keys = on;
            create table if not exists Contact (
                id text not null,
                organizationId text not null,
                firstName text null,
                lastName text null,
                email text null,
                title text null,
                currentCompanyName text null,
                leadStatus text null,
                city text null,
                state text null,
                country text null,
                createdAt text not null,
                updatedAt text not null,
                lastActivityAt text null,
                additionalData text null,
                constraint referenceable_Contact_id primary key (
                    id
                )
            );
            create index if not exists Contact_organizationId on Contact (
                organizationId
            );
            create table if not exists Tag (
                id integer not null,
                organizationId text not null,
                name text not null,
                constraint referenceable_Tag_id primary key (
                    id
                ),
                constraint unique_Tag_name unique (
                    organizationId,
                    name
                )
            );
            create table if not exists ContactTag (
                contactId text not null,
                tagId integer not null,
                constraint ContactTag_is_for_Contact foreign key (
                    contactId
                ) references Contact(id) on delete cascade,
                constraint ContactTag_is_for_Tag foreign key (
                    tagId
                ) references Tag(id) on delete cascade,
                constraint unique_ContactTag primary key (
                    contactId,
                    tagId
                )
            );
            create table if not exists WorkflowState (
                id integer not null,
                contactId text not null,
                workflow text not null,
                createdAt text not null,
                constraint WorkflowState_is_for_Contact foreign key (
                    contactId
                ) references Contact(id),
                constraint referenceable_WorkflowState_id primary key (
                    id
                )
            );
            create index if not exists WorkflowState_contactId on WorkflowState (
                contactId
            );
            ",
        )?;
        Ok(Persistor { conn })
    }
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
    pub fn add_contact(&self, tenant: &TenantId, contact: &NewContact) -> Result<()> {
        let created_at = contact.created_at.unwrap_or_else(Utc::now);
        let additional_data = contact.additional_data.as_ref().map(|d| d.to_string());
        self.conn.execute(
            "
            insert into Contact (
                id,
                organizationId,
                firstName,
                lastName,
                email,
                title,
                currentCompanyName,
                leadStatus,
                city,
                state,
                country,
                createdAt,
                updatedAt,
                lastActivityAt,
                additionalData
            ) values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            ",
            params![
                &contact.id,
                tenant.as_str(),
                &contact.first_name,
                &contact.last_name,
                &contact.email,
                &contact.title,
                &contact.current_company_name,
                &contact.lead_status,
                &contact.city,
                &contact.state,
                &contact.country,
                &created_at,
                &created_at,
                &contact.last_activity_at,
                &additional_data
            ],
        )?;
        Ok(())
    }
    /// Links a contact to the tenant's tag of that name, creating the tag if needed.
    pub fn tag_contact(&self, tenant: &TenantId, contact_id: &str, tag: &str) -> Result<()> {
        self.conn.execute(
            "insert or ignore into Tag (organizationId, name) values (?1, ?2)",
            params![tenant.as_str(), tag],
        )?;
        let tag_id: i64 = self.conn.query_row(
            "select id from Tag where organizationId = ?1 and name = ?2",
            params![tenant.as_str(), tag],
            |r| r.get(0),
        )?;
        self.conn.execute(
            "insert or ignore into ContactTag (contactId, tagId) values (?1, ?2)",
            params![contact_id, tag_id],
        )?;
        Ok(())
    }
    pub fn add_workflow_state(&self, contact_id: &str, workflow: &str) -> Result<i64> {
        self.conn.execute(
            "insert into WorkflowState (contactId, workflow, createdAt) values (?1, ?2, ?3)",
            params![contact_id, workflow, &Utc::now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
    /// All contact ids of a tenant, sorted.
    pub fn contact_ids(&self, tenant: &TenantId) -> Result<Vec<String>> {
        let mut statement = self
            .conn
            .prepare("select id from Contact where organizationId = ?1 order by id")?;
        let ids = statement
            .query_map(params![tenant.as_str()], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
    }
    pub fn workflow_state_count(&self, contact_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "select count(*) from WorkflowState where contactId = ?1",
            params![contact_id],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }
}
