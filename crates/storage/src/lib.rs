use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use shared::domain::ContactId;

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

/// A submission that already passed server-side verification.
#[derive(Debug, Clone, Copy)]
pub struct NewContactMessage<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub message: &'a str,
}

#[derive(Debug, Clone)]
pub struct StoredContact {
    pub contact_id: ContactId,
    pub email: String,
    pub name: String,
    pub first_contact_at: DateTime<Utc>,
    pub last_contact_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredContactMessage {
    pub message_id: i64,
    pub contact_id: ContactId,
    pub name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid sqlite url '{database_url}'"))?
            .create_if_missing(true);
        // Every connection to an in-memory database opens a fresh, empty database.
        let max_connections = if database_url.starts_with("sqlite::memory:") {
            1
        } else {
            5
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Upserts the contact keyed by email and appends the message.
    pub async fn record_contact(&self, contact: NewContactMessage<'_>) -> Result<ContactId> {
        let contact_id = ContactId::for_email(contact.email);
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO contacts (id, email, name, first_contact_at, last_contact_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, last_contact_at = excluded.last_contact_at",
        )
        .bind(contact_id.0.to_string())
        .bind(contact.email)
        .bind(contact.name)
        .bind(now)
        .execute(&mut *tx)
        .await
        .context("failed to upsert contact")?;

        let message_id: i64 = sqlx::query_scalar(
            "INSERT INTO contact_messages (contact_id, name, message, created_at)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING id",
        )
        .bind(contact_id.0.to_string())
        .bind(contact.name)
        .bind(contact.message)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .context("failed to insert contact message")?;

        tx.commit().await?;
        debug!(%contact_id, message_id, "recorded contact message");
        Ok(contact_id)
    }

    pub async fn contact(&self, contact_id: ContactId) -> Result<Option<StoredContact>> {
        let row = sqlx::query(
            "SELECT email, name, first_contact_at, last_contact_at FROM contacts WHERE id = ?",
        )
        .bind(contact_id.0.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| StoredContact {
            contact_id,
            email: row.get("email"),
            name: row.get("name"),
            first_contact_at: row.get("first_contact_at"),
            last_contact_at: row.get("last_contact_at"),
        }))
    }

    pub async fn messages_for_contact(
        &self,
        contact_id: ContactId,
    ) -> Result<Vec<StoredContactMessage>> {
        let rows = sqlx::query(
            "SELECT id, contact_id, name, message, created_at
             FROM contact_messages
             WHERE contact_id = ?
             ORDER BY id ASC",
        )
        .bind(contact_id.0.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<StoredContactMessage> {
                let raw_id: String = row.get("contact_id");
                Ok(StoredContactMessage {
                    message_id: row.get("id"),
                    contact_id: ContactId(
                        Uuid::parse_str(&raw_id)
                            .with_context(|| format!("corrupt contact id '{raw_id}'"))?,
                    ),
                    name: row.get("name"),
                    message: row.get("message"),
                    created_at: row.get("created_at"),
                })
            })
            .collect()
    }

    pub async fn contact_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
