//! Notification collaborators
//!
//! Delivery is out of process: mail is either only logged, or queued in the
//! `email_outbox` table for an external mailer to pick up.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info};
use uuid::Uuid;

use crate::domain::notification::EmailContent;
use crate::domain::services::Notifier;

/// Writes rendered mail to the log and nothing else
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn send(&self, content: &EmailContent, recipients: &[String]) {
        info!(
            "📧 Mail to {}: {} ({} bytes)",
            recipients.join(", "),
            content.subject,
            content.body.len()
        );
    }
}

/// Queues mail in the SQLite outbox
#[derive(Clone)]
pub struct OutboxNotifier {
    pool: Arc<SqlitePool>,
}

impl OutboxNotifier {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    async fn enqueue(&self, content: &EmailContent, recipients: &[String]) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO email_outbox (id, recipients, subject, body, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(serde_json::to_string(recipients)?)
        .bind(&content.subject)
        .bind(&content.body)
        .bind(Utc::now())
        .execute(&*self.pool)
        .await?;
        Ok(id)
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn send(&self, content: &EmailContent, recipients: &[String]) {
        match self.enqueue(content, recipients).await {
            Ok(id) => info!("📬 Queued mail {} for {} recipient(s)", id, recipients.len()),
            Err(e) => error!("❌ Failed to queue mail '{}': {}", content.subject, e),
        }
    }
}
