//! Watcher registry
//!
//! Attaches users to a product exactly once and sends the welcome mail on the
//! first attach.

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::notification::render_welcome;
use crate::domain::product::TrackedProduct;
use crate::domain::repositories::ProductStore;
use crate::domain::services::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachOutcome {
    /// Newly attached; a welcome notification was dispatched
    NotificationSent,
    /// Already a watcher; nothing changed
    AlreadyWatching,
}

pub struct WatcherRegistry {
    store: Arc<dyn ProductStore>,
    notifier: Arc<dyn Notifier>,
}

impl WatcherRegistry {
    pub fn new(store: Arc<dyn ProductStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Attaches `email` to `product`, which must be the just-committed state.
    ///
    /// On a new attach the watcher is persisted, `product` is updated in place
    /// and the welcome notification is sent. The store decides the race: if a
    /// concurrent attach inserted the same watcher first, this call reports
    /// `AlreadyWatching` and sends nothing.
    pub async fn attach(&self, product: &mut TrackedProduct, email: &str) -> Result<AttachOutcome> {
        if product.is_watched_by(email) {
            debug!("{} already watches {}", email, product.id);
            return Ok(AttachOutcome::AlreadyWatching);
        }

        let inserted = self.store.add_watcher(&product.id, email).await?;
        product.add_watcher(email);
        if !inserted {
            debug!("{} was attached to {} concurrently", email, product.id);
            return Ok(AttachOutcome::AlreadyWatching);
        }

        let content = render_welcome(product);
        self.notifier.send(&content, &[email.to_string()]).await;

        info!("👀 {} is now watching {}", email, product.id);
        Ok(AttachOutcome::NotificationSent)
    }
}
