//! Subscription bookkeeping across feed reconnects

use dashmap::DashSet;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

/// Code width the provider expects on the wire
const CODE_WIDTH: usize = 6;

/// Left-pad short numeric codes to the provider's fixed width.
pub fn normalize_code(code: &str) -> String {
    let trimmed = code.trim();
    if trimmed.len() >= CODE_WIDTH {
        trimmed.to_string()
    } else {
        format!("{trimmed:0>width$}", width = CODE_WIDTH)
    }
}

/// Tracks which instruments the feed should carry.
///
/// Requests made while the session is down are parked in `pending` and
/// flushed on the next attach; a disconnect clears both sets so the next
/// session starts from whatever callers still care about.
#[derive(Default)]
pub struct SubscriptionManager {
    subscribed: DashSet<String>,
    pending: DashSet<String>,
    link: RwLock<Option<mpsc::UnboundedSender<String>>>,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the live session (or the next one) to carry `code`. Fire and
    /// forget: a dead link just re-parks the request.
    pub async fn ensure_subscribed(&self, code: &str) {
        let trimmed = code.trim();
        if trimmed.is_empty() {
            return;
        }
        let code = normalize_code(trimmed);
        if self.subscribed.contains(&code) {
            return;
        }

        let link = self.link.read().await;
        match link.as_ref() {
            Some(tx) => {
                if tx.send(code.clone()).is_ok() {
                    self.subscribed.insert(code);
                } else {
                    self.pending.insert(code);
                }
            }
            None => {
                debug!(code = %code, "feed down; parking subscription");
                self.pending.insert(code);
            }
        }
    }

    /// Wire the manager to a live session and flush parked requests, each
    /// exactly once.
    pub async fn attach(&self, tx: mpsc::UnboundedSender<String>) {
        {
            let mut link = self.link.write().await;
            *link = Some(tx.clone());
        }

        let parked: Vec<String> = self.pending.iter().map(|entry| entry.key().clone()).collect();
        self.pending.clear();
        for code in parked {
            if self.subscribed.contains(&code) {
                continue;
            }
            if tx.send(code.clone()).is_ok() {
                self.subscribed.insert(code);
            } else {
                self.pending.insert(code);
            }
        }
        debug!(subscribed = self.subscribed.len(), "feed link attached");
    }

    /// Sever the session link and forget all subscription state, so a later
    /// attach starts clean.
    pub async fn detach(&self) {
        *self.link.write().await = None;
        self.subscribed.clear();
        self.pending.clear();
    }

    pub fn is_subscribed(&self, code: &str) -> bool {
        self.subscribed.contains(&normalize_code(code.trim()))
    }

    pub fn subscribed_count(&self) -> usize {
        self.subscribed.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
