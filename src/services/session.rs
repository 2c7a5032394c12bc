// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Identity/session capability.
//!
//! Components receive a [`SessionContext`] at construction instead of
//! reaching for a global auth object. Each component holds its own
//! [`SessionSubscription`]; dropping it unsubscribes.

use std::sync::Arc;
use tokio::sync::watch;

/// Shared handle on the current identity (`None` when signed out).
#[derive(Clone, Debug)]
pub struct SessionContext {
    identity: Arc<watch::Sender<Option<String>>>,
}

impl SessionContext {
    pub fn new(identity: Option<String>) -> Self {
        let (tx, _rx) = watch::channel(identity);
        Self {
            identity: Arc::new(tx),
        }
    }

    pub fn signed_in(uid: impl Into<String>) -> Self {
        Self::new(Some(uid.into()))
    }

    pub fn current_identity(&self) -> Option<String> {
        self.identity.borrow().clone()
    }

    /// Register for identity changes.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.identity.subscribe(),
        }
    }

    pub fn sign_out(&self) {
        self.identity.send_replace(None);
    }
}

/// A component's view of identity changes.
#[derive(Debug)]
pub struct SessionSubscription {
    rx: watch::Receiver<Option<String>>,
}

impl SessionSubscription {
    /// The new identity if it changed since the last poll.
    pub fn poll_change(&mut self) -> Option<Option<String>> {
        match self.rx.has_changed() {
            Ok(true) => Some(self.rx.borrow_and_update().clone()),
            _ => None,
        }
    }
}
