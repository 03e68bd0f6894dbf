// SPDX-License-Identifier: MIT
//
// Failing store: fault injection for store-error paths.
//
// Wraps any store and fails reads or writes according to a policy, but only
// while "armed". Arming goes through a `FailSwitch`, a cloneable handle the
// test keeps after the store itself has been moved into a session. Setup
// writes happen disarmed; the test arms the switch right before the command
// whose failure it wants to observe.

use std::cell::Cell;
use std::rc::Rc;

use serde_json::Value;

use crate::{Store, StoreError};

/// When an armed [`FailingStore`] should fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Every write fails.
    AllWrites,
    /// The first `n` writes after arming succeed, the rest fail.
    AfterWrites(usize),
    /// Writes to keys ending with any of these suffixes fail (`":children"`).
    OnKeySuffix(Vec<String>),
    /// Every read fails.
    AllReads,
}

/// Cloneable arm/disarm handle for a [`FailingStore`].
#[derive(Debug, Clone, Default)]
pub struct FailSwitch {
    armed: Rc<Cell<bool>>,
    writes_since_armed: Rc<Cell<usize>>,
}

impl FailSwitch {
    /// Start failing according to the policy.
    pub fn arm(&self) {
        self.writes_since_armed.set(0);
        self.armed.set(true);
    }

    /// Stop failing.
    pub fn disarm(&self) {
        self.armed.set(false);
    }

    /// Whether failures are currently injected.
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.get()
    }
}

/// A store wrapper that injects failures while its switch is armed.
#[derive(Debug)]
pub struct FailingStore<S: Store> {
    inner: S,
    policy: FailurePolicy,
    switch: FailSwitch,
}

impl<S: Store> FailingStore<S> {
    /// Wrap `inner`. Starts disarmed.
    pub fn new(inner: S, policy: FailurePolicy) -> Self {
        Self {
            inner,
            policy,
            switch: FailSwitch::default(),
        }
    }

    /// A handle for arming and disarming this store.
    #[must_use]
    pub fn switch(&self) -> FailSwitch {
        self.switch.clone()
    }

    /// The wrapped store.
    pub const fn inner(&self) -> &S {
        &self.inner
    }

    fn write_fails(&self, key: &str) -> bool {
        if !self.switch.is_armed() {
            return false;
        }
        let count = self.switch.writes_since_armed.get();
        self.switch.writes_since_armed.set(count + 1);
        match &self.policy {
            FailurePolicy::AllWrites => true,
            FailurePolicy::AfterWrites(n) => count >= *n,
            FailurePolicy::OnKeySuffix(suffixes) => suffixes.iter().any(|s| key.ends_with(s)),
            FailurePolicy::AllReads => false,
        }
    }
}

impl<S: Store> Store for FailingStore<S> {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        if self.switch.is_armed() && self.policy == FailurePolicy::AllReads {
            return Err(StoreError::Backend(format!("injected read failure on `{key}`")));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        if self.write_fails(key) {
            tracing::trace!(key, "injected write failure");
            return Err(StoreError::Backend(format!("injected write failure on `{key}`")));
        }
        self.inner.set(key, value)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
