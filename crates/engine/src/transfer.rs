//! Two-sided transfer detection.
//!
//! Both sides of a transfer between configured accounts arrive as separate
//! statements. The first side is created as an ordinary transaction and kept
//! as a pending side; when the opposite side shows up, the first record is
//! re-pointed to the other account's transfer payee, which makes the ledger
//! create the counterpart, and the counterpart is then marked cleared.
//! Completed second sides are remembered so a redelivered statement resolves
//! to the existing counterpart instead of a new transaction.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    sync::Arc,
};

use tokio::sync::{Mutex, OnceCell};

use crate::{AccountMap, Cleared, EngineError, Ledger, StatementEvent, TransactionRecord};

pub const TRANSFER_MEMO: &str = "Transfer between accounts";
const DEFAULT_PENDING_CAPACITY: usize = 64;

/// Per-key compute-once cache.
///
/// Concurrent first lookups of a key wait on the same fetch. A failed fetch
/// leaves the key empty so the next lookup retries. Entries never expire.
#[derive(Debug, Default)]
pub struct TransferPayeeCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<String>>>>,
}

impl TransferPayeeCache {
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<String, EngineError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, EngineError>>,
    {
        let cell = {
            let mut cells = self.cells.lock().await;
            cells.entry(key.to_string()).or_default().clone()
        };
        cell.get_or_try_init(fetch).await.cloned()
    }
}

#[derive(Debug)]
struct PendingSide {
    event: StatementEvent,
    record: TransactionRecord,
}

impl PendingSide {
    fn pairs_with(&self, event: &StatementEvent) -> bool {
        self.event.account_id != event.account_id
            && self.event.currency == event.currency
            && self.event.amount != 0
            && self.event.amount.checked_neg() == Some(event.amount)
    }
}

#[derive(Debug, Default)]
struct Sides {
    pending: VecDeque<PendingSide>,
    /// `(external_txn_id, counterpart id)` of second sides already merged.
    completed: VecDeque<(String, String)>,
}

fn push_bounded<T>(queue: &mut VecDeque<T>, item: T, capacity: usize) {
    if queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(item);
}

/// Creates ledger transactions and merges transfer pairs.
pub struct TransferReconciler {
    accounts: Arc<AccountMap>,
    ledger: Arc<dyn Ledger>,
    payees: TransferPayeeCache,
    sides: Mutex<Sides>,
    capacity: usize,
}

impl TransferReconciler {
    pub fn new(accounts: Arc<AccountMap>, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            accounts,
            ledger,
            payees: TransferPayeeCache::default(),
            sides: Mutex::new(Sides::default()),
            capacity: DEFAULT_PENDING_CAPACITY,
        }
    }

    /// Maximum number of unmatched transfer sides remembered at once. The
    /// same bound applies to remembered completed transfers.
    pub fn pending_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    /// Creates `event` through `create`, or completes a transfer when `event`
    /// is the second side of one.
    ///
    /// The transfer update is two non-atomic steps. When the second step
    /// fails, the first one stays applied and the error is returned.
    pub async fn reconcile<F, Fut>(
        &self,
        event: &StatementEvent,
        create: F,
    ) -> Result<TransactionRecord, EngineError>
    where
        F: FnOnce(&StatementEvent) -> Fut,
        Fut: Future<Output = Result<TransactionRecord, EngineError>>,
    {
        let internal = self.accounts.is_internal(&event.account_id);

        // Held across creation so two sides arriving together are paired.
        let mut sides = self.sides.lock().await;

        let merged = sides
            .completed
            .iter()
            .find(|(txn, _)| internal && *txn == event.external_txn_id)
            .map(|(_, counterpart_id)| counterpart_id.clone());

        if let Some(counterpart_id) = merged {
            drop(sides);
            tracing::info!(
                "Statement {} already merged into transfer {counterpart_id}",
                event.external_txn_id
            );
            return self.ledger.transaction(&counterpart_id).await;
        }

        let matched = if internal {
            sides
                .pending
                .iter()
                .position(|side| side.pairs_with(event))
                .and_then(|pos| sides.pending.remove(pos))
        } else {
            None
        };

        if let Some(side) = matched {
            drop(sides);
            tracing::info!(
                "Transfer detected: {} ({}) pairs with {} ({})",
                event.external_txn_id,
                event.account_id,
                side.event.external_txn_id,
                side.event.account_id
            );
            return self.process_transfer(event, side.record).await;
        }

        let record = create(event).await?;
        tracing::debug!("Created ledger transaction {} for {}", record.id, event.external_txn_id);

        if internal {
            let side = PendingSide {
                event: event.clone(),
                record: record.clone(),
            };
            push_bounded(&mut sides.pending, side, self.capacity);
        }

        Ok(record)
    }

    async fn process_transfer(
        &self,
        event: &StatementEvent,
        existing: TransactionRecord,
    ) -> Result<TransactionRecord, EngineError> {
        let ledger_account_id = self
            .accounts
            .ledger_account_id(&event.account_id)
            .ok_or_else(|| EngineError::KeyNotFound(event.account_id.clone()))?;

        let payee_id = self
            .payees
            .get_or_fetch(ledger_account_id, || async {
                let account = self.ledger.account(ledger_account_id).await?;
                Ok(account.transfer_payee_id)
            })
            .await?;

        // The first side may have been edited since it was created.
        let current = self.ledger.transaction(&existing.id).await?;
        let mut save = current.to_save();
        save.payee_id = Some(payee_id);
        save.payee_name = None;
        save.memo = Some(TRANSFER_MEMO.to_string());
        let updated = self.ledger.update_transaction(&current.id, &save).await?;

        let counterpart_id = updated
            .transfer_transaction_id
            .clone()
            .ok_or_else(|| EngineError::MissingTransferLink(updated.id.clone()))?;

        {
            let mut sides = self.sides.lock().await;
            let done = (event.external_txn_id.clone(), counterpart_id.clone());
            push_bounded(&mut sides.completed, done, self.capacity);
        }

        let counterpart = self.ledger.transaction(&counterpart_id).await?;
        let mut save = counterpart.to_save();
        save.cleared = Cleared::Cleared;
        let cleared = self
            .ledger
            .update_transaction(&counterpart.id, &save)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    "Transfer {} tagged but counterpart {} not cleared: {err}",
                    updated.id,
                    counterpart.id
                );
            })?;

        Ok(cleared)
    }
}
