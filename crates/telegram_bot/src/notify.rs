use std::{collections::HashMap, sync::Arc};

use engine::{Ledger, StatementEvent, TransactionFactory, TransactionRecord, TransferReconciler};
use futures::{Stream, StreamExt};
use teloxide::types::ChatId;

use crate::{
    chat::ChatApi,
    error::NotifyError,
    message::{StatementMessage, should_notify},
    ui::transaction_keyboard,
};

/// Stores every incoming statement in the ledger and tells the account's chat
/// about the ones that still need a decision.
pub struct StatementNotifier {
    factory: TransactionFactory,
    ledger: Arc<dyn Ledger>,
    reconciler: Arc<TransferReconciler>,
    chat: Arc<dyn ChatApi>,
    chats: HashMap<String, ChatId>,
}

impl StatementNotifier {
    /// `chats` maps bank account ids to the chat receiving their statements.
    pub fn new(
        factory: TransactionFactory,
        ledger: Arc<dyn Ledger>,
        reconciler: Arc<TransferReconciler>,
        chat: Arc<dyn ChatApi>,
        chats: HashMap<String, ChatId>,
    ) -> Self {
        Self {
            factory,
            ledger,
            reconciler,
            chat,
            chats,
        }
    }

    /// Processes statements in arrival order until the stream ends.
    pub async fn run<S>(self, statements: S)
    where
        S: Stream<Item = StatementEvent> + Send,
    {
        tracing::info!("Statement notifier started");
        let mut statements = std::pin::pin!(statements);
        while let Some(event) = statements.next().await {
            if let Err(err) = self.process(&event).await {
                tracing::error!(
                    "Failed to process statement {} of {}: {err}",
                    event.external_txn_id,
                    event.account_id
                );
            }
        }
        tracing::warn!("Statement stream ended");
    }

    pub async fn process(&self, event: &StatementEvent) -> Result<TransactionRecord, NotifyError> {
        let record = self
            .reconciler
            .reconcile(event, |event| {
                let save = self.factory.create(event);
                let ledger = self.ledger.clone();
                async move { ledger.create_transaction(&save?).await }
            })
            .await?;

        if !should_notify(&record) {
            tracing::debug!("Transaction {} needs no attention", record.id);
            return Ok(record);
        }

        let Some(chat_id) = self.chats.get(&event.account_id) else {
            tracing::warn!("No chat configured for account {}", event.account_id);
            return Ok(record);
        };

        let statement = StatementMessage::new(event);
        let keyboard = transaction_keyboard(&record, &statement.description);
        self.chat
            .send_message(*chat_id, &statement.render(&record), Some(keyboard))
            .await?;
        tracing::info!("Sent notification for transaction {}", record.id);

        Ok(record)
    }
}
