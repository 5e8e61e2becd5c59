use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use engine::{
    AccountMap, BankAccount, Category, Cleared, Currency, EngineError, Ledger, LedgerAccount,
    SaveTransaction, StatementEvent, TransactionFactory, TransactionRecord, TransferReconciler,
};
use telegram_bot::{ChatApi, StatementNotifier, transaction_id};
use teloxide::{
    RequestError,
    types::{ChatId, InlineKeyboardMarkup, MessageId},
};

/// Ledger that keeps every created transaction.
#[derive(Default)]
struct StoringLedger {
    created: Mutex<Vec<SaveTransaction>>,
}

#[async_trait]
impl Ledger for StoringLedger {
    async fn account(&self, account_id: &str) -> Result<LedgerAccount, EngineError> {
        Ok(LedgerAccount {
            id: account_id.to_string(),
            name: account_id.to_string(),
            transfer_payee_id: format!("payee-{account_id}"),
        })
    }

    async fn transaction(&self, transaction_id: &str) -> Result<TransactionRecord, EngineError> {
        Err(EngineError::KeyNotFound(transaction_id.to_string()))
    }

    async fn create_transaction(
        &self,
        transaction: &SaveTransaction,
    ) -> Result<TransactionRecord, EngineError> {
        let mut created = self.created.lock().unwrap();
        created.push(transaction.clone());
        Ok(TransactionRecord {
            id: format!("b3b1e6d2-1a2b-4c3d-9e0f-11223344556{}", created.len()),
            account_id: transaction.account_id.clone(),
            date: transaction.date.clone(),
            amount: transaction.amount,
            memo: transaction.memo.clone(),
            cleared: transaction.cleared,
            approved: transaction.approved,
            payee_id: None,
            payee_name: None,
            category_name: transaction.category_id.clone(),
            category_id: transaction.category_id.clone(),
            transfer_transaction_id: None,
            import_id: transaction.import_id.clone(),
        })
    }

    async fn update_transaction(
        &self,
        transaction_id: &str,
        _transaction: &SaveTransaction,
    ) -> Result<TransactionRecord, EngineError> {
        Err(EngineError::KeyNotFound(transaction_id.to_string()))
    }

    async fn categories(&self) -> Result<Vec<Category>, EngineError> {
        Ok(Vec::new())
    }
}

#[derive(Default)]
struct SentMessages {
    sent: Mutex<Vec<(ChatId, String, Option<InlineKeyboardMarkup>)>>,
}

#[async_trait]
impl ChatApi for SentMessages {
    async fn answer_callback(&self, _query_id: &str) -> Result<(), RequestError> {
        Ok(())
    }

    async fn edit_keyboard(
        &self,
        _chat_id: ChatId,
        _message_id: MessageId,
        _markup: InlineKeyboardMarkup,
    ) -> Result<(), RequestError> {
        Ok(())
    }

    async fn edit_message(
        &self,
        _chat_id: ChatId,
        _message_id: MessageId,
        _html: &str,
        _markup: InlineKeyboardMarkup,
    ) -> Result<(), RequestError> {
        Ok(())
    }

    async fn send_message(
        &self,
        chat_id: ChatId,
        html: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), RequestError> {
        self.sent
            .lock()
            .unwrap()
            .push((chat_id, html.to_string(), markup));
        Ok(())
    }
}

fn accounts() -> Arc<AccountMap> {
    Arc::new(AccountMap::new(vec![BankAccount {
        id: "acc-black".to_string(),
        alias: "black".to_string(),
        ledger_account_id: "ynab-black".to_string(),
        currency: Currency::Uah,
        transfers: true,
    }]))
}

fn event(mcc: u32) -> StatementEvent {
    StatementEvent {
        account_id: "acc-black".to_string(),
        amount: -9500,
        currency: Currency::Uah,
        mcc,
        description: "Coffee".to_string(),
        comment: None,
        external_txn_id: "ZuHWzqkKGVo=".to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap(),
    }
}

fn notifier(
    ledger: Arc<StoringLedger>,
    chat: Arc<SentMessages>,
    chats: HashMap<String, ChatId>,
) -> StatementNotifier {
    let accounts = accounts();
    let factory = TransactionFactory::new(accounts.clone(), chrono_tz::Europe::Kyiv)
        .mcc_categories(HashMap::from([(5814, "cat-food".to_string())]));
    let reconciler = Arc::new(TransferReconciler::new(accounts, ledger.clone()));
    StatementNotifier::new(factory, ledger, reconciler, chat, chats)
}

#[tokio::test]
async fn new_statement_is_stored_and_announced() {
    let ledger = Arc::new(StoringLedger::default());
    let chat = Arc::new(SentMessages::default());
    let notifier = notifier(
        ledger.clone(),
        chat.clone(),
        HashMap::from([("acc-black".to_string(), ChatId(42))]),
    );

    let record = notifier.process(&event(5411)).await.unwrap();

    let created = ledger.created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].account_id, "ynab-black");
    assert_eq!(created[0].amount, -95_000);
    assert_eq!(created[0].cleared, Cleared::Uncleared);
    assert_eq!(created[0].import_id.as_deref(), Some("MONO:ZuHWzqkKGVo="));

    let sent = chat.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (chat_id, html, markup) = &sent[0];
    assert_eq!(*chat_id, ChatId(42));
    assert!(html.contains("<b>Coffee</b>"));
    assert_eq!(
        transaction_id(&telegram_bot::strip_html_tags(html))
            .unwrap()
            .to_string(),
        record.id
    );
    assert!(markup.is_some());
}

#[tokio::test]
async fn mcc_category_is_applied_on_creation() {
    let ledger = Arc::new(StoringLedger::default());
    let chat = Arc::new(SentMessages::default());
    let notifier = notifier(
        ledger.clone(),
        chat.clone(),
        HashMap::from([("acc-black".to_string(), ChatId(42))]),
    );

    let record = notifier.process(&event(5814)).await.unwrap();

    assert_eq!(record.category_id.as_deref(), Some("cat-food"));
    // Still uncleared, so the operator hears about it.
    assert_eq!(chat.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn account_without_chat_is_stored_silently() {
    let ledger = Arc::new(StoringLedger::default());
    let chat = Arc::new(SentMessages::default());
    let notifier = notifier(ledger.clone(), chat.clone(), HashMap::new());

    notifier.process(&event(5411)).await.unwrap();

    assert_eq!(ledger.created.lock().unwrap().len(), 1);
    assert!(chat.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn run_processes_a_stream_in_order() {
    let ledger = Arc::new(StoringLedger::default());
    let chat = Arc::new(SentMessages::default());
    let notifier = notifier(
        ledger.clone(),
        chat.clone(),
        HashMap::from([("acc-black".to_string(), ChatId(42))]),
    );

    let mut second = event(5411);
    second.external_txn_id = "second".to_string();
    notifier
        .run(futures::stream::iter(vec![event(5411), second]))
        .await;

    let created = ledger.created.lock().unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(created[1].import_id.as_deref(), Some("MONO:second"));
    assert_eq!(chat.sent.lock().unwrap().len(), 2);
}
