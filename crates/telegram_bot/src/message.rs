use engine::{Cleared, StatementEvent, TransactionRecord};

const HEADER: &str = "New transaction added to YNAB";
const CARD: &str = "💳 ";
const INDENT: &str = "      ";

/// Statement details shown on a notification.
///
/// The ledger never stores the MCC or the bank's description verbatim, so a
/// callback recovers them from the message it was pressed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementMessage {
    pub description: String,
    pub mcc: String,
    pub amount: String,
}

impl StatementMessage {
    pub fn new(event: &StatementEvent) -> Self {
        Self {
            description: single_line(&event.description),
            mcc: mcc_line(event.mcc),
            amount: event.money().to_string(),
        }
    }

    /// HTML body for `record`, to be sent with `ParseMode::Html`.
    pub fn render(&self, record: &TransactionRecord) -> String {
        format!(
            "{HEADER}\n\
             {CARD}<b>{description}</b>\n\
             {INDENT}{mcc}\n\
             {INDENT}<u>{amount}</u>\n\
             {INDENT}<code>Category: {category}</code>\n\
             {INDENT}<code>Payee:    {payee}</code>\n\
             \n\
             <pre>{id}</pre>",
            description = escape_html(&self.description),
            mcc = escape_html(&self.mcc),
            amount = escape_html(&self.amount),
            category = escape_html(record.category_name.as_deref().unwrap_or_default()),
            payee = escape_html(record.payee_name.as_deref().unwrap_or_default()),
            id = escape_html(&record.id),
        )
    }

    /// Recovers the statement part of a rendered message from the plain text
    /// Telegram returns for it.
    pub fn from_plain_text(text: &str) -> Option<Self> {
        let mut lines = text.lines();
        if lines.next()? != HEADER {
            return None;
        }
        let description = lines.next()?.strip_prefix(CARD)?.to_string();
        let mcc = lines.next()?.trim().to_string();
        let amount = lines.next()?.trim().to_string();

        Some(Self {
            description,
            mcc,
            amount,
        })
    }
}

/// Whether a freshly stored record needs the operator's attention.
pub fn should_notify(record: &TransactionRecord) -> bool {
    record.category_id.is_none() || record.cleared == Cleared::Uncleared
}

pub(crate) fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn mcc_line(mcc: u32) -> String {
    let description = match mcc {
        4111 => "Local and suburban commuter transport",
        4121 => "Taxicabs and limousines",
        4814 => "Telecommunication services",
        4829 => "Money transfer",
        5411 => "Grocery stores, supermarkets",
        5499 => "Miscellaneous food stores",
        5541 | 5542 => "Service stations",
        5812 => "Eating places, restaurants",
        5814 => "Fast food restaurants",
        5912 => "Drug stores and pharmacies",
        5999 => "Miscellaneous and specialty retail stores",
        6011 => "Automated cash disbursements",
        6012 => "Financial institutions",
        _ => "Unknown MCC",
    };
    format!("{description} ({mcc})")
}
