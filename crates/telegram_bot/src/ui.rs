use std::fmt;

use engine::{Category, Cleared, TransactionRecord};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

const PRESSED: &str = "✅";
const UPDATE_CATEGORY_PREFIX: &str = "UpdateCategory:";

/// Every button the bot ever attaches to a statement message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ButtonClass {
    /// Swaps the keyboard for the category picker.
    ChooseCategory,
    Uncategorize,
    Unapprove,
    MakePayee,
    /// Category picked from the picker, by ledger category id.
    UpdateCategory(String),
}

impl ButtonClass {
    /// Callback data carried by the button.
    pub fn identifier(&self) -> String {
        match self {
            ButtonClass::ChooseCategory => "ChooseCategory".to_string(),
            ButtonClass::Uncategorize => "Uncategorize".to_string(),
            ButtonClass::Unapprove => "Unapprove".to_string(),
            ButtonClass::MakePayee => "MakePayee".to_string(),
            ButtonClass::UpdateCategory(id) => format!("{UPDATE_CATEGORY_PREFIX}{id}"),
        }
    }

    pub(crate) fn from_identifier(data: &str) -> Option<ButtonClass> {
        match data {
            "ChooseCategory" => Some(ButtonClass::ChooseCategory),
            "Uncategorize" => Some(ButtonClass::Uncategorize),
            "Unapprove" => Some(ButtonClass::Unapprove),
            "MakePayee" => Some(ButtonClass::MakePayee),
            _ => data
                .strip_prefix(UPDATE_CATEGORY_PREFIX)
                .map(|id| ButtonClass::UpdateCategory(id.to_string())),
        }
    }

    fn label(&self, pressed: bool) -> String {
        let (glyph, word) = match self {
            ButtonClass::ChooseCategory => return "⤴️category".to_string(),
            ButtonClass::UpdateCategory(id) => return id.clone(),
            ButtonClass::Uncategorize => ("❌", "category"),
            ButtonClass::Unapprove => ("🚫", "unapprove"),
            ButtonClass::MakePayee => ("➕", "payee"),
        };
        let glyph = if pressed { PRESSED } else { glyph };
        format!("{glyph}{word}")
    }
}

impl fmt::Display for ButtonClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ButtonClass::UpdateCategory(_) => f.write_str("UpdateCategory"),
            other => f.write_str(&other.identifier()),
        }
    }
}

/// Label and callback data for `class`.
///
/// Category buttons are labelled with the category name by
/// [`category_keyboard`]; rendered alone they fall back to the id.
pub fn render(class: &ButtonClass, pressed: bool) -> (String, String) {
    (class.label(pressed), class.identifier())
}

fn button(class: &ButtonClass, pressed: bool) -> InlineKeyboardButton {
    let (label, data) = render(class, pressed);
    InlineKeyboardButton::callback(label, data)
}

/// Keyboard attached to a statement message, reflecting the record's state.
///
/// `payee` is the bold payee of the message; the payee button is pressed once
/// the record carries it as payee name.
pub fn transaction_keyboard(record: &TransactionRecord, payee: &str) -> InlineKeyboardMarkup {
    let uncategorized = !record.is_categorized();
    let unapproved = record.cleared == Cleared::Uncleared;
    let payee_set = record.payee_name.as_deref() == Some(payee);

    InlineKeyboardMarkup::new(vec![
        vec![
            button(&ButtonClass::Unapprove, unapproved),
            button(&ButtonClass::Uncategorize, uncategorized),
            button(&ButtonClass::MakePayee, payee_set),
        ],
        vec![button(&ButtonClass::ChooseCategory, false)],
    ])
}

/// Category picker, two buttons per row.
pub fn category_keyboard(categories: &[Category]) -> InlineKeyboardMarkup {
    let rows = categories
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|category| {
                    InlineKeyboardButton::callback(
                        category.name.clone(),
                        ButtonClass::UpdateCategory(category.id.clone()).identifier(),
                    )
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    InlineKeyboardMarkup::new(rows)
}
