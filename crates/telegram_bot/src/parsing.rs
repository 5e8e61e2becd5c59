//! Reading back what the bot put on a statement message: button callback
//! data, the transaction id at the end of the text and the bold payee.

use std::sync::OnceLock;

use regex::Regex;
use teloxide::types::{MessageEntity, MessageEntityKind};
use uuid::Uuid;

use crate::ui::ButtonClass;

const TRANSACTION_ID_LEN: usize = 36;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown button {0:?}")]
    UnknownButton(String),
    #[error("category button without category id")]
    MissingCategory,
    #[error("message text too short to carry a transaction id")]
    MissingTransactionId,
    #[error("invalid transaction id {0:?}")]
    InvalidTransactionId(String),
}

/// Classifies callback data produced by [`crate::ui::render`].
pub fn parse_button(data: &str) -> Result<ButtonClass, ParseError> {
    match ButtonClass::from_identifier(data) {
        Some(ButtonClass::UpdateCategory(id)) if id.is_empty() => Err(ParseError::MissingCategory),
        Some(class) => Ok(class),
        None => Err(ParseError::UnknownButton(data.to_string())),
    }
}

/// The last 36 characters of the message text, as a hyphenated UUID.
pub fn transaction_id(text: &str) -> Result<Uuid, ParseError> {
    let text = text.trim_end();
    let count = text.chars().count();
    if count < TRANSACTION_ID_LEN {
        return Err(ParseError::MissingTransactionId);
    }

    let tail: String = text.chars().skip(count - TRANSACTION_ID_LEN).collect();
    Uuid::try_parse(&tail).map_err(|_| ParseError::InvalidTransactionId(tail))
}

/// Text of the first bold entity.
///
/// Entity offsets and lengths count UTF-16 code units, as Telegram sends them.
pub fn bold_payee(text: &str, entities: &[MessageEntity]) -> Option<String> {
    let entity = entities
        .iter()
        .find(|entity| matches!(entity.kind, MessageEntityKind::Bold))?;

    let units: Vec<u16> = text.encode_utf16().collect();
    let end = entity.offset.checked_add(entity.length)?;
    let slice = units.get(entity.offset..end)?;
    String::from_utf16(slice)
        .ok()
        .filter(|payee| !payee.trim().is_empty())
}

/// Plain text Telegram shows for an HTML message.
pub fn strip_html_tags(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("invalid html tag regex"));

    tag.replace_all(html, "")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "b3b1e6d2-1a2b-4c3d-9e0f-112233445566";

    #[test]
    fn known_buttons_are_classified() {
        assert_eq!(parse_button("Unapprove"), Ok(ButtonClass::Unapprove));
        assert_eq!(parse_button("MakePayee"), Ok(ButtonClass::MakePayee));
        assert_eq!(
            parse_button("UpdateCategory:7f0c"),
            Ok(ButtonClass::UpdateCategory("7f0c".to_string()))
        );
    }

    #[test]
    fn unknown_buttons_are_rejected() {
        assert_eq!(
            parse_button("Approve"),
            Err(ParseError::UnknownButton("Approve".to_string()))
        );
        assert_eq!(parse_button("UpdateCategory:"), Err(ParseError::MissingCategory));
    }

    #[test]
    fn transaction_id_is_read_from_the_end() {
        let text = format!("New transaction added to YNAB\n💳 Coffee\n\n{ID}\n");
        assert_eq!(transaction_id(&text).unwrap().to_string(), ID);
    }

    #[test]
    fn id_glued_to_preceding_digits_is_extracted_exactly() {
        let text = format!("Balance after payment ...184370613{ID}");
        assert_eq!(transaction_id(&text).unwrap().to_string(), ID);
    }

    #[test]
    fn category_ids_keep_surrounding_whitespace() {
        let class = ButtonClass::UpdateCategory(" cat 42 ".to_string());
        assert_eq!(parse_button(&class.identifier()), Ok(class));
    }

    #[test]
    fn short_or_garbled_tail_is_rejected() {
        assert_eq!(transaction_id("hello"), Err(ParseError::MissingTransactionId));
        let garbled = format!("text {}", ID.replace('-', "x"));
        assert!(matches!(
            transaction_id(&garbled),
            Err(ParseError::InvalidTransactionId(_))
        ));
    }

    #[test]
    fn bold_payee_uses_utf16_offsets() {
        let text = "💳 Сільпо\nplain";
        let entities = vec![
            MessageEntity {
                kind: MessageEntityKind::Italic,
                offset: 0,
                length: 2,
            },
            MessageEntity {
                kind: MessageEntityKind::Bold,
                offset: 3,
                length: 6,
            },
        ];
        assert_eq!(bold_payee(text, &entities).as_deref(), Some("Сільпо"));
    }

    #[test]
    fn missing_or_out_of_range_bold_gives_nothing() {
        assert_eq!(bold_payee("abc", &[]), None);
        let entities = vec![MessageEntity {
            kind: MessageEntityKind::Bold,
            offset: 2,
            length: 10,
        }];
        assert_eq!(bold_payee("abc", &entities), None);
    }

    #[test]
    fn tags_are_stripped_and_entities_unescaped() {
        assert_eq!(
            strip_html_tags("<b>Tom &amp; Jerry</b> <code>&lt;3</code>"),
            "Tom & Jerry <3"
        );
    }
}
