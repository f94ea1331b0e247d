// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `atende-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate, plus row-mapping helpers shared by the query
//! modules.

use std::str::FromStr;

pub use atende_core::types::{
    Agent, Contact, Conversation, ConversationStatus, ConversationUpdate, Department, Message,
    MessageBody, SenderType, TransferRecord,
};

/// Parse a TEXT column into a strum enum, mapping failures to a rusqlite
/// conversion error so they surface through the normal query error path.
pub(crate) fn parse_enum<T>(idx: usize, raw: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e: T::Err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Rebuild a [`MessageBody`] from its persisted columns.
///
/// `content` holds the text for text messages and the optional caption for
/// attachment kinds; `file_path` is only set for attachment kinds.
pub(crate) fn body_from_columns(
    idx: usize,
    message_type: String,
    content: String,
    file_path: Option<String>,
) -> Result<MessageBody, rusqlite::Error> {
    let caption = if content.is_empty() {
        None
    } else {
        Some(content.clone())
    };
    match message_type.as_str() {
        "text" => Ok(MessageBody::Text { content }),
        "image" => Ok(MessageBody::Image {
            file_path: file_path.unwrap_or_default(),
            caption,
        }),
        "document" => Ok(MessageBody::Document {
            file_path: file_path.unwrap_or_default(),
            caption,
        }),
        "audio" => Ok(MessageBody::Audio {
            file_path: file_path.unwrap_or_default(),
            caption,
        }),
        other => Err(rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown message_type `{other}`").into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_from_text_columns() {
        let body = body_from_columns(0, "text".into(), "hello".into(), None).unwrap();
        assert_eq!(
            body,
            MessageBody::Text {
                content: "hello".into()
            }
        );
    }

    #[test]
    fn body_from_image_columns_keeps_caption() {
        let body = body_from_columns(
            0,
            "image".into(),
            "a receipt".into(),
            Some("image/x.png".into()),
        )
        .unwrap();
        assert_eq!(
            body,
            MessageBody::Image {
                file_path: "image/x.png".into(),
                caption: Some("a receipt".into()),
            }
        );
    }

    #[test]
    fn body_from_unknown_kind_fails() {
        assert!(body_from_columns(0, "video".into(), "".into(), None).is_err());
    }

    #[test]
    fn parse_enum_maps_bad_value_to_conversion_error() {
        let result: Result<ConversationStatus, _> = parse_enum(3, "nonsense".into());
        assert!(result.is_err());
    }
}
