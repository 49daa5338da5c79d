//! `$$channel$$` macro preprocessing.
//!
//! Expressions refer to other series by name between two `$$` delimiters.
//! Before compilation every reference is rewritten into something the script
//! runtime understands:
//!
//! - the linked series becomes `value`
//! - every other series becomes `CHANNEL_VALUES[i]`, `i` being the order in
//!   which the channel was first referenced
//!
//! ```text
//! $$speed$$ * 2 + $$accel$$ - $$speed$$     (linked = "time_s")
//!   => CHANNEL_VALUES[0] * 2 + CHANNEL_VALUES[1] - CHANNEL_VALUES[0]
//!      channels = ["speed", "accel"]
//! ```
//!
//! There is no escaping; a channel name is everything between the delimiters.

use crate::error::{Result, TransformError};
use crate::scripting::{CHANNEL_VALUES_VAR, VALUE_VAR};

/// Delimiter surrounding a channel name
pub const MACRO_DELIMITER: &str = "$$";

/// Result of rewriting an expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenExpression {
    /// Expression text with every macro replaced
    pub text: String,
    /// Auxiliary channel names, indexed by their `CHANNEL_VALUES` slot
    pub channels: Vec<String>,
}

/// Rewrite every `$$name$$` macro in `expression`.
///
/// Fails with [`TransformError::Syntax`] if a macro is left unterminated.
pub fn rewrite_channels(expression: &str, linked_series: &str) -> Result<RewrittenExpression> {
    let mut text = String::with_capacity(expression.len());
    let mut channels: Vec<String> = Vec::new();

    for segment in scan(expression) {
        match segment? {
            Segment::Text(literal) => text.push_str(literal),
            Segment::Channel(name) if name == linked_series => text.push_str(VALUE_VAR),
            Segment::Channel(name) => {
                let index = match channels.iter().position(|c| c == name) {
                    Some(index) => index,
                    None => {
                        channels.push(name.to_string());
                        channels.len() - 1
                    }
                };
                text.push_str(&format!("{}[{}]", CHANNEL_VALUES_VAR, index));
            }
        }
    }

    Ok(RewrittenExpression { text, channels })
}

/// Every channel referenced by `expression`, in order of appearance.
///
/// Duplicates and the linked series are kept. Returns an empty list if the
/// expression contains an unterminated macro.
pub fn channels_in_expression(expression: &str) -> Vec<String> {
    scan(expression)
        .map(|segment| match segment? {
            Segment::Channel(name) => Ok(Some(name.to_string())),
            Segment::Text(_) => Ok(None),
        })
        .filter_map(Result::transpose)
        .collect::<Result<Vec<_>>>()
        .unwrap_or_default()
}

enum Segment<'a> {
    Text(&'a str),
    Channel(&'a str),
}

fn scan(expression: &str) -> impl Iterator<Item = Result<Segment<'_>>> + '_ {
    let mut rest = expression;
    let mut pending: Option<&str> = None;
    let mut failed = false;

    std::iter::from_fn(move || {
        if failed {
            return None;
        }
        if let Some(name) = pending.take() {
            return Some(Ok(Segment::Channel(name)));
        }
        if rest.is_empty() {
            return None;
        }

        let Some(open) = rest.find(MACRO_DELIMITER) else {
            let literal = rest;
            rest = "";
            return Some(Ok(Segment::Text(literal)));
        };

        let after_open = &rest[open + MACRO_DELIMITER.len()..];
        let Some(close) = after_open.find(MACRO_DELIMITER) else {
            failed = true;
            return Some(Err(TransformError::Syntax(
                "invalid use of $$ macro".to_string(),
            )));
        };

        let literal = &rest[..open];
        let name = &after_open[..close];
        rest = &after_open[close + MACRO_DELIMITER.len()..];

        if literal.is_empty() {
            Some(Ok(Segment::Channel(name)))
        } else {
            pending = Some(name);
            Some(Ok(Segment::Text(literal)))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_repeated_channels_share_slot() {
        let rewritten = rewrite_channels("$$A$$ + $$B$$ + $$A$$", "X").unwrap();

        assert_eq!(
            rewritten.text,
            "CHANNEL_VALUES[0] + CHANNEL_VALUES[1] + CHANNEL_VALUES[0]"
        );
        assert_eq!(rewritten.channels, vec!["A", "B"]);
    }

    #[test]
    fn test_linked_series_becomes_value() {
        let rewritten = rewrite_channels("$$A$$ * $$B$$", "A").unwrap();

        assert_eq!(rewritten.text, "value * CHANNEL_VALUES[0]");
        assert_eq!(rewritten.channels, vec!["B"]);
    }

    #[test]
    fn test_unterminated_macro() {
        let err = rewrite_channels("$$A$$ + $$B", "X").unwrap_err();
        assert!(matches!(err, TransformError::Syntax(_)));
        assert!(err.to_string().contains("invalid use of $$ macro"));
    }

    #[test]
    fn test_no_macros() {
        let rewritten = rewrite_channels("value * 2.0", "X").unwrap();
        assert_eq!(rewritten.text, "value * 2.0");
        assert!(rewritten.channels.is_empty());
    }

    #[test]
    fn test_names_with_spaces_and_symbols() {
        let rewritten = rewrite_channels("$$motor speed (rpm)$$/60", "X").unwrap();
        assert_eq!(rewritten.text, "CHANNEL_VALUES[0]/60");
        assert_eq!(rewritten.channels, vec!["motor speed (rpm)"]);
    }

    #[test]
    fn test_adjacent_macros() {
        let rewritten = rewrite_channels("$$a$$$$b$$", "X").unwrap();
        assert_eq!(rewritten.text, "CHANNEL_VALUES[0]CHANNEL_VALUES[1]");
    }

    #[test]
    fn test_channels_in_expression() {
        assert_eq!(
            channels_in_expression("$$a$$ + $$b$$ - $$a$$"),
            vec!["a", "b", "a"]
        );
        assert!(channels_in_expression("$$a$$ + $$b").is_empty());
        assert!(channels_in_expression("1 + 2").is_empty());
    }

    proptest! {
        #[test]
        fn prop_rewrite_removes_all_macros(
            names in prop::collection::vec("[a-z][a-z0-9_]{0,8}", 0..6),
            linked in "[a-z]{1,4}",
        ) {
            let expression = names
                .iter()
                .map(|n| format!("$${}$$", n))
                .collect::<Vec<_>>()
                .join(" + ");
            let rewritten = rewrite_channels(&expression, &linked).unwrap();

            prop_assert!(!rewritten.text.contains(MACRO_DELIMITER));
            prop_assert!(!rewritten.channels.contains(&linked));

            let mut expected: Vec<String> = Vec::new();
            for name in names.iter().filter(|n| **n != linked) {
                if !expected.contains(name) {
                    expected.push(name.clone());
                }
            }
            prop_assert_eq!(rewritten.channels, expected);
        }

        #[test]
        fn prop_text_without_delimiters_is_unchanged(text in "[^$]{0,64}") {
            let rewritten = rewrite_channels(&text, "x").unwrap();
            prop_assert_eq!(rewritten.text, text);
            prop_assert!(rewritten.channels.is_empty());
        }
    }
}
