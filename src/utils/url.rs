// src/utils/url.rs

//! URL canonicalization utilities.

use url::Url;

use crate::error::{AppError, Result};

/// Extract the topic id from a thread link and rebuild a canonical URL
/// carrying only the `topic` query parameter.
///
/// The source emits links like
/// `https://geekhack.org/index.php?topic=123456.0&PHPSESSID=...`; the id is
/// the integer part of the `topic` value and everything else in the query
/// string is noise.
pub fn canonical_topic(href: &str) -> Result<(i64, String)> {
    let parsed = Url::parse(href)?;

    let raw_topic = parsed
        .query_pairs()
        .find(|(key, _)| key == "topic")
        .map(|(_, value)| value.to_string())
        .ok_or_else(|| AppError::parse("topic url", format!("no topic parameter in {href}")))?;

    // Topic values arrive as "123456.0" (id dot message offset).
    let id = raw_topic
        .parse::<f64>()
        .map_err(|e| AppError::parse("topic url", format!("bad topic '{raw_topic}': {e}")))?
        as i64;

    let host = parsed
        .host_str()
        .ok_or_else(|| AppError::parse("topic url", format!("no host in {href}")))?;

    let clean = format!("{}://{}{}?topic={}", parsed.scheme(), host, parsed.path(), id);
    Ok((id, clean))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_topic_strips_noise() {
        let (id, url) =
            canonical_topic("https://geekhack.org/index.php?topic=123456.0&PHPSESSID=abc123")
                .unwrap();
        assert_eq!(id, 123456);
        assert_eq!(url, "https://geekhack.org/index.php?topic=123456");
    }

    #[test]
    fn test_canonical_topic_plain_id() {
        let (id, url) = canonical_topic("https://geekhack.org/index.php?topic=99999").unwrap();
        assert_eq!(id, 99999);
        assert_eq!(url, "https://geekhack.org/index.php?topic=99999");
    }

    #[test]
    fn test_canonical_topic_missing_parameter() {
        assert!(canonical_topic("https://geekhack.org/index.php?board=70.0").is_err());
    }

    #[test]
    fn test_canonical_topic_invalid_url() {
        assert!(canonical_topic("not a url").is_err());
    }
}
