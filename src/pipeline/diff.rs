//! Classification of observed posts against the stored baseline.
//!
//! The differ is a pure comparison: it never touches storage. Absence of a
//! baseline is an expected, first-class case (`New`), not an error.

use crate::models::{Baseline, Post};

/// One of the six comparable post fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Url,
    Title,
    Author,
    Replies,
    ReplyTimestamp,
    ReplyAuthor,
}

impl Field {
    /// Every comparable field, in column order.
    pub const ALL: [Field; 6] = [
        Field::Url,
        Field::Title,
        Field::Author,
        Field::Replies,
        Field::ReplyTimestamp,
        Field::ReplyAuthor,
    ];

    /// The snapshot table column this field maps to.
    pub fn column(self) -> &'static str {
        match self {
            Field::Url => "url",
            Field::Title => "title",
            Field::Author => "author",
            Field::Replies => "replies",
            Field::ReplyTimestamp => "reply_timestamp",
            Field::ReplyAuthor => "reply_author",
        }
    }

    /// Whether this field differs between a baseline and an observation.
    ///
    /// Timestamps are compared as parsed instants, never as formatted
    /// strings; strings byte-exact; integers exact.
    fn differs(self, baseline: &Baseline, post: &Post) -> bool {
        match self {
            Field::Url => baseline.url != post.url,
            Field::Title => baseline.title != post.title,
            Field::Author => baseline.author != post.author,
            Field::Replies => baseline.replies != post.replies,
            Field::ReplyTimestamp => baseline.reply_timestamp != post.reply_timestamp,
            Field::ReplyAuthor => baseline.reply_author != post.reply_author,
        }
    }
}

/// Result of comparing an observed post to its baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// No baseline exists for this id yet.
    New,

    /// At least one comparable field differs; carries exactly the fields
    /// that need writing.
    Changed(Vec<Field>),

    /// Every comparable field matches; no write needed.
    Unchanged,
}

/// Classify an observed post against its stored baseline, if any.
pub fn classify(baseline: Option<&Baseline>, post: &Post) -> Classification {
    let Some(baseline) = baseline else {
        return Classification::New;
    };

    let changed: Vec<Field> = Field::ALL
        .into_iter()
        .filter(|field| field.differs(baseline, post))
        .collect();

    if changed.is_empty() {
        Classification::Unchanged
    } else {
        Classification::Changed(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_post() -> Post {
        Post {
            id: 99999,
            url: "https://geekhack.org/index.php?topic=99999".to_string(),
            title: "Test Posting".to_string(),
            author: "tester".to_string(),
            replies: 123456,
            reply_timestamp: NaiveDate::from_ymd_opt(2022, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            reply_author: "also_tester".to_string(),
            first_seen: NaiveDate::from_ymd_opt(2022, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    #[test]
    fn test_no_baseline_is_new() {
        assert_eq!(classify(None, &sample_post()), Classification::New);
    }

    #[test]
    fn test_identical_is_unchanged() {
        let post = sample_post();
        let baseline = Baseline::from(&post);
        assert_eq!(classify(Some(&baseline), &post), Classification::Unchanged);
    }

    #[test]
    fn test_single_field_change() {
        let mut post = sample_post();
        let baseline = Baseline::from(&post);
        post.replies += 1;

        assert_eq!(
            classify(Some(&baseline), &post),
            Classification::Changed(vec![Field::Replies])
        );
    }

    #[test]
    fn test_multiple_field_changes() {
        let mut post = sample_post();
        let baseline = Baseline::from(&post);
        post.replies += 1;
        post.reply_author = "newcomer".to_string();
        post.reply_timestamp = NaiveDate::from_ymd_opt(2022, 1, 2)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();

        let Classification::Changed(fields) = classify(Some(&baseline), &post) else {
            panic!("expected Changed");
        };
        assert_eq!(
            fields,
            vec![Field::Replies, Field::ReplyTimestamp, Field::ReplyAuthor]
        );
    }

    #[test]
    fn test_title_edit_detected() {
        let mut post = sample_post();
        let baseline = Baseline::from(&post);
        post.title = "[GB] Test Posting".to_string();

        assert_eq!(
            classify(Some(&baseline), &post),
            Classification::Changed(vec![Field::Title])
        );
    }

    #[test]
    fn test_first_seen_never_compared() {
        let mut post = sample_post();
        let baseline = Baseline::from(&post);
        post.first_seen = NaiveDate::from_ymd_opt(2023, 6, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();

        assert_eq!(classify(Some(&baseline), &post), Classification::Unchanged);
    }

    #[test]
    fn test_field_columns() {
        let columns: Vec<&str> = Field::ALL.iter().map(|f| f.column()).collect();
        assert_eq!(
            columns,
            vec![
                "url",
                "title",
                "author",
                "replies",
                "reply_timestamp",
                "reply_author"
            ]
        );
    }
}
