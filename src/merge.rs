//! Merging a document's front matter with its existing publish record.
//!
//! ## First Publish
//!
//! - `published`: the explicit front-matter date, else the run's current
//!   time. `published: now` also means the current time.
//! - `name`: the explicit `name`, else the display title of the file stem.
//! - `republished`: absent.
//!
//! ## Republish
//!
//! - `published`: unchanged, unless the front matter names a concrete
//!   date, which replaces it. `now` never moves an existing date.
//! - `name`: the explicit `name`, else the recorded one.
//! - `republished`: the run's current time.
//!
//! Paths and the source hash are refreshed either way. All timestamps are
//! written in the canonical format in the zone carried by `now`.

use crate::dates::{self, DateError, ExplicitDate};
use crate::document::Document;
use crate::naming;
use crate::state::PublishRecord;
use chrono::{DateTime, FixedOffset};
use serde_yaml::Value;

/// Build the record a document should have after this run.
///
/// Fails with [`DateError::InvalidDateFormat`] when the front matter
/// carries a `published` value that cannot be read as a date; the caller
/// skips that document.
pub fn derive_publish_record(
    document: &Document,
    content_path: &str,
    output_path: &str,
    existing: Option<&PublishRecord>,
    now: DateTime<FixedOffset>,
) -> Result<PublishRecord, DateError> {
    let explicit = explicit_date(document, now.offset())?;
    let stamp = dates::format_canonical(&now);

    let name = document
        .metadata
        .name()
        .map(str::to_string)
        .or_else(|| existing.map(|r| r.name.clone()))
        .unwrap_or_else(|| naming::display_title(&document.stem));

    let (published, republished) = match existing {
        None => {
            let published = match explicit {
                Some(ExplicitDate::At(at)) => dates::format_canonical(&at),
                Some(ExplicitDate::Now) | None => stamp.clone(),
            };
            (published, None)
        }
        Some(record) => {
            let published = match explicit {
                Some(ExplicitDate::At(at)) => dates::format_canonical(&at),
                Some(ExplicitDate::Now) | None => record.published.clone(),
            };
            (published, Some(stamp))
        }
    };

    Ok(PublishRecord {
        name,
        published,
        content_path: content_path.to_string(),
        output_path: output_path.to_string(),
        republished,
        source_hash: Some(document.source_hash.clone()),
    })
}

fn explicit_date(
    document: &Document,
    zone: &FixedOffset,
) -> Result<Option<ExplicitDate>, DateError> {
    match document.metadata.published() {
        None => Ok(None),
        Some(Value::String(s)) => dates::parse_explicit(s, zone).map(Some),
        Some(other) => Err(DateError::InvalidDateFormat(
            serde_yaml::to_string(other)
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    fn merge(doc: &Document, existing: Option<&PublishRecord>) -> Result<PublishRecord, DateError> {
        let output = format!("{}.html", doc.stem);
        derive_publish_record(doc, &format!("{}.md", doc.stem), &output, existing, fixed_now())
    }

    // =========================================================================
    // First publish
    // =========================================================================

    #[test]
    fn first_publish_defaults() {
        let d = doc("my_first-post", "hello");
        let record = merge(&d, None).unwrap();
        assert_eq!(record.name, "My First Post");
        assert_eq!(record.published, FIXED_NOW_CANONICAL);
        assert_eq!(record.content_path, "my_first-post.md");
        assert_eq!(record.output_path, "my_first-post.html");
        assert_eq!(record.republished, None);
        assert_eq!(record.source_hash.as_deref(), Some(d.source_hash.as_str()));
    }

    #[test]
    fn first_publish_uses_explicit_date_and_name() {
        let d = doc("x", "---\nname: Custom\npublished: 2023-01-02\n---\nbody");
        let record = merge(&d, None).unwrap();
        assert_eq!(record.name, "Custom");
        assert_eq!(record.published, "2023 January 02 00:00:00");
    }

    #[test]
    fn first_publish_converts_offset_dates_into_reference_zone() {
        let d = doc("x", "---\npublished: 2024-03-05T15:00:00Z\n---\n");
        let record = merge(&d, None).unwrap();
        assert_eq!(record.published, "2024 March 05 10:00:00");
    }

    #[test]
    fn literal_now_on_first_publish_is_current_time() {
        let d = doc("x", "---\npublished: now\n---\n");
        assert_eq!(merge(&d, None).unwrap().published, FIXED_NOW_CANONICAL);
    }

    #[test]
    fn unparseable_date_is_rejected() {
        let d = doc("x", "---\npublished: someday soon\n---\n");
        assert_eq!(
            merge(&d, None),
            Err(DateError::InvalidDateFormat("someday soon".into()))
        );
    }

    #[test]
    fn non_string_date_is_rejected() {
        let d = doc("x", "---\npublished: 20240305\n---\n");
        assert!(matches!(merge(&d, None), Err(DateError::InvalidDateFormat(_))));
    }

    // =========================================================================
    // Republish
    // =========================================================================

    #[test]
    fn republish_keeps_published_and_stamps_republished() {
        let d = doc("hello", "updated body");
        let existing = record_for(&d, "2023 June 01 12:00:00");
        let record = merge(&d, Some(&existing)).unwrap();
        assert_eq!(record.published, "2023 June 01 12:00:00");
        assert_eq!(record.republished.as_deref(), Some(FIXED_NOW_CANONICAL));
    }

    #[test]
    fn republish_keeps_legacy_date_only_value() {
        let d = doc("hello", "x");
        let existing = record_for(&d, "2019 May 04");
        let record = merge(&d, Some(&existing)).unwrap();
        assert_eq!(record.published, "2019 May 04");
    }

    #[test]
    fn republish_with_explicit_date_overrides() {
        let d = doc("hello", "---\npublished: 2020-02-02 08:15\n---\n");
        let existing = record_for(&d, "2023 June 01 12:00:00");
        let record = merge(&d, Some(&existing)).unwrap();
        assert_eq!(record.published, "2020 February 02 08:15:00");
    }

    #[test]
    fn republish_with_literal_now_keeps_published() {
        let d = doc("hello", "---\npublished: now\n---\n");
        let existing = record_for(&d, "2023 June 01 12:00:00");
        let record = merge(&d, Some(&existing)).unwrap();
        assert_eq!(record.published, "2023 June 01 12:00:00");
    }

    #[test]
    fn republish_keeps_recorded_name_unless_explicit() {
        let d = doc("hello", "body");
        let mut existing = record_for(&d, "2023 June 01 12:00:00");
        existing.name = "Hand Edited".into();
        assert_eq!(merge(&d, Some(&existing)).unwrap().name, "Hand Edited");

        let renamed = doc("hello", "---\nname: From Metadata\n---\n");
        assert_eq!(merge(&renamed, Some(&existing)).unwrap().name, "From Metadata");
    }

    #[test]
    fn republish_refreshes_paths() {
        let d = doc("hello", "body");
        let mut existing = record_for(&d, "2023 June 01 12:00:00");
        existing.content_path = "/old/abs/hello.md".into();
        existing.output_path = "/old/out/hello.html".into();
        let record = merge(&d, Some(&existing)).unwrap();
        assert_eq!(record.content_path, "hello.md");
        assert_eq!(record.output_path, "hello.html");
    }
}
