//! The "recent posts" menu.
//!
//! Recomputed from the whole publish state on every run that publishes
//! anything, so it never drifts from the records. Entries are ordered by
//! `published`, oldest first, and only the newest `limit` are kept. Ties
//! break on identity. Values that do not parse as a canonical timestamp sort
//! before every real date.

use crate::dates;
use crate::state::PublishState;
use crate::write::write_atomic;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

pub const DEFAULT_MENU_LIMIT: usize = 5;

/// Location of the menu data, relative to the output root.
pub const MENU_DATA_PATH: &str = "etc/menu_data.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub name: String,
    pub url: String,
}

/// The newest `limit` records as menu entries, in ascending date order.
pub fn project_menu(state: &PublishState, limit: usize) -> Vec<MenuEntry> {
    let mut records: Vec<_> = state
        .articles
        .iter()
        .map(|(id, record)| (dates::parse_canonical(&record.published), id, record))
        .collect();
    records.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

    let skip = records.len().saturating_sub(limit);
    records
        .into_iter()
        .skip(skip)
        .map(|(_, _, record)| MenuEntry {
            name: record.name.clone(),
            url: record.url(),
        })
        .collect()
}

/// Write the menu as a pretty-printed JSON array.
pub fn write_menu(entries: &[MenuEntry], path: &Path) -> io::Result<()> {
    let json = serde_json::to_string_pretty(entries).map_err(io::Error::other)?;
    write_atomic(path, json.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PublishRecord;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn record(name: &str, published: &str, output: &str) -> PublishRecord {
        PublishRecord {
            name: name.into(),
            published: published.into(),
            content_path: output.replace(".html", ".md"),
            output_path: output.into(),
            republished: None,
            source_hash: None,
        }
    }

    fn entry(name: &str, url: &str) -> MenuEntry {
        MenuEntry {
            name: name.into(),
            url: url.into(),
        }
    }

    fn state_of(records: &[(&str, PublishRecord)]) -> PublishState {
        let mut state = PublishState::empty();
        for (id, r) in records {
            state.articles.upsert(id, r.clone(), None);
        }
        state
    }

    #[test]
    fn sorted_ascending_by_published() {
        let state = state_of(&[
            ("b", record("B", "2024 March 02 00:00:00", "b.html")),
            ("a", record("A", "2024 March 01 00:00:00", "a.html")),
            ("c", record("C", "2024 March 03 00:00:00", "c.html")),
        ]);
        assert_eq!(
            project_menu(&state, 5),
            vec![entry("A", "a.html"), entry("B", "b.html"), entry("C", "c.html")]
        );
    }

    #[test]
    fn keeps_only_newest_entries() {
        let records: Vec<_> = (1..=7)
            .map(|day| {
                let id = format!("p{day}");
                let r = record(
                    &format!("P{day}"),
                    &format!("2024 March {day:02} 00:00:00"),
                    &format!("{id}.html"),
                );
                (id, r)
            })
            .collect();
        let refs: Vec<_> = records.iter().map(|(id, r)| (id.as_str(), r.clone())).collect();
        let menu = project_menu(&state_of(&refs), 5);

        let names: Vec<_> = menu.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["P3", "P4", "P5", "P6", "P7"]);
    }

    #[test]
    fn legacy_dates_sort_as_midnight() {
        let state = state_of(&[
            ("late", record("Late", "2024 March 05 00:00:01", "late.html")),
            ("old", record("Old", "2024 March 05", "old.html")),
        ]);
        let names: Vec<_> = project_menu(&state, 5).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Old", "Late"]);
    }

    #[test]
    fn ties_break_on_identity() {
        let at = "2024 March 05 09:00:00";
        let state = state_of(&[
            ("zeta", record("Zeta", at, "zeta.html")),
            ("alpha", record("Alpha", at, "alpha.html")),
        ]);
        let names: Vec<_> = project_menu(&state, 5).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn unparseable_dates_sort_first() {
        let state = state_of(&[
            ("good", record("Good", "2024 March 05 09:00:00", "good.html")),
            ("bad", record("Bad", "someday", "bad.html")),
        ]);
        let names: Vec<_> = project_menu(&state, 1).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Good"]);
    }

    #[test]
    fn url_is_output_file_name() {
        let state = state_of(&[(
            "deep",
            record("Deep", "2024 March 05 09:00:00", "/srv/site/deep.html"),
        )]);
        assert_eq!(project_menu(&state, 5), vec![entry("Deep", "deep.html")]);
    }

    #[test]
    fn zero_limit_is_empty() {
        let state = state_of(&[("a", record("A", "2024 March 01 00:00:00", "a.html"))]);
        assert!(project_menu(&state, 0).is_empty());
    }

    #[test]
    fn write_menu_emits_json_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MENU_DATA_PATH);
        write_menu(&[entry("Hello", "hello.html")], &path).unwrap();

        let parsed: Vec<MenuEntry> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, vec![entry("Hello", "hello.html")]);
    }
}
