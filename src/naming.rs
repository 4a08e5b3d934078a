//! Names derived from a document's file name.
//!
//! Every document gets three names from its file stem:
//!
//! - **Identity**: a stable slug used as the key in the publish state
//!   (`My_First Post!.md` → `my-first-post`).
//! - **Display title**: the fallback menu/page title when the front matter
//!   has no `name` (`my_first_post.md` → "My First Post").
//! - **Output file name**: the stem with the output extension
//!   (`my_first_post.md` → `my_first_post.html`).
//!
//! ## Title Casing
//!
//! The first letter of every run of letters is upper-cased and the rest are
//! lower-cased, then `_` and `-` become spaces. Digits and punctuation start
//! a new run, so `2nd_take` becomes "2Nd Take".

/// Stable identity for a document stem: lower-case, punctuation runs
/// collapsed to a single `-`, no leading or trailing separator.
pub fn document_identity(stem: &str) -> String {
    slug::slugify(stem)
}

/// Display title for a document stem.
///
/// - `"hello"` → `"Hello"`
/// - `"hello_world"` → `"Hello World"`
/// - `"release-NOTES"` → `"Release Notes"`
pub fn display_title(stem: &str) -> String {
    title_case(stem)
        .chars()
        .map(|c| if c == '_' || c == '-' { ' ' } else { c })
        .collect()
}

/// Output file name for a document stem.
pub fn output_file_name(stem: &str, extension: &str) -> String {
    format!("{}.{}", stem, extension)
}

fn title_case(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut previous_is_letter = false;
    for c in input.chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(c);
            previous_is_letter = false;
        }
    }
    result
}
