//! Everything that lands in the output directory.
//!
//! - [`write_if_needed`]: one rendered page, skipped when it already exists
//!   unless republishing.
//! - [`AssetSource`]: the scaffold (stylesheets, scripts, the index page)
//!   copied into the output root before pages are written. Without a
//!   scaffold directory the [`BuiltinAssets`] are installed instead.
//! - [`inject_site_title`]: fills `{{ .site_title }}` in the scaffold's
//!   `index.html`.
//!
//! All file writes go through [`write_atomic`]: content goes to a fresh
//! temporary file in the target directory, is synced, and is renamed into
//! place, so a reader never sees half a page and a failed write leaves the
//! old file alone.

use crate::render::{RenderError, SITE_TITLE_SLOT, Template, escape_html};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Menu element script shipped with the binary.
pub const MENU_SCRIPT: &str = include_str!("../assets/etc/menu.js");

/// Where [`MENU_SCRIPT`] lands, relative to the output root.
pub const MENU_SCRIPT_PATH: &str = "etc/menu.js";

/// Write `contents` to `path` via a synced temporary file and a rename.
///
/// Creates missing parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let mut tmp = NamedTempFile::new_in(&parent)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Write a rendered page unless it already exists.
///
/// Returns `true` when the file was written: the target was missing, or
/// `force` is set.
pub fn write_if_needed(page: &str, path: &Path, force: bool) -> io::Result<bool> {
    if path.exists() && !force {
        return Ok(false);
    }
    write_atomic(path, page.as_bytes())?;
    Ok(true)
}

/// Static assets installed into the output root.
pub trait AssetSource {
    /// Copy the assets into `output_dir`.
    fn install(&self, output_dir: &Path) -> io::Result<()>;
}

/// No scaffold: the output directory is created and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAssets;

impl AssetSource for NoAssets {
    fn install(&self, output_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(output_dir)
    }
}

/// The scaffold compiled into the binary: the menu element script.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinAssets;

impl AssetSource for BuiltinAssets {
    fn install(&self, output_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(output_dir)?;
        write_atomic(&output_dir.join(MENU_SCRIPT_PATH), MENU_SCRIPT.as_bytes())
    }
}

/// A scaffold directory on disk, falling back to [`BuiltinAssets`].
#[derive(Debug, Clone)]
pub struct DirectoryAssets {
    pub root: PathBuf,
}

impl DirectoryAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for DirectoryAssets {
    /// Top-level files overwrite their counterparts; top-level directories
    /// replace theirs wholesale, so assets removed from the scaffold also
    /// disappear from the output.
    fn install(&self, output_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(output_dir)?;
        if !self.root.is_dir() {
            tracing::debug!(scaffold = %self.root.display(), "no scaffold directory, using built-in assets");
            return BuiltinAssets.install(output_dir);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let target = output_dir.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                if target.is_dir() {
                    fs::remove_dir_all(&target)?;
                }
                copy_dir_recursive(&entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = dst.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Fill `{{ .site_title }}` in `index_html`, if both exist.
///
/// An index that does not work as a template is left as it is. Returns
/// whether the file was rewritten.
pub fn inject_site_title(index_html: &Path, title: &str) -> Result<bool, RenderError> {
    if title.is_empty() || !index_html.is_file() {
        return Ok(false);
    }
    let io_error = |source| RenderError::Io {
        path: index_html.to_path_buf(),
        source,
    };
    let source = fs::read_to_string(index_html).map_err(io_error)?;
    let name = index_html.display().to_string();
    let uses_title = Template::parse(&name, &source)
        .and_then(|template| Ok((template.uses(SITE_TITLE_SLOT)?, template)));
    let template = match uses_title {
        Ok((true, template)) => template,
        Ok((false, _)) => return Ok(false),
        Err(e) => {
            tracing::debug!(index = %name, error = %e, "index is not a template, leaving it alone");
            return Ok(false);
        }
    };
    let filled = template.fill(&[(SITE_TITLE_SLOT, &escape_html(title))])?;
    write_atomic(index_html, filled.as_bytes()).map_err(io_error)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // =========================================================================
    // write_if_needed
    // =========================================================================

    #[test]
    fn writes_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.html");
        assert!(write_if_needed("<p>hi</p>", &path, false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn skips_existing_file_without_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.html");
        fs::write(&path, "old").unwrap();
        assert!(!write_if_needed("new", &path, false).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn overwrites_existing_file_with_force() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.html");
        fs::write(&path, "old").unwrap();
        assert!(write_if_needed("new", &path, true).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn creates_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("etc/deep/menu.json");
        write_atomic(&path, b"[]").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn atomic_write_ignores_leftover_temporary_names() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".site.toml.tmp")).unwrap();
        let path = tmp.path().join("site.toml");
        write_atomic(&path, b"version = 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "version = 1\n");
    }

    #[test]
    fn atomic_write_leaves_only_the_target() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hello.html");
        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("hello.html")]);
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
    }

    #[test]
    fn write_into_missing_parent_that_is_a_file_fails() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("blocker"), "").unwrap();
        let result = write_if_needed("x", &tmp.path().join("blocker/page.html"), false);
        assert!(result.is_err());
    }

    // =========================================================================
    // Scaffold
    // =========================================================================

    #[test]
    fn directory_assets_copy_tree() {
        let tmp = TempDir::new().unwrap();
        let scaffold = tmp.path().join("scaffold");
        fs::create_dir_all(scaffold.join("etc/fonts")).unwrap();
        fs::write(scaffold.join("index.html"), "index").unwrap();
        fs::write(scaffold.join("etc/menu.js"), "js").unwrap();
        fs::write(scaffold.join("etc/fonts/a.woff"), "font").unwrap();

        let out = tmp.path().join("out");
        DirectoryAssets::new(&scaffold).install(&out).unwrap();

        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "index");
        assert_eq!(fs::read_to_string(out.join("etc/menu.js")).unwrap(), "js");
        assert_eq!(
            fs::read_to_string(out.join("etc/fonts/a.woff")).unwrap(),
            "font"
        );
    }

    #[test]
    fn directory_assets_replace_stale_directories() {
        let tmp = TempDir::new().unwrap();
        let scaffold = tmp.path().join("scaffold");
        fs::create_dir_all(scaffold.join("etc")).unwrap();
        fs::write(scaffold.join("etc/menu.js"), "js").unwrap();

        let out = tmp.path().join("out");
        fs::create_dir_all(out.join("etc")).unwrap();
        fs::write(out.join("etc/removed.js"), "old").unwrap();
        fs::write(out.join("hello.html"), "page").unwrap();

        DirectoryAssets::new(&scaffold).install(&out).unwrap();

        assert!(!out.join("etc/removed.js").exists());
        assert!(out.join("etc/menu.js").exists());
        assert!(out.join("hello.html").exists());
    }

    #[test]
    fn missing_scaffold_installs_builtin_menu_script() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        DirectoryAssets::new(tmp.path().join("nope"))
            .install(&out)
            .unwrap();
        let script = fs::read_to_string(out.join("etc/menu.js")).unwrap();
        assert_eq!(script, MENU_SCRIPT);
        assert!(script.contains("customElements.define('data-menu', DataMenu)"));
        assert!(script.contains("this.getAttribute('data')"));
    }

    #[test]
    fn no_assets_only_creates_output() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        NoAssets.install(&out).unwrap();
        assert!(out.is_dir());
        assert!(!out.join("etc").exists());
    }

    // =========================================================================
    // Site title
    // =========================================================================

    #[test]
    fn inject_site_title_fills_field() {
        let tmp = TempDir::new().unwrap();
        let index = tmp.path().join("index.html");
        fs::write(&index, "<h1>{{ .site_title }}</h1>").unwrap();

        assert!(inject_site_title(&index, "Notes & Essays").unwrap());
        assert_eq!(
            fs::read_to_string(&index).unwrap(),
            "<h1>Notes &amp; Essays</h1>"
        );
    }

    #[test]
    fn inject_site_title_without_field_is_noop() {
        let tmp = TempDir::new().unwrap();
        let index = tmp.path().join("index.html");
        fs::write(&index, "<h1>Fixed</h1>").unwrap();
        assert!(!inject_site_title(&index, "Notes").unwrap());
        assert_eq!(fs::read_to_string(&index).unwrap(), "<h1>Fixed</h1>");
    }

    #[test]
    fn inject_empty_title_is_noop() {
        let tmp = TempDir::new().unwrap();
        let index = tmp.path().join("index.html");
        fs::write(&index, "<h1>{{ .site_title }}</h1>").unwrap();
        assert!(!inject_site_title(&index, "").unwrap());
    }

    #[test]
    fn inject_into_index_with_stray_braces_is_noop() {
        let tmp = TempDir::new().unwrap();
        let index = tmp.path().join("index.html");
        fs::write(&index, "<p>{{ oops</p>").unwrap();
        assert!(!inject_site_title(&index, "Notes").unwrap());
        assert_eq!(
            fs::read_to_string(&index).unwrap(),
            "<p>{{ oops</p>"
        );
    }

    #[test]
    fn inject_missing_index_is_noop() {
        let tmp = TempDir::new().unwrap();
        assert!(!inject_site_title(&tmp.path().join("index.html"), "T").unwrap());
    }
}
