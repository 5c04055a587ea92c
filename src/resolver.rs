//! Directory scanning and mode resolution.
//!
//! A unit file is named `<section>[.<mode>].<ext>`. For each section the
//! resolver keeps at most one file for the requested mode:
//!
//! * without a mode only unqualified files are used;
//! * with a mode, `<section>.<mode>.<ext>` wins over `<section>.<ext>`;
//! * files qualified with any other mode are ignored, and never suppress
//!   the unqualified file.

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::errors::LoadError;

/// One loadable unit picked from a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub section: String,
    pub mode: Option<String>,
    pub file_name: String,
}

/// Splits `file_name` into section and optional mode qualifier.
///
/// Returns `None` for names that are not units: wrong extension, an empty
/// section or qualifier, or more than one qualifier level.
pub fn classify(file_name: &str, extension: &str) -> Option<Candidate> {
    let base = file_name.strip_suffix(extension)?.strip_suffix('.')?;
    let (section, mode) = match base.split_once('.') {
        None => (base, None),
        Some((section, mode)) if !mode.contains('.') && !mode.is_empty() => (section, Some(mode)),
        Some(_) => return None,
    };
    if section.is_empty() {
        return None;
    }
    Some(Candidate {
        section: section.to_string(),
        mode: mode.map(str::to_string),
        file_name: file_name.to_string(),
    })
}

/// Picks the winning units among `file_names` for `mode`.
///
/// Pure counterpart of [`resolve`]; the listing is supplied by the caller.
pub fn select<'a, I>(
    file_names: I,
    mode: &str,
    names: Option<&BTreeSet<String>>,
    extension: &str,
) -> Vec<Candidate>
where
    I: IntoIterator<Item = &'a str>,
{
    let listing: Vec<&str> = file_names.into_iter().collect();
    let present: HashSet<&str> = listing.iter().copied().collect();

    let mut selected: Vec<Candidate> = listing
        .iter()
        .filter_map(|name| {
            let candidate = classify(name, extension);
            if candidate.is_none() {
                debug!(file = *name, "not a config unit, ignored");
            }
            candidate
        })
        .filter(|c| names.map_or(true, |allowed| allowed.contains(&c.section)))
        .filter(|c| match c.mode.as_deref() {
            None => {
                if mode.is_empty() {
                    return true;
                }
                let counterpart = format!("{}.{mode}.{extension}", c.section);
                let keep = !present.contains(counterpart.as_str());
                if !keep {
                    debug!(file = %c.file_name, winner = %counterpart, "superseded by mode variant");
                }
                keep
            }
            Some(qualifier) => {
                let keep = qualifier == mode;
                if !keep {
                    debug!(file = %c.file_name, mode = qualifier, "belongs to another mode");
                }
                keep
            }
        })
        .collect();

    selected.sort_by(|a, b| a.section.cmp(&b.section));
    selected
}

/// Lists `dir` and picks the units to load for `mode`.
///
/// A listing failure is returned as [`LoadError::Scan`] with the original
/// `io::Error`. Directories and non UTF-8 names are skipped.
pub fn resolve(
    dir: &Path,
    mode: &str,
    names: Option<&BTreeSet<String>>,
    extension: &str,
) -> Result<Vec<Candidate>, LoadError> {
    let scan_err = |source| LoadError::Scan { path: dir.to_path_buf(), source };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(scan_err)? {
        let entry = entry.map_err(scan_err)?;
        if entry.file_type().map_or(false, |t| t.is_dir()) {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(raw) => debug!(file = ?raw, "non UTF-8 file name, ignored"),
        }
    }
    Ok(select(files.iter().map(String::as_str), mode, names, extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pick(files: &[&str], mode: &str) -> Vec<String> {
        select(files.iter().copied(), mode, None, "cfg")
            .into_iter()
            .map(|c| c.file_name)
            .collect()
    }

    #[test]
    fn classify_shapes() {
        let c = classify("server.test.cfg", "cfg").unwrap();
        assert_eq!(c.section, "server");
        assert_eq!(c.mode.as_deref(), Some("test"));
        assert_eq!(classify("server.cfg", "cfg").unwrap().mode, None);
        assert_eq!(classify("server.json", "cfg"), None);
        assert_eq!(classify("servercfg", "cfg"), None);
        assert_eq!(classify("a.b.c.cfg", "cfg"), None);
        assert_eq!(classify(".cfg", "cfg"), None);
        assert_eq!(classify(".test.cfg", "cfg"), None);
        assert_eq!(classify("server..cfg", "cfg"), None);
    }

    #[test]
    fn no_mode_uses_unqualified_files_only() {
        let files = ["server.cfg", "server.test.cfg", "gateway.test.cfg"];
        assert_eq!(pick(&files, ""), vec!["server.cfg"]);
    }

    #[test]
    fn requested_mode_wins_over_default() {
        let files = ["server.cfg", "server.test.cfg", "app.cfg", "app.prod.cfg"];
        assert_eq!(pick(&files, "test"), vec!["app.cfg", "server.test.cfg"]);
        assert_eq!(pick(&files, "prod"), vec!["app.prod.cfg", "server.cfg"]);
        assert_eq!(pick(&files, "dev"), vec!["app.cfg", "server.cfg"]);
    }

    #[test]
    fn qualified_only_section_appears_for_its_mode() {
        let files = ["gateway.test.cfg"];
        assert_eq!(pick(&files, "test"), vec!["gateway.test.cfg"]);
        assert!(pick(&files, "prod").is_empty());
    }

    #[test]
    fn name_filter_applies_before_mode() {
        let names: BTreeSet<String> = ["application", "gateway"].into_iter().map(String::from).collect();
        let files = ["application.cfg", "gateway.test.cfg", "server.cfg"];
        let picked: Vec<_> = select(files, "", Some(&names), "cfg")
            .into_iter()
            .map(|c| c.section)
            .collect();
        assert_eq!(picked, vec!["application"]);
    }

    #[test]
    fn missing_directory_keeps_io_kind() {
        let err = resolve(Path::new("./definitely/not/here"), "", None, "cfg").unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }
}
