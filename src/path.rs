//! The Path Grammar (component A): turns a POSIX-ish path into a sequence of
//! directory-tag components plus an optional leaf, tracking the hidden-marker
//! dot on each component along the way.

use std::ffi::OsStr;

use crate::error::FsError;

/// A single path component, with its leading-dot hidden marker already split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub hidden: bool,
}

impl Component {
    pub fn new(raw: &str) -> Self {
        match raw.strip_prefix('.') {
            Some(rest) => Component {
                name: rest.to_string(),
                hidden: true,
            },
            None => Component {
                name: raw.to_string(),
                hidden: false,
            },
        }
    }
}

/// The parsed form of a whole path: `/` yields an empty sequence and no leaf,
/// `/a/b/` yields `tag_sequence = [a, b]` with no leaf, `/a/b/c` yields
/// `tag_sequence = [a, b]` with leaf `c`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub tag_sequence: Vec<Component>,
    pub leaf: Option<Component>,
}

/// Parse a path for read-only purposes (lookup/readdir/getattr): `.`/`..`
/// segments and empty segments are simply rejected, since no valid path in
/// this filesystem ever contains them.
pub fn parse(path: &str) -> Result<ParsedPath, FsError> {
    if !path.starts_with('/') {
        return Err(FsError::InvalidName);
    }

    let trailing_slash = path.len() > 1 && path.ends_with('/');
    let parts: Vec<&str> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    for part in &parts {
        reject_dotdot(part)?;
    }

    if parts.is_empty() {
        return Ok(ParsedPath {
            tag_sequence: vec![],
            leaf: None,
        });
    }

    if trailing_slash {
        Ok(ParsedPath {
            tag_sequence: parts.iter().map(|s| Component::new(s)).collect(),
            leaf: None,
        })
    } else {
        let (last, rest) = parts.split_last().expect("parts is non-empty");
        Ok(ParsedPath {
            tag_sequence: rest.iter().map(|s| Component::new(s)).collect(),
            leaf: Some(Component::new(last)),
        })
    }
}

/// Parse a single kernel-supplied path component (as handed to `lookup`,
/// `mkdir`, `create`, ...). Used by the FUSE binding, which never sees a full
/// path, only one component per call.
pub fn parse_component(name: &OsStr) -> Result<Component, FsError> {
    let raw = name.to_str().ok_or(FsError::InvalidName)?;
    reject_dotdot(raw)?;
    Ok(Component::new(raw))
}

fn reject_dotdot(part: &str) -> Result<(), FsError> {
    if part.is_empty() || part == "." || part == ".." {
        Err(FsError::InvalidName)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(seq: &[Component]) -> Vec<&str> {
        seq.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn root_path() {
        let p = parse("/").unwrap();
        assert!(p.tag_sequence.is_empty());
        assert!(p.leaf.is_none());
    }

    #[test]
    fn trailing_slash_is_tag_dir() {
        let p = parse("/a/b/").unwrap();
        assert_eq!(names(&p.tag_sequence), vec!["a", "b"]);
        assert!(p.leaf.is_none());
    }

    #[test]
    fn no_trailing_slash_splits_off_leaf() {
        let p = parse("/a/b/c").unwrap();
        assert_eq!(names(&p.tag_sequence), vec!["a", "b"]);
        assert_eq!(p.leaf.unwrap().name, "c");
    }

    #[test]
    fn leading_dot_is_hidden_marker() {
        let p = parse("/a/.b").unwrap();
        assert!(!p.tag_sequence[0].hidden);
        let leaf = p.leaf.unwrap();
        assert_eq!(leaf.name, "b");
        assert!(leaf.hidden);
    }

    #[test]
    fn rejects_dot_and_dotdot_segments() {
        assert!(parse("/a/./b").is_err());
        assert!(parse("/a/../b").is_err());
    }

    #[test]
    fn single_component_strips_hidden_marker() {
        let c = parse_component(std::ffi::OsStr::new(".tune")).unwrap();
        assert_eq!(c.name, "tune");
        assert!(c.hidden);
    }

    #[test]
    fn single_component_rejects_dotdot() {
        assert!(parse_component(std::ffi::OsStr::new("..")).is_err());
        assert!(parse_component(std::ffi::OsStr::new("")).is_err());
    }
}
