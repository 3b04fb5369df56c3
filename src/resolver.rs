//! The Resolver (component D): the single source of "does this path exist"
//! for the filesystem. Classifies a parsed path against the Metadata Store
//! into Root / TagDir / File, or rejects it as NOENT.

use std::collections::HashSet;

use crate::error::FsError;
use crate::model::{FileId, TagId};
use crate::path::ParsedPath;
use crate::store::MetadataStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Root,
    TagDir(Vec<TagId>),
    File {
        id: FileId,
        tags: Vec<TagId>,
        hidden: bool,
    },
}

/// Resolve every tag name in `names` against the store, failing NOENT on the
/// first unknown one (a dead tag anywhere in the sequence kills the whole
/// path).
pub fn resolve_tag_names(store: &MetadataStore, names: &[&str]) -> Result<Vec<TagId>, FsError> {
    names
        .iter()
        .map(|n| store.tag_id(n).ok_or(FsError::NotFound))
        .collect()
}

pub fn resolve(store: &MetadataStore, parsed: &ParsedPath) -> Result<Resolved, FsError> {
    let tag_names: Vec<&str> = parsed.tag_sequence.iter().map(|c| c.name.as_str()).collect();
    let tag_ids = resolve_tag_names(store, &tag_names)?;

    let Some(leaf) = &parsed.leaf else {
        return if tag_ids.is_empty() {
            Ok(Resolved::Root)
        } else {
            Ok(Resolved::TagDir(tag_ids))
        };
    };

    if let Some(file_id) = store.file_id(&leaf.name) {
        let true_tags: HashSet<TagId> = store.file_tag_ids(file_id).cloned().unwrap_or_default();
        let path_tags: HashSet<TagId> = tag_ids.iter().copied().collect();

        let consistent = if leaf.hidden {
            path_tags.is_subset(&true_tags)
        } else {
            path_tags == true_tags
        };

        return if consistent {
            Ok(Resolved::File {
                id: file_id,
                tags: tag_ids,
                hidden: leaf.hidden,
            })
        } else {
            Err(FsError::NotFound)
        };
    }

    // Not a file: maybe the leaf names a Tag, making this equivalent to a
    // TagDir over the full sequence (a leaf with no trailing slash still
    // denotes a directory when it names a tag, not a file).
    if let Some(tag_id) = store.tag_id(&leaf.name) {
        let mut all = tag_ids;
        all.push(tag_id);
        return Ok(Resolved::TagDir(all));
    }

    Err(FsError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::parse;

    fn setup() -> MetadataStore {
        let mut s = MetadataStore::new();
        s.insert_tag("music").unwrap();
        s.insert_tag("jazz").unwrap();
        s.insert_file("tune", &["music", "jazz"]).unwrap();
        s
    }

    #[test]
    fn root_resolves() {
        let s = setup();
        assert_eq!(resolve(&s, &parse("/").unwrap()).unwrap(), Resolved::Root);
    }

    #[test]
    fn tag_dir_resolves_with_trailing_slash() {
        let s = setup();
        let r = resolve(&s, &parse("/music/").unwrap()).unwrap();
        assert!(matches!(r, Resolved::TagDir(tags) if tags == vec![s.tag_id("music").unwrap()]));
    }

    #[test]
    fn leaf_naming_a_tag_is_also_a_tag_dir() {
        let s = setup();
        let r = resolve(&s, &parse("/music").unwrap()).unwrap();
        assert!(matches!(r, Resolved::TagDir(_)));
    }

    #[test]
    fn exact_tag_set_match_is_visible() {
        let s = setup();
        let r = resolve(&s, &parse("/music/jazz/tune").unwrap()).unwrap();
        match r {
            Resolved::File { hidden, .. } => assert!(!hidden),
            _ => panic!("expected File"),
        }
    }

    #[test]
    fn subset_tag_set_requires_hidden_marker() {
        let s = setup();
        // /music/tune isn't the file's complete tag set and isn't hidden -> NOENT
        assert!(resolve(&s, &parse("/music/tune").unwrap()).is_err());
        // /music/.tune is hidden and a subset -> resolves
        assert!(resolve(&s, &parse("/music/.tune").unwrap()).is_ok());
    }

    #[test]
    fn dead_tag_in_sequence_is_noent() {
        let s = setup();
        assert!(resolve(&s, &parse("/nope/tune").unwrap()).is_err());
    }
}
