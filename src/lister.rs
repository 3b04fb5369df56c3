//! The Directory Lister (component E): the query-with-remainder-hiding
//! algorithm defining `readdir` output for the root and for a tag directory.

use crate::model::{FileId, TagId};
use crate::store::MetadataStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Tag(TagId),
    File(FileId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub hidden: bool,
    pub kind: EntryKind,
}

/// List the root: every Tag unprefixed, every File prefixed with `.` iff it
/// carries any tags. `hidden_limit` caps the number of hidden (dot-prefixed)
/// file entries emitted; `-1` (or any negative number) disables the cap.
pub fn list_root(store: &MetadataStore, hidden_limit: i64) -> Vec<Entry> {
    let mut entries: Vec<Entry> = store
        .all_tag_ids()
        .map(|id| Entry {
            name: store.tag_name(id).unwrap_or_default().to_string(),
            hidden: false,
            kind: EntryKind::Tag(id),
        })
        .collect();

    let mut hidden_emitted: i64 = 0;
    for name in store.all_file_names() {
        let Some(id) = store.file_id(name) else { continue };
        let has_tags = store
            .file_tag_ids(id)
            .map(|t| !t.is_empty())
            .unwrap_or(false);

        if has_tags {
            if hidden_limit >= 0 && hidden_emitted >= hidden_limit {
                continue;
            }
            hidden_emitted += 1;
        }

        entries.push(Entry {
            name: name.to_string(),
            hidden: has_tags,
            kind: EntryKind::File(id),
        });
    }

    entries
}

/// List a tag directory `tags` (must be non-empty and all resolved already
/// by the resolver -- this function assumes every id is valid).
pub fn list_tag_dir(store: &MetadataStore, tags: &[TagId]) -> Vec<Entry> {
    let matches = store.files_with_all_tag_ids(tags);
    let current: std::collections::HashSet<TagId> = tags.iter().copied().collect();

    let mut entries = Vec::new();

    for file_id in &matches {
        let true_tags = store.file_tag_ids(*file_id).cloned().unwrap_or_default();
        let exact = true_tags == current;
        entries.push(Entry {
            name: store.file_name(*file_id).unwrap_or_default().to_string(),
            hidden: !exact,
            kind: EntryKind::File(*file_id),
        });
    }

    for tag_id in store.all_tag_ids() {
        if current.contains(&tag_id) {
            continue;
        }
        let members = store.tag_members(tag_id).cloned().unwrap_or_default();
        let narrows = members.intersection(&matches).next().is_some();
        entries.push(Entry {
            name: store.tag_name(tag_id).unwrap_or_default().to_string(),
            hidden: !narrows,
            kind: EntryKind::Tag(tag_id),
        });
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entries: &[Entry]) -> Vec<(String, bool)> {
        let mut v: Vec<(String, bool)> = entries.iter().map(|e| (e.name.clone(), e.hidden)).collect();
        v.sort();
        v
    }

    #[test]
    fn scenario_one_root_and_tag_dirs() {
        let mut s = MetadataStore::new();
        s.insert_tag("music").unwrap();
        s.insert_tag("jazz").unwrap();
        s.insert_file("tune", &["music", "jazz"]).unwrap();

        assert_eq!(
            names(&list_root(&s, -1)),
            vec![
                ("jazz".to_string(), false),
                ("music".to_string(), false),
                ("tune".to_string(), true),
            ]
        );

        let music = s.tag_id("music").unwrap();
        let jazz = s.tag_id("jazz").unwrap();

        assert_eq!(
            names(&list_tag_dir(&s, &[music])),
            vec![("jazz".to_string(), false), ("tune".to_string(), true)]
        );

        assert_eq!(
            names(&list_tag_dir(&s, &[music, jazz])),
            vec![("tune".to_string(), false)]
        );
    }

    #[test]
    fn hidden_limit_caps_root_file_entries() {
        let mut s = MetadataStore::new();
        s.insert_tag("t").unwrap();
        s.insert_file("a", &["t"]).unwrap();
        s.insert_file("b", &["t"]).unwrap();
        s.insert_file("c", &["t"]).unwrap();

        let entries = list_root(&s, 1);
        let hidden_count = entries.iter().filter(|e| e.hidden).count();
        assert_eq!(hidden_count, 1);
    }

    #[test]
    fn no_duplicates_in_tag_dir_listing() {
        let mut s = MetadataStore::new();
        s.insert_tag("a").unwrap();
        s.insert_tag("b").unwrap();
        s.insert_file("f", &["a", "b"]).unwrap();

        let a = s.tag_id("a").unwrap();
        let entries = list_tag_dir(&s, &[a]);
        let mut seen = std::collections::HashSet::new();
        for e in &entries {
            assert!(seen.insert(e.name.clone()), "duplicate entry {}", e.name);
        }
    }
}
