//! The Mutation Engine (component F): the polymorphic semantics of `mkdir`,
//! `rmdir`, `create`, `unlink`, `rename`, `symlink`, `link` against the
//! Metadata Store and Blob Store, composed atomically.
//!
//! Every function here takes its directory-tag-sequence and leaf already
//! split apart (the shape the FUSE binding naturally has after walking the
//! inode allocator's parent chain), rather than a raw path string -- see
//! `path::parse` for the whole-path entry point used by tests and any
//! future CLI tooling.

use std::path::{Path, PathBuf};

use crate::blob::{BlobHandle, BlobStore};
use crate::error::FsError;
use crate::model::FileId;
use crate::path::Component;
use crate::store::MetadataStore;

const MAGIC_SENTINEL: &str = ".deleteme";

fn is_magic_sentinel(c: &Component) -> bool {
    c.hidden && c.name == MAGIC_SENTINEL
}

pub fn mkdir(store: &mut MetadataStore, leaf: &Component) -> Result<(), FsError> {
    if leaf.hidden || leaf.name.is_empty() {
        return Err(FsError::NotPermitted("tag name may not start with '.'"));
    }
    store.insert_tag(&leaf.name)?;
    Ok(())
}

pub fn rmdir(store: &mut MetadataStore, leaf: &Component) -> Result<(), FsError> {
    store.delete_tag(&leaf.name)
}

/// Creates the File record, its Taggings, then the blob, in that order, so
/// an abort before the blob is created leaves no dangling blob (only an
/// inert File row, which a later create of the same name would re-collide
/// with -- acceptable since this only happens on a genuine I/O failure).
/// Returns the open handle to the freshly created blob so FUSE `create`
/// (which hands the kernel a file handle for immediate use) doesn't need a
/// separate `open` round-trip; callers that don't need the handle (`mknod`)
/// should release it right away.
pub fn create(
    store: &mut MetadataStore,
    blob: &BlobStore,
    tags: &[&str],
    leaf: &Component,
    mode: u32,
) -> Result<(FileId, BlobHandle), FsError> {
    if leaf.hidden || leaf.name.is_empty() {
        return Err(FsError::NotPermitted("file name may not start with '.'"));
    }
    let id = store.insert_file(&leaf.name, tags)?;
    match blob.create_blob(&leaf.name, mode) {
        Ok(handle) => Ok((id, handle)),
        Err(e) => {
            let _ = store.delete_file(&leaf.name);
            Err(FsError::Blob(e))
        }
    }
}

pub fn unlink(
    store: &mut MetadataStore,
    blob: &BlobStore,
    tags: &[&str],
    leaf: &Component,
    flat_delete: bool,
) -> Result<(), FsError> {
    if !store.file_exists(&leaf.name) {
        return Err(FsError::NotFound);
    }

    if flat_delete && !tags.is_empty() {
        let last = tags.last().expect("checked non-empty");
        return store.remove_file_tags(&leaf.name, &[last]);
    }

    blob.unlink_blob(&leaf.name).map_err(FsError::Blob)?;
    store.delete_file(&leaf.name)
}

/// Classification of a `rename` call, computed once from the path triples
/// and the file's current tag set before any mutation happens (per the
/// design note: decide, then execute, never interleave the two).
#[derive(Debug, PartialEq, Eq)]
enum RenameKind {
    TagSetReplace,
    TagSetAdd,
    NameOnly,
    NoOp,
}

pub fn rename(
    store: &mut MetadataStore,
    blob: &BlobStore,
    old_tags: &[&str],
    old_leaf: &Component,
    new_tags: &[&str],
    new_leaf: &Component,
) -> Result<(), FsError> {
    if store.tag_exists(&old_leaf.name) && !store.file_exists(&old_leaf.name) {
        return rename_tag(store, old_tags, old_leaf, new_tags, new_leaf);
    }
    rename_file(store, blob, old_tags, old_leaf, new_tags, new_leaf)
}

fn rename_tag(
    store: &mut MetadataStore,
    old_tags: &[&str],
    old_leaf: &Component,
    new_tags: &[&str],
    new_leaf: &Component,
) -> Result<(), FsError> {
    if old_tags != new_tags {
        return Err(FsError::Unsupported);
    }

    if is_magic_sentinel(new_leaf) {
        return rmdir(store, old_leaf);
    }

    store.rename_tag(&old_leaf.name, &new_leaf.name)
}

fn rename_file(
    store: &mut MetadataStore,
    blob: &BlobStore,
    old_tags: &[&str],
    old_leaf: &Component,
    new_tags: &[&str],
    new_leaf: &Component,
) -> Result<(), FsError> {
    let file_name = old_leaf.name.clone();
    if !store.file_exists(&file_name) {
        return Err(FsError::NotFound);
    }

    let true_tags: std::collections::HashSet<String> =
        store.file_tags(&file_name).unwrap_or_default();
    let from_set: std::collections::HashSet<String> = old_tags.iter().map(|s| s.to_string()).collect();
    let to_set: std::collections::HashSet<String> = new_tags.iter().map(|s| s.to_string()).collect();

    let kind = if from_set != to_set {
        let consistent = if old_leaf.hidden {
            from_set.is_subset(&true_tags)
        } else {
            from_set == true_tags
        };
        if !consistent {
            return Err(FsError::NotFound);
        }
        if old_tags.is_empty() || old_leaf.hidden {
            RenameKind::TagSetAdd
        } else {
            RenameKind::TagSetReplace
        }
    } else if old_leaf.name != new_leaf.name {
        RenameKind::NameOnly
    } else {
        RenameKind::NoOp
    };

    match kind {
        RenameKind::TagSetReplace => {
            store.set_file_tags(&file_name, new_tags)?;
        }
        RenameKind::TagSetAdd => {
            store.add_file_tags(&file_name, new_tags)?;
        }
        RenameKind::NoOp | RenameKind::NameOnly => {}
    }

    if old_leaf.name != new_leaf.name {
        if new_leaf.hidden || new_leaf.name.is_empty() {
            return Err(FsError::NotPermitted("file name may not start with '.'"));
        }
        if store.file_exists(&new_leaf.name) || store.tag_exists(&new_leaf.name) {
            return Err(FsError::AlreadyExists);
        }
        blob.rename_blob(&old_leaf.name, &new_leaf.name).map_err(FsError::Blob)?;
        store.rename_file(&old_leaf.name, &new_leaf.name)?;
    }

    Ok(())
}

pub fn link(
    store: &mut MetadataStore,
    target_tags: &[&str],
    target_leaf: &Component,
    link_tags: &[&str],
    link_leaf: &Component,
) -> Result<(), FsError> {
    if target_leaf.name != link_leaf.name {
        return Err(FsError::NotPermitted("link target and name must match"));
    }
    if !store.file_exists(&target_leaf.name) {
        return Err(FsError::NotFound);
    }
    let mut union: Vec<&str> = target_tags.to_vec();
    for t in link_tags {
        if !union.contains(t) {
            union.push(t);
        }
    }
    store.add_file_tags(&target_leaf.name, &union)
}

pub fn symlink(
    store: &mut MetadataStore,
    blob: &BlobStore,
    tags: &[&str],
    leaf: &Component,
    target: &Path,
) -> Result<FileId, FsError> {
    if leaf.hidden || leaf.name.is_empty() {
        return Err(FsError::NotPermitted("file name may not start with '.'"));
    }
    let id = store.insert_file(&leaf.name, tags)?;

    let stored_target = if target.is_relative() {
        // rewrite relative to the store directory, via the mount's tag depth
        let up = "../".repeat(tags.len());
        PathBuf::from(up).join(target)
    } else {
        target.to_path_buf()
    };

    if let Err(e) = blob.symlink_blob(&leaf.name, &stored_target) {
        let _ = store.delete_file(&leaf.name);
        return Err(FsError::Blob(e));
    }
    Ok(id)
}

pub fn readlink(blob: &BlobStore, tags: &[&str], leaf_name: &str) -> Result<PathBuf, FsError> {
    let raw = blob.readlink_blob(leaf_name).map_err(FsError::Blob)?;
    if raw.is_absolute() {
        return Ok(raw);
    }
    // rewrite relative to <mount>/<tags-of-path> so navigating through the
    // mount (rather than the backing store) still resolves the link.
    let up = "../".repeat(tags.len());
    Ok(PathBuf::from(up).join(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp_blob() -> (BlobStore, PathBuf) {
        let mut dir = std::env::temp_dir();
        use std::time::{SystemTime, UNIX_EPOCH};
        let suffix = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos();
        dir.push(format!("tagfs-mutate-test-{}-{}", std::process::id(), suffix));
        (BlobStore::new(&dir).unwrap(), dir)
    }

    fn leaf(s: &str) -> Component {
        Component::new(s)
    }

    #[test]
    fn scenario_create_then_rename_replace_then_rename_add() {
        let (blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        mkdir(&mut store, &leaf("music")).unwrap();
        mkdir(&mut store, &leaf("jazz")).unwrap();
        create(&mut store, &blob, &["music", "jazz"], &leaf("tune"), 0o644).unwrap();

        assert_eq!(
            store.file_tags("tune").unwrap(),
            std::collections::HashSet::from(["music".to_string(), "jazz".to_string()])
        );

        // rename("/music/jazz/tune", "/music/tune"): unprefixed leaf -> replace
        rename(&mut store, &blob, &["music", "jazz"], &leaf("tune"), &["music"], &leaf("tune")).unwrap();
        assert_eq!(
            store.file_tags("tune").unwrap(),
            std::collections::HashSet::from(["music".to_string()])
        );

        // rename("/music/.tune", "/jazz/tune"): hidden leaf -> add-only union
        rename(&mut store, &blob, &["music"], &leaf(".tune"), &["jazz"], &leaf("tune")).unwrap();
        assert_eq!(
            store.file_tags("tune").unwrap(),
            std::collections::HashSet::from(["music".to_string(), "jazz".to_string()])
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn flat_delete_removes_only_last_tag() {
        let (blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        mkdir(&mut store, &leaf("music")).unwrap();
        mkdir(&mut store, &leaf("jazz")).unwrap();
        create(&mut store, &blob, &["music", "jazz"], &leaf("tune"), 0o644).unwrap();

        assert_eq!(rmdir(&mut store, &leaf("jazz")).unwrap_err().errno(), libc::ENOTEMPTY);

        unlink(&mut store, &blob, &["jazz"], &leaf("tune"), true).unwrap();
        assert_eq!(
            store.file_tags("tune").unwrap(),
            std::collections::HashSet::from(["music".to_string()])
        );
        rmdir(&mut store, &leaf("jazz")).unwrap();

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn full_delete_removes_file_and_blob() {
        let (blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        mkdir(&mut store, &leaf("music")).unwrap();
        create(&mut store, &blob, &["music"], &leaf("tune"), 0o644).unwrap();

        unlink(&mut store, &blob, &["music"], &leaf("tune"), false).unwrap();
        assert!(!store.file_exists("tune"));
        assert!(!blob.list_names().unwrap().contains(&"tune".to_string()));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn rename_name_collision_is_eexist() {
        let (blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        create(&mut store, &blob, &[], &leaf("a"), 0o644).unwrap();
        create(&mut store, &blob, &[], &leaf("b"), 0o644).unwrap();

        let err = rename(&mut store, &blob, &[], &leaf("a"), &[], &leaf("b")).unwrap_err();
        assert_eq!(err.errno(), libc::EEXIST);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn magic_sentinel_deletes_tag() {
        let (_blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        mkdir(&mut store, &leaf("x")).unwrap();

        rename_tag(&mut store, &[], &leaf("x"), &[], &leaf("..deleteme")).unwrap();
        assert!(!store.tag_exists("x"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn link_requires_matching_leaf_names() {
        let (blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        mkdir(&mut store, &leaf("a")).unwrap();
        mkdir(&mut store, &leaf("b")).unwrap();
        create(&mut store, &blob, &["a"], &leaf("f"), 0o644).unwrap();

        assert_eq!(
            link(&mut store, &["a"], &leaf("f"), &["b"], &leaf("other")).unwrap_err().errno(),
            libc::EPERM
        );

        link(&mut store, &["a"], &leaf("f"), &["b"], &leaf("f")).unwrap();
        assert_eq!(
            store.file_tags("f").unwrap(),
            std::collections::HashSet::from(["a".to_string(), "b".to_string()])
        );

        // idempotent: linking a subset again is a no-op on the relation
        link(&mut store, &["a"], &leaf("f"), &["a"], &leaf("f")).unwrap();
        assert_eq!(
            store.file_tags("f").unwrap(),
            std::collections::HashSet::from(["a".to_string(), "b".to_string()])
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn create_rejects_leading_dot() {
        let (blob, dir) = tmp_blob();
        let mut store = MetadataStore::new();
        assert_eq!(
            create(&mut store, &blob, &[], &leaf(".hidden"), 0o644).unwrap_err().errno(),
            libc::EPERM
        );
        std::fs::remove_dir_all(&dir).ok();
    }
}
