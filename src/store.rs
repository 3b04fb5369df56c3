//! The Metadata Store (component B): the authoritative Tags/Files/Taggings
//! relation. Every mutation goes through this API, never through direct map
//! access, so the "two dictionaries drifting apart" failure class the
//! teacher's two-`BiMap`-plus-`IndexMap` design was exposed to cannot occur
//! here -- each mutator below updates both directions of the relation before
//! returning.

use std::collections::HashSet;
use std::path::Path;

use bimap::BiMap;
use bincode::serde::Compat;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::FsError;
use crate::model::{FileId, TagId};

#[derive(Debug, Default, Clone)]
struct TagRecord {
    members: HashSet<FileId>,
}

#[derive(Debug, Default, Clone)]
struct FileRecord {
    tags: HashSet<TagId>,
}

#[derive(Debug)]
pub struct MetadataStore {
    tags: IndexMap<TagId, TagRecord>,
    tag_names: BiMap<TagId, String>,
    files: IndexMap<FileId, FileRecord>,
    file_names: BiMap<FileId, String>,
    next_tag_id: u64,
    next_file_id: u64,
}

#[derive(Serialize, Deserialize)]
struct PersistentState {
    tags: Vec<(u64, String, Vec<u64>)>,
    files: Vec<(u64, String, Vec<u64>)>,
    next_tag_id: u64,
    next_file_id: u64,
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataStore {
    pub fn new() -> Self {
        MetadataStore {
            tags: IndexMap::new(),
            tag_names: BiMap::new(),
            files: IndexMap::new(),
            file_names: BiMap::new(),
            next_tag_id: 1,
            next_file_id: 1,
        }
    }

    // ---- lookups -------------------------------------------------------

    pub fn tag_exists(&self, name: &str) -> bool {
        self.tag_names.get_by_right(name).is_some()
    }

    pub fn file_exists(&self, name: &str) -> bool {
        self.file_names.get_by_right(name).is_some()
    }

    pub fn tag_id(&self, name: &str) -> Option<TagId> {
        self.tag_names.get_by_right(name).copied()
    }

    pub fn tag_name(&self, id: TagId) -> Option<&str> {
        self.tag_names.get_by_left(&id).map(|s| s.as_str())
    }

    pub fn file_id(&self, name: &str) -> Option<FileId> {
        self.file_names.get_by_right(name).copied()
    }

    pub fn file_name(&self, id: FileId) -> Option<&str> {
        self.file_names.get_by_left(&id).map(|s| s.as_str())
    }

    pub fn file_tags(&self, name: &str) -> Option<HashSet<String>> {
        let id = self.file_id(name)?;
        let rec = self.files.get(&id)?;
        Some(
            rec.tags
                .iter()
                .filter_map(|t| self.tag_name(*t).map(str::to_string))
                .collect(),
        )
    }

    pub fn file_tag_ids(&self, id: FileId) -> Option<&HashSet<TagId>> {
        self.files.get(&id).map(|r| &r.tags)
    }

    pub fn tag_members(&self, id: TagId) -> Option<&HashSet<FileId>> {
        self.tags.get(&id).map(|r| &r.members)
    }

    pub fn all_tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().filter_map(|id| self.tag_name(*id))
    }

    pub fn all_tag_ids(&self) -> impl Iterator<Item = TagId> + '_ {
        self.tags.keys().copied()
    }

    pub fn all_file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().filter_map(|id| self.file_name(*id))
    }

    /// Files carrying every tag in `tags`. Errors if any named tag doesn't exist.
    pub fn files_with_all_tags(&self, tags: &[&str]) -> Result<HashSet<FileId>, FsError> {
        let ids: Vec<TagId> = tags
            .iter()
            .map(|t| self.tag_id(t).ok_or(FsError::NotFound))
            .collect::<Result<_, _>>()?;
        Ok(self.files_with_all_tag_ids(&ids))
    }

    pub fn files_with_all_tag_ids(&self, tags: &[TagId]) -> HashSet<FileId> {
        if tags.is_empty() {
            return self.files.keys().copied().collect();
        }
        let mut sets = tags.iter().filter_map(|t| self.tags.get(t).map(|r| &r.members));
        let Some(first) = sets.next() else {
            return HashSet::new();
        };
        let mut result = first.clone();
        for set in sets {
            result.retain(|f| set.contains(f));
        }
        result
    }

    /// All tags attached to any file in `files`.
    pub fn tags_intersecting_files(&self, files: &[FileId]) -> HashSet<TagId> {
        files
            .iter()
            .filter_map(|f| self.files.get(f))
            .flat_map(|r| r.tags.iter().copied())
            .collect()
    }

    pub fn orphan_files(&self) -> HashSet<FileId> {
        self.files
            .iter()
            .filter(|(_, r)| r.tags.is_empty())
            .map(|(id, _)| *id)
            .collect()
    }

    // ---- mutators --------------------------------------------------------

    pub fn insert_tag(&mut self, name: &str) -> Result<TagId, FsError> {
        if self.tag_exists(name) || self.file_exists(name) {
            return Err(FsError::AlreadyExists);
        }
        let id = TagId(self.next_tag_id);
        self.next_tag_id += 1;
        self.tags.insert(id, TagRecord::default());
        self.tag_names.insert(id, name.to_string());
        Ok(id)
    }

    pub fn delete_tag(&mut self, name: &str) -> Result<(), FsError> {
        let id = self.tag_id(name).ok_or(FsError::NotFound)?;
        let members_empty = self.tags.get(&id).map(|r| r.members.is_empty()).unwrap_or(true);
        if !members_empty {
            return Err(FsError::NotEmpty);
        }
        self.tags.shift_remove(&id);
        self.tag_names.remove_by_left(&id);
        Ok(())
    }

    pub fn rename_tag(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        let id = self.tag_id(old).ok_or(FsError::NotFound)?;
        if self.tag_exists(new) || self.file_exists(new) {
            return Err(FsError::AlreadyExists);
        }
        self.tag_names.remove_by_left(&id);
        self.tag_names.insert(id, new.to_string());
        Ok(())
    }

    pub fn insert_file(&mut self, name: &str, tags: &[&str]) -> Result<FileId, FsError> {
        if self.file_exists(name) || self.tag_exists(name) {
            return Err(FsError::AlreadyExists);
        }
        let ids: Vec<TagId> = tags
            .iter()
            .map(|t| self.tag_id(t).ok_or(FsError::NotFound))
            .collect::<Result<_, _>>()?;

        let id = FileId(self.next_file_id);
        self.next_file_id += 1;
        self.file_names.insert(id, name.to_string());
        self.files.insert(
            id,
            FileRecord {
                tags: ids.iter().copied().collect(),
            },
        );
        for t in ids {
            self.tags.get_mut(&t).expect("tag validated above").members.insert(id);
        }
        Ok(id)
    }

    pub fn delete_file(&mut self, name: &str) -> Result<(), FsError> {
        let id = self.file_id(name).ok_or(FsError::NotFound)?;
        if let Some(rec) = self.files.shift_remove(&id) {
            for t in rec.tags {
                if let Some(tag) = self.tags.get_mut(&t) {
                    tag.members.remove(&id);
                }
            }
        }
        self.file_names.remove_by_left(&id);
        Ok(())
    }

    pub fn set_file_tags(&mut self, name: &str, tags: &[&str]) -> Result<(), FsError> {
        let id = self.file_id(name).ok_or(FsError::NotFound)?;
        let ids: HashSet<TagId> = tags
            .iter()
            .map(|t| self.tag_id(t).ok_or(FsError::NotFound))
            .collect::<Result<_, _>>()?;

        let old = self.files.get(&id).expect("file exists").tags.clone();
        for t in old.difference(&ids) {
            if let Some(tag) = self.tags.get_mut(t) {
                tag.members.remove(&id);
            }
        }
        for t in ids.difference(&old) {
            if let Some(tag) = self.tags.get_mut(t) {
                tag.members.insert(id);
            }
        }
        self.files.get_mut(&id).expect("file exists").tags = ids;
        Ok(())
    }

    pub fn add_file_tags(&mut self, name: &str, tags: &[&str]) -> Result<(), FsError> {
        let id = self.file_id(name).ok_or(FsError::NotFound)?;
        let ids: Vec<TagId> = tags
            .iter()
            .map(|t| self.tag_id(t).ok_or(FsError::NotFound))
            .collect::<Result<_, _>>()?;
        for t in ids {
            self.files.get_mut(&id).expect("file exists").tags.insert(t);
            self.tags.get_mut(&t).expect("tag validated above").members.insert(id);
        }
        Ok(())
    }

    pub fn remove_file_tags(&mut self, name: &str, tags: &[&str]) -> Result<(), FsError> {
        let id = self.file_id(name).ok_or(FsError::NotFound)?;
        for t in tags {
            if let Some(tid) = self.tag_id(t) {
                self.files.get_mut(&id).expect("file exists").tags.remove(&tid);
                if let Some(tag) = self.tags.get_mut(&tid) {
                    tag.members.remove(&id);
                }
            }
        }
        Ok(())
    }

    pub fn rename_file(&mut self, old: &str, new: &str) -> Result<(), FsError> {
        let id = self.file_id(old).ok_or(FsError::NotFound)?;
        if self.file_exists(new) || self.tag_exists(new) {
            return Err(FsError::AlreadyExists);
        }
        self.file_names.remove_by_left(&id);
        self.file_names.insert(id, new.to_string());
        Ok(())
    }

    /// Bring the store's File set in line with what's actually present in the
    /// Blob Store: files removed externally are dropped from the index
    /// (along with their taggings); files added externally show up as fresh
    /// orphans. Mirrors the teacher's `repopulate` bootstrap step.
    pub fn reconcile_with_blob_listing<I, S>(&mut self, present: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let present: HashSet<String> = present.into_iter().map(|s| s.as_ref().to_string()).collect();

        let stale: Vec<String> = self
            .all_file_names()
            .filter(|n| !present.contains(*n))
            .map(str::to_string)
            .collect();
        for name in stale {
            let _ = self.delete_file(&name);
        }

        for name in present {
            if !self.file_exists(&name) {
                let _ = self.insert_file(&name, &[]);
            }
        }
    }

    // ---- persistence -------------------------------------------------------

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        let (Compat(state), _): (Compat<PersistentState>, _) =
            bincode::decode_from_slice(&bytes, bincode::config::standard())?;

        let mut tags = IndexMap::new();
        let mut tag_names = BiMap::new();
        for (id, name, members) in state.tags {
            let id = TagId(id);
            tag_names.insert(id, name);
            tags.insert(
                id,
                TagRecord {
                    members: members.into_iter().map(FileId).collect(),
                },
            );
        }

        let mut files = IndexMap::new();
        let mut file_names = BiMap::new();
        for (id, name, tag_ids) in state.files {
            let id = FileId(id);
            file_names.insert(id, name);
            files.insert(
                id,
                FileRecord {
                    tags: tag_ids.into_iter().map(TagId).collect(),
                },
            );
        }

        Ok(MetadataStore {
            tags,
            tag_names,
            files,
            file_names,
            next_tag_id: state.next_tag_id,
            next_file_id: state.next_file_id,
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let state = PersistentState {
            tags: self
                .tags
                .iter()
                .map(|(id, rec)| {
                    (
                        id.0,
                        self.tag_name(*id).unwrap_or_default().to_string(),
                        rec.members.iter().map(|f| f.0).collect(),
                    )
                })
                .collect(),
            files: self
                .files
                .iter()
                .map(|(id, rec)| {
                    (
                        id.0,
                        self.file_name(*id).unwrap_or_default().to_string(),
                        rec.tags.iter().map(|t| t.0).collect(),
                    )
                })
                .collect(),
            next_tag_id: self.next_tag_id,
            next_file_id: self.next_file_id,
        };

        let vec = bincode::encode_to_vec(Compat(state), bincode::config::standard())?;
        std::fs::write(path, vec)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_query_tag() {
        let mut s = MetadataStore::new();
        let id = s.insert_tag("music").unwrap();
        assert!(s.tag_exists("music"));
        assert_eq!(s.tag_name(id), Some("music"));
        assert_eq!(s.insert_tag("music").unwrap_err().errno(), libc::EEXIST);
    }

    #[test]
    fn insert_file_requires_existing_tags() {
        let mut s = MetadataStore::new();
        assert!(s.insert_file("tune", &["music"]).is_err());
        s.insert_tag("music").unwrap();
        let fid = s.insert_file("tune", &["music"]).unwrap();
        assert_eq!(s.file_tags("tune").unwrap(), HashSet::from(["music".to_string()]));
        assert!(s.tag_members(s.tag_id("music").unwrap()).unwrap().contains(&fid));
    }

    #[test]
    fn rmdir_requires_empty_members() {
        let mut s = MetadataStore::new();
        s.insert_tag("music").unwrap();
        s.insert_file("tune", &["music"]).unwrap();
        assert_eq!(s.delete_tag("music").unwrap_err().errno(), libc::ENOTEMPTY);
        s.delete_file("tune").unwrap();
        s.delete_tag("music").unwrap();
        assert!(!s.tag_exists("music"));
    }

    #[test]
    fn orphan_files_tracks_empty_tag_sets() {
        let mut s = MetadataStore::new();
        s.insert_tag("music").unwrap();
        let fid = s.insert_file("tune", &[]).unwrap();
        assert!(s.orphan_files().contains(&fid));
        s.add_file_tags("tune", &["music"]).unwrap();
        assert!(!s.orphan_files().contains(&fid));
    }

    #[test]
    fn tag_and_file_namespaces_are_disjoint() {
        let mut s = MetadataStore::new();
        s.insert_tag("jazz").unwrap();
        assert!(s.insert_file("jazz", &[]).is_err());
        s.insert_file("blues", &[]).unwrap();
        assert!(s.insert_tag("blues").is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let mut s = MetadataStore::new();
        s.insert_tag("music").unwrap();
        s.insert_tag("jazz").unwrap();
        s.insert_file("tune", &["music", "jazz"]).unwrap();

        let dir = tempdir();
        let path = dir.join("state.bin");
        s.save(&path).unwrap();
        let loaded = MetadataStore::load(&path).unwrap();

        assert!(loaded.tag_exists("music"));
        assert!(loaded.tag_exists("jazz"));
        assert_eq!(
            loaded.file_tags("tune").unwrap(),
            HashSet::from(["music".to_string(), "jazz".to_string()])
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    fn tempdir() -> std::path::PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("tagfs-store-test-{}", std::process::id()));
        std::fs::create_dir_all(&p).unwrap();
        p
    }
}
