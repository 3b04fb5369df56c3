//! The FUSE Binding (component H): `fuser::Filesystem` glue tying the path
//! grammar, resolver, lister and mutation engine to kernel upcalls. This
//! file carries no tag semantics of its own beyond the glue -- each callback
//! reconstructs its directory-tag-sequence via the inode allocator (`ino`)
//! and otherwise just calls into `mutate`/`lister`/`store`.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::cell::RefCell;
use std::time::Duration;

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory, ReplyEmpty,
    ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, ReplyXattr, Request, TimeOrNow,
};
use libc::{EIO, ENOENT, ENOTDIR};
use log::{error, warn};

use crate::blob::{BlobHandle, BlobStore};
use crate::ino::{DirNode, DirTree, Ino};
use crate::lister::{self, EntryKind};
use crate::model::{FileId, TagId};
use crate::mutate;
use crate::path::{self, Component};
use crate::store::MetadataStore;

const TTL: Duration = Duration::new(0, 0);

macro_rules! err {
    ($reply:expr, $err:expr) => {{
        $reply.error($err);
        return;
    }};
}

pub struct FsConfig {
    pub flat_delete: bool,
    pub hidden_limit: i64,
}

pub struct TagFs {
    store: MetadataStore,
    blob: BlobStore,
    tree: DirTree,
    config: FsConfig,
    state_path: PathBuf,
}

impl TagFs {
    pub fn new(datastore_root: PathBuf, config: FsConfig) -> std::io::Result<Self> {
        let blob = BlobStore::new(&datastore_root)?;
        let state_path = datastore_root.join(".tagfs");
        let mut store = match MetadataStore::load(&state_path) {
            Ok(s) => s,
            Err(e) => {
                error!("couldn't recover metadata store from {state_path:?}: {e}, starting fresh");
                MetadataStore::new()
            }
        };

        if let Ok(names) = blob.list_names() {
            store.reconcile_with_blob_listing(names);
        }

        Ok(TagFs {
            store,
            blob,
            tree: DirTree::new(),
            config,
            state_path,
        })
    }

    fn save(&self) {
        if let Err(e) = self.store.save(&self.state_path) {
            error!("failed to save metadata store: {e}");
        }
    }

    fn dir_node(&self, ino: u64) -> Option<Rc<RefCell<DirNode>>> {
        self.tree.lookup(ino)
    }

    /// Names of the tags accumulated by `node`, in path order.
    fn tag_names_of(&self, node: &Rc<RefCell<DirNode>>) -> Vec<String> {
        node.borrow()
            .collect_tags()
            .into_iter()
            .filter_map(|id| self.store.tag_name(id).map(str::to_string))
            .collect()
    }

    fn file_name_of(&self, file_part: u64) -> Option<String> {
        self.store.file_name(FileId(file_part)).map(str::to_string)
    }

    fn parse_name(&self, name: &OsStr) -> Result<Component, i32> {
        match path::parse_component(name) {
            Ok(c) => Ok(c),
            Err(e) => Err(e.errno()),
        }
    }

    fn blob_attr(&self, name: &str, ino: u64) -> std::io::Result<FileAttr> {
        let mut attr = self.blob.stat_blob(name, ino)?;
        // A File's `st_nlink` is deliberately not a true count of the
        // exponentially many tag-paths that could name it; any value >= 1
        // satisfies callers, so the backing blob's own link count is used.
        attr.nlink = attr.nlink.max(1);
        Ok(attr)
    }

    fn dir_attr(&self, ino: u64) -> FileAttr {
        tag_dir_attr(ino)
    }
}

/// Every tag directory shares one synthetic attribute set -- there's no
/// backing inode for a directory node, only the lazily built tree entry.
fn tag_dir_attr(ino: u64) -> FileAttr {
    FileAttr {
        ino,
        size: 4096,
        blocks: 8,
        atime: std::time::UNIX_EPOCH,
        mtime: std::time::UNIX_EPOCH,
        ctime: std::time::UNIX_EPOCH,
        crtime: std::time::UNIX_EPOCH,
        kind: FileType::Directory,
        perm: 0o755,
        nlink: 1,
        uid: 1000,
        gid: 1000,
        rdev: 0,
        blksize: 512,
        flags: 0,
    }
}

impl Filesystem for TagFs {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let parent_ino = Ino(parent);
        if parent_ino.is_file() {
            err!(reply, ENOTDIR);
        }
        let Some(parent_node) = self.dir_node(parent_ino.dir_part()) else {
            err!(reply, ENOENT);
        };

        let component = match self.parse_name(name) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        if let Some(file_id) = self.store.file_id(&component.name) {
            let path_tags: HashSet<TagId> = parent_node.borrow().collect_tags().into_iter().collect();
            let true_tags: HashSet<TagId> = self.store.file_tag_ids(file_id).cloned().unwrap_or_default();
            let consistent = if component.hidden {
                path_tags.is_subset(&true_tags)
            } else {
                path_tags == true_tags
            };
            if !consistent {
                err!(reply, ENOENT);
            }

            let ino = Ino::from_file(file_id, parent_ino.dir_part());
            match self.blob_attr(&component.name, ino.0) {
                Ok(attr) => reply.entry(&TTL, &attr, 0),
                Err(e) => {
                    error!("failed to stat blob '{}': {e}", component.name);
                    reply.error(EIO);
                }
            }
            return;
        }

        if let Some(tag_id) = self.store.tag_id(&component.name) {
            let child = self.tree.child_for_tag(&parent_node, tag_id);
            let ino = Ino::from_dir(child.borrow().node_id);
            reply.entry(&TTL, &self.dir_attr(ino.0), 0);
            return;
        }

        reply.error(ENOENT);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        let ino = Ino(ino);
        if ino.is_dir() {
            if self.dir_node(ino.dir_part()).is_none() {
                err!(reply, ENOENT);
            }
            reply.attr(&TTL, &self.dir_attr(ino.0));
            return;
        }

        let Some(name) = self.file_name_of(ino.file_part()) else {
            err!(reply, ENOENT);
        };
        match self.blob_attr(&name, ino.0) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(_) => reply.error(ENOENT),
        }
    }

    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        mode: Option<u32>,
        uid: Option<u32>,
        gid: Option<u32>,
        size: Option<u64>,
        atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<std::time::SystemTime>,
        fh: Option<u64>,
        _crtime: Option<std::time::SystemTime>,
        _chgtime: Option<std::time::SystemTime>,
        _bkuptime: Option<std::time::SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let ino_p = Ino(ino);
        if ino_p.is_dir() {
            // tag directories have no independent attributes of their own
            reply.attr(&TTL, &self.dir_attr(ino));
            return;
        }

        let Some(name) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };

        if let Some(mode) = mode {
            if let Err(e) = self.blob.chmod(&name, mode) {
                err!(reply, e.raw_os_error().unwrap_or(EIO));
            }
        }
        if uid.is_some() || gid.is_some() {
            if let Err(e) = self.blob.chown(&name, uid, gid) {
                err!(reply, e.raw_os_error().unwrap_or(EIO));
            }
        }
        if let Some(size) = size {
            let result = match fh {
                Some(fh) => self.blob.truncate_handle(BlobHandle(fh), size),
                None => self.blob.truncate_blob(&name, size),
            };
            if let Err(e) = result {
                err!(reply, e.raw_os_error().unwrap_or(EIO));
            }
        }
        if atime.is_some() || mtime.is_some() {
            let to_time = |t: Option<TimeOrNow>| match t {
                Some(TimeOrNow::SpecificTime(t)) => Some(t),
                Some(TimeOrNow::Now) => Some(std::time::SystemTime::now()),
                None => None,
            };
            if let Err(e) = self.blob.utimens(&name, to_time(atime), to_time(mtime)) {
                err!(reply, e.raw_os_error().unwrap_or(EIO));
            }
        }

        match self.blob_attr(&name, ino) {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(_) => reply.error(ENOENT),
        }
    }

    fn readlink(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyData) {
        let ino_p = Ino(ino);
        let Some(name) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };
        let Some(dir) = self.dir_node(ino_p.dir_part()) else {
            err!(reply, ENOENT);
        };
        let tags = self.tag_names_of(&dir);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        match mutate::readlink(&self.blob, &tag_refs, &name) {
            Ok(target) => reply.data(target.as_os_str().as_encoded_bytes()),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn mknod(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        self.create_file_entry(parent, name, mode, reply);
    }

    fn mkdir(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let parent_ino = Ino(parent);
        let Some(parent_node) = self.dir_node(parent_ino.dir_part()) else {
            err!(reply, ENOENT);
        };
        let component = match self.parse_name(name) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        match mutate::mkdir(&mut self.store, &component) {
            Ok(()) => {
                let tag_id = self.store.tag_id(&component.name).expect("just inserted");
                let child = self.tree.child_for_tag(&parent_node, tag_id);
                let ino = Ino::from_dir(child.borrow().node_id);
                reply.entry(&TTL, &self.dir_attr(ino.0), 0);
                self.save();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, _parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let component = match self.parse_name(name) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };
        match mutate::rmdir(&mut self.store, &component) {
            Ok(()) => {
                reply.ok();
                self.save();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let parent_ino = Ino(parent);
        let Some(parent_node) = self.dir_node(parent_ino.dir_part()) else {
            err!(reply, ENOENT);
        };
        let component = match self.parse_name(name) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let tags = self.tag_names_of(&parent_node);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();

        match mutate::unlink(&mut self.store, &self.blob, &tag_refs, &component, self.config.flat_delete) {
            Ok(()) => {
                reply.ok();
                self.save();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn symlink(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        link: &Path,
        reply: ReplyEntry,
    ) {
        let parent_ino = Ino(parent);
        let Some(parent_node) = self.dir_node(parent_ino.dir_part()) else {
            err!(reply, ENOENT);
        };
        let component = match self.parse_name(name) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let tags = self.tag_names_of(&parent_node);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();

        match mutate::symlink(&mut self.store, &self.blob, &tag_refs, &component, link) {
            Ok(file_id) => {
                let ino = Ino::from_file(file_id, parent_ino.dir_part());
                match self.blob_attr(&component.name, ino.0) {
                    Ok(attr) => {
                        reply.entry(&TTL, &attr, 0);
                        self.save();
                    }
                    Err(_) => reply.error(EIO),
                }
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let old_parent_ino = Ino(parent);
        let new_parent_ino = Ino(newparent);

        let (Some(old_node), Some(new_node)) =
            (self.dir_node(old_parent_ino.dir_part()), self.dir_node(new_parent_ino.dir_part()))
        else {
            err!(reply, ENOENT);
        };

        let old_component = match self.parse_name(name) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };
        let new_component = match self.parse_name(newname) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let old_tags = self.tag_names_of(&old_node);
        let new_tags = self.tag_names_of(&new_node);
        let old_refs: Vec<&str> = old_tags.iter().map(String::as_str).collect();
        let new_refs: Vec<&str> = new_tags.iter().map(String::as_str).collect();

        match mutate::rename(
            &mut self.store,
            &self.blob,
            &old_refs,
            &old_component,
            &new_refs,
            &new_component,
        ) {
            Ok(()) => {
                reply.ok();
                self.save();
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn link(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        newparent: u64,
        newname: &OsStr,
        reply: ReplyEntry,
    ) {
        let ino_p = Ino(ino);
        let Some(old_name) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };
        let Some(old_dir) = self.dir_node(ino_p.dir_part()) else {
            err!(reply, ENOENT);
        };
        let Some(new_dir) = self.dir_node(Ino(newparent).dir_part()) else {
            err!(reply, ENOENT);
        };
        let new_component = match self.parse_name(newname) {
            Ok(c) => c,
            Err(e) => {
                reply.error(e);
                return;
            }
        };

        let old_tags = self.tag_names_of(&old_dir);
        let new_tags = self.tag_names_of(&new_dir);
        let old_refs: Vec<&str> = old_tags.iter().map(String::as_str).collect();
        let new_refs: Vec<&str> = new_tags.iter().map(String::as_str).collect();
        let old_component = Component { name: old_name.clone(), hidden: false };

        match mutate::link(&mut self.store, &old_refs, &old_component, &new_refs, &new_component) {
            Ok(()) => {
                let new_ino = Ino::from_file(self.store.file_id(&old_name).expect("exists"), Ino(newparent).dir_part());
                match self.blob_attr(&old_name, new_ino.0) {
                    Ok(attr) => {
                        reply.entry(&TTL, &attr, 0);
                        self.save();
                    }
                    Err(_) => reply.error(EIO),
                }
            }
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        let ino_p = Ino(ino);
        let Some(name) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };
        match self.blob.open(&name) {
            Ok(h) => reply.opened(h.0, 0),
            Err(e) => reply.error(e.raw_os_error().unwrap_or(EIO)),
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        self.create_file_entry(parent, name, mode, ReplyEntryOrCreate::Create(reply));
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.blob.read(BlobHandle(fh), offset as u64, size as u64) {
            Ok(buf) => reply.data(&buf),
            Err(e) => {
                warn!("read failed: {e}");
                reply.error(EIO);
            }
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.blob.write(BlobHandle(fh), offset as u64, data) {
            Ok(n) => reply.written(n as u32),
            Err(e) => {
                warn!("write failed: {e}");
                reply.error(EIO);
            }
        }
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        self.blob.release(BlobHandle(fh));
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, fh: u64, _datasync: bool, reply: ReplyEmpty) {
        match self.blob.fsync(BlobHandle(fh)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.raw_os_error().unwrap_or(EIO)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, _ino: u64, _flags: i32, reply: ReplyOpen) {
        reply.opened(0, 0);
    }

    fn releasedir(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _flags: i32, reply: ReplyEmpty) {
        reply.ok();
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let ino_p = Ino(ino);
        if ino_p.is_file() {
            err!(reply, ENOTDIR);
        }
        let Some(dir) = self.dir_node(ino_p.dir_part()) else {
            err!(reply, ENOENT);
        };

        let tags = dir.borrow().collect_tags();
        let entries = if tags.is_empty() {
            lister::list_root(&self.store, self.config.hidden_limit)
        } else {
            lister::list_tag_dir(&self.store, &tags)
        };

        // ".", ".." occupy offsets 0 and 1; real entries resume at 2, the
        // standard fuser convention of "offset handed back is the index to
        // resume from next time".
        let mut rows: Vec<(u64, FileType, String)> = vec![
            (ino_p.0, FileType::Directory, ".".to_string()),
            (ino_p.0, FileType::Directory, "..".to_string()),
        ];
        for entry in entries {
            let display_name = if entry.hidden {
                format!(".{}", entry.name)
            } else {
                entry.name.clone()
            };
            let (child_ino, kind) = match entry.kind {
                EntryKind::Tag(tag_id) => {
                    let child = self.tree.child_for_tag(&dir, tag_id);
                    let node_id = child.borrow().node_id;
                    (Ino::from_dir(node_id).0, FileType::Directory)
                }
                EntryKind::File(file_id) => {
                    (Ino::from_file(file_id, ino_p.dir_part()).0, FileType::RegularFile)
                }
            };
            rows.push((child_ino, kind, display_name));
        }

        for (i, (child_ino, kind, name)) in rows.into_iter().enumerate().skip(offset as usize) {
            if reply.add(child_ino, (i + 1) as i64, kind, &name) {
                break;
            }
        }

        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.blob.statfs_root() {
            Ok(s) => reply.statfs(
                s.f_blocks,
                s.f_bfree,
                s.f_bavail,
                s.f_files,
                s.f_ffree,
                s.f_bsize as u32,
                s.f_namemax as u32,
                s.f_frsize as u32,
            ),
            Err(_) => reply.statfs(0, 0, 0, 0, 0, 512, 255, 0),
        }
    }

    fn access(&mut self, _req: &Request<'_>, ino: u64, mask: i32, reply: ReplyEmpty) {
        let ino_p = Ino(ino);
        if ino_p.is_dir() {
            if self.dir_node(ino_p.dir_part()).is_some() {
                reply.ok();
            } else {
                reply.error(ENOENT);
            }
            return;
        }
        let Some(name) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };
        match self.blob.access_blob(&name, mask) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.raw_os_error().unwrap_or(libc::EACCES)),
        }
    }

    fn getxattr(&mut self, _req: &Request<'_>, ino: u64, name: &OsStr, size: u32, reply: ReplyXattr) {
        let ino_p = Ino(ino);
        if ino_p.is_dir() {
            err!(reply, libc::ENODATA);
        }
        let Some(fname) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };
        let Some(attr_name) = name.to_str() else {
            err!(reply, libc::EINVAL);
        };

        match self.blob.xattr_blob(&fname, attr_name) {
            Ok(data) if size == 0 => reply.size(data.len() as u32),
            Ok(data) if data.len() as u32 > size => reply.error(libc::ERANGE),
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.raw_os_error().unwrap_or(libc::ENODATA)),
        }
    }

    fn listxattr(&mut self, _req: &Request<'_>, ino: u64, size: u32, reply: ReplyXattr) {
        let ino_p = Ino(ino);
        if ino_p.is_dir() {
            if size == 0 {
                reply.size(0);
            } else {
                reply.data(&[]);
            }
            return;
        }
        let Some(name) = self.file_name_of(ino_p.file_part()) else {
            err!(reply, ENOENT);
        };

        match self.blob.listxattr_blob(&name) {
            Ok(data) if size == 0 => reply.size(data.len() as u32),
            Ok(data) if data.len() as u32 > size => reply.error(libc::ERANGE),
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.raw_os_error().unwrap_or(EIO)),
        }
    }
}

enum ReplyEntryOrCreate {
    Entry(ReplyEntry),
    Create(ReplyCreate),
}

impl TagFs {
    fn create_file_entry(&mut self, parent: u64, name: &OsStr, mode: u32, reply: impl Into<ReplyEntryOrCreate>) {
        let reply = reply.into();
        let parent_ino = Ino(parent);
        let Some(parent_node) = self.dir_node(parent_ino.dir_part()) else {
            reply_not_found(reply);
            return;
        };
        let component = match path::parse_component(name) {
            Ok(c) => c,
            Err(e) => {
                reply_error(reply, e.errno());
                return;
            }
        };

        let tags = self.tag_names_of(&parent_node);
        let tag_refs: Vec<&str> = tags.iter().map(String::as_str).collect();

        match mutate::create(&mut self.store, &self.blob, &tag_refs, &component, mode) {
            Ok((file_id, handle)) => {
                let ino = Ino::from_file(file_id, parent_ino.dir_part());
                let attr = match self.blob_attr(&component.name, ino.0) {
                    Ok(a) => a,
                    Err(_) => {
                        self.blob.release(handle);
                        reply_error(reply, EIO);
                        return;
                    }
                };
                self.save();
                match reply {
                    ReplyEntryOrCreate::Entry(r) => {
                        self.blob.release(handle);
                        r.entry(&TTL, &attr, 0);
                    }
                    ReplyEntryOrCreate::Create(r) => {
                        r.created(&TTL, &attr, 0, handle.0, 0);
                    }
                }
            }
            Err(e) => reply_error(reply, e.errno()),
        }
    }
}

fn reply_not_found(reply: ReplyEntryOrCreate) {
    reply_error(reply, ENOENT);
}

fn reply_error(reply: ReplyEntryOrCreate, errno: i32) {
    match reply {
        ReplyEntryOrCreate::Entry(r) => r.error(errno),
        ReplyEntryOrCreate::Create(r) => r.error(errno),
    }
}

impl From<ReplyEntry> for ReplyEntryOrCreate {
    fn from(r: ReplyEntry) -> Self {
        ReplyEntryOrCreate::Entry(r)
    }
}

impl From<ReplyCreate> for ReplyEntryOrCreate {
    fn from(r: ReplyCreate) -> Self {
        ReplyEntryOrCreate::Create(r)
    }
}
