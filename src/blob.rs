//! The Blob Store (component C): a flat `store/` directory holding one entry
//! per File. Adapted from the teacher's `ExternalFS`/`BackingFS` pair,
//! generalized with the symlink and metadata-mutation wrappers the richer
//! mutation engine needs, and switched from raw OS file descriptors (which
//! can collide across independent opens of the same path) to handles keyed
//! by a small counter this store owns.

use std::cell::RefCell;
use std::cmp::min;
use std::collections::HashMap;
use std::fs::{self, File};
use std::os::unix::fs::{symlink, FileExt, MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use fuser::{FileAttr, FileType};

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BlobHandle(pub u64);

#[derive(Debug)]
pub struct BlobStore {
    root: PathBuf,
    open_files: RefCell<HashMap<BlobHandle, File>>,
    next_handle: RefCell<u64>,
}

impl BlobStore {
    pub fn new<P: AsRef<Path>>(datastore_root: P) -> std::io::Result<Self> {
        let root = datastore_root.as_ref().join("store");
        fs::create_dir_all(&root)?;
        Ok(BlobStore {
            root,
            open_files: RefCell::new(HashMap::new()),
            next_handle: RefCell::new(1),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn alloc_handle(&self) -> BlobHandle {
        let mut n = self.next_handle.borrow_mut();
        let h = BlobHandle(*n);
        *n += 1;
        h
    }

    pub fn list_names(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    pub fn stat_blob(&self, name: &str, ino: u64) -> std::io::Result<FileAttr> {
        let md = fs::symlink_metadata(self.path_of(name))?;
        Ok(attr_from_metadata(&md, ino))
    }

    pub fn create_blob(&self, name: &str, mode: u32) -> std::io::Result<BlobHandle> {
        let file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode & 0o7777)
            .open(self.path_of(name))?;
        let handle = self.alloc_handle();
        self.open_files.borrow_mut().insert(handle, file);
        Ok(handle)
    }

    pub fn open(&self, name: &str) -> std::io::Result<BlobHandle> {
        let file = fs::OpenOptions::new().read(true).write(true).open(self.path_of(name))?;
        let handle = self.alloc_handle();
        self.open_files.borrow_mut().insert(handle, file);
        Ok(handle)
    }

    pub fn read(&self, handle: BlobHandle, offset: u64, size: u64) -> std::io::Result<Vec<u8>> {
        let files = self.open_files.borrow();
        let file = files.get(&handle).ok_or(std::io::ErrorKind::NotFound)?;
        let file_size = file.metadata()?.len();
        let size = min(size, file_size.saturating_sub(offset));
        let mut buf = vec![0; size as usize];
        file.read_exact_at(&mut buf, offset)?;
        Ok(buf)
    }

    pub fn write(&self, handle: BlobHandle, offset: u64, data: &[u8]) -> std::io::Result<usize> {
        let mut files = self.open_files.borrow_mut();
        let file = files.get_mut(&handle).ok_or(std::io::ErrorKind::NotFound)?;
        file.write_all_at(data, offset)?;
        Ok(data.len())
    }

    pub fn truncate_handle(&self, handle: BlobHandle, size: u64) -> std::io::Result<()> {
        let files = self.open_files.borrow();
        let file = files.get(&handle).ok_or(std::io::ErrorKind::NotFound)?;
        file.set_len(size)
    }

    pub fn truncate_blob(&self, name: &str, size: u64) -> std::io::Result<()> {
        let file = fs::OpenOptions::new().write(true).open(self.path_of(name))?;
        file.set_len(size)
    }

    pub fn fsync(&self, handle: BlobHandle) -> std::io::Result<()> {
        let files = self.open_files.borrow();
        let file = files.get(&handle).ok_or(std::io::ErrorKind::NotFound)?;
        file.sync_all()
    }

    pub fn release(&self, handle: BlobHandle) {
        self.open_files.borrow_mut().remove(&handle);
    }

    pub fn unlink_blob(&self, name: &str) -> std::io::Result<()> {
        fs::remove_file(self.path_of(name))
    }

    pub fn rename_blob(&self, old: &str, new: &str) -> std::io::Result<()> {
        fs::rename(self.path_of(old), self.path_of(new))
    }

    /// Create a symlink blob with the given target, stored verbatim. Callers
    /// (the mutation engine) are responsible for rewriting a relative target
    /// to be relative to this store directory before calling this method --
    /// see `mutate::symlink_path`.
    pub fn symlink_blob(&self, name: &str, target: &Path) -> std::io::Result<()> {
        symlink(target, self.path_of(name))
    }

    pub fn readlink_blob(&self, name: &str) -> std::io::Result<PathBuf> {
        fs::read_link(self.path_of(name))
    }

    pub fn chmod(&self, name: &str, mode: u32) -> std::io::Result<()> {
        fs::set_permissions(self.path_of(name), fs::Permissions::from_mode(mode))
    }

    pub fn chown(&self, name: &str, uid: Option<u32>, gid: Option<u32>) -> std::io::Result<()> {
        let c_path = self.c_path_of(name)?;
        let uid = uid.map(|u| u as libc::uid_t).unwrap_or(u32::MAX as libc::uid_t);
        let gid = gid.map(|g| g as libc::gid_t).unwrap_or(u32::MAX as libc::gid_t);
        let rc = unsafe { libc::chown(c_path.as_ptr(), uid, gid) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    pub fn utimens(&self, name: &str, atime: Option<SystemTime>, mtime: Option<SystemTime>) -> std::io::Result<()> {
        let c_path = self.c_path_of(name)?;
        let to_spec = |t: Option<SystemTime>| match t {
            Some(t) => {
                let dur = t.duration_since(UNIX_EPOCH).unwrap_or_default();
                libc::timespec {
                    tv_sec: dur.as_secs() as libc::time_t,
                    tv_nsec: dur.subsec_nanos() as libc::c_long,
                }
            }
            None => libc::timespec {
                tv_sec: 0,
                tv_nsec: libc::UTIME_OMIT,
            },
        };
        let times = [to_spec(atime), to_spec(mtime)];
        let rc = unsafe { libc::utimensat(libc::AT_FDCWD, c_path.as_ptr(), times.as_ptr(), 0) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    pub fn access_blob(&self, name: &str, mask: i32) -> std::io::Result<()> {
        let c_path = self.c_path_of(name)?;
        let rc = unsafe { libc::access(c_path.as_ptr(), mask) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    /// Reads a single extended attribute off the backing blob. Uses the
    /// `l`-prefixed syscall so a symlink blob's own attributes are read
    /// rather than whatever it points at.
    pub fn xattr_blob(&self, name: &str, attr_name: &str) -> std::io::Result<Vec<u8>> {
        let c_path = self.c_path_of(name)?;
        let c_name = std::ffi::CString::new(attr_name)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;

        let needed = unsafe { libc::lgetxattr(c_path.as_ptr(), c_name.as_ptr(), std::ptr::null_mut(), 0) };
        if needed < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let mut buf = vec![0u8; needed as usize];
        let written = unsafe {
            libc::lgetxattr(
                c_path.as_ptr(),
                c_name.as_ptr(),
                buf.as_mut_ptr() as *mut libc::c_void,
                buf.len(),
            )
        };
        if written < 0 {
            return Err(std::io::Error::last_os_error());
        }
        buf.truncate(written as usize);
        Ok(buf)
    }

    /// Lists extended attribute names off the backing blob, `\0`-separated
    /// the way `listxattr(2)` hands them back.
    pub fn listxattr_blob(&self, name: &str) -> std::io::Result<Vec<u8>> {
        let c_path = self.c_path_of(name)?;

        let needed = unsafe { libc::llistxattr(c_path.as_ptr(), std::ptr::null_mut(), 0) };
        if needed < 0 {
            return Err(std::io::Error::last_os_error());
        }
        let mut buf = vec![0u8; needed as usize];
        let written =
            unsafe { libc::llistxattr(c_path.as_ptr(), buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
        if written < 0 {
            return Err(std::io::Error::last_os_error());
        }
        buf.truncate(written as usize);
        Ok(buf)
    }

    fn c_path_of(&self, name: &str) -> std::io::Result<std::ffi::CString> {
        std::ffi::CString::new(self.path_of(name).as_os_str().to_str().unwrap_or_default())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))
    }

    pub fn statfs_root(&self) -> std::io::Result<libc::statvfs> {
        let c_path = std::ffi::CString::new(self.root.as_os_str().to_str().unwrap_or_default())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::InvalidInput))?;
        let mut out: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut out) };
        if rc == 0 {
            Ok(out)
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

}

fn attr_from_metadata(md: &fs::Metadata, ino: u64) -> FileAttr {
    let ctime = UNIX_EPOCH + std::time::Duration::from_secs(md.ctime().max(0) as u64);
    FileAttr {
        ino,
        size: md.size(),
        blocks: md.blocks(),
        atime: md.accessed().unwrap_or(UNIX_EPOCH),
        mtime: md.modified().unwrap_or(UNIX_EPOCH),
        ctime,
        crtime: ctime,
        kind: if md.file_type().is_symlink() {
            FileType::Symlink
        } else if md.file_type().is_dir() {
            FileType::Directory
        } else {
            FileType::RegularFile
        },
        perm: md.permissions().mode() as u16,
        nlink: md.nlink().max(1) as u32,
        uid: md.uid(),
        gid: md.gid(),
        rdev: md.rdev() as u32,
        flags: 0,
        blksize: md.blksize() as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (BlobStore, PathBuf) {
        let mut dir = std::env::temp_dir();
        dir.push(format!("tagfs-blob-test-{}-{}", std::process::id(), rand_suffix()));
        let store = BlobStore::new(&dir).unwrap();
        (store, dir)
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
    }

    #[test]
    fn create_write_read_roundtrip() {
        let (store, dir) = store();
        let h = store.create_blob("tune", 0o644).unwrap();
        store.write(h, 0, b"hello").unwrap();
        store.release(h);

        let h = store.open("tune").unwrap();
        let data = store.read(h, 0, 5).unwrap();
        assert_eq!(data, b"hello");
        store.release(h);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unlink_and_rename() {
        let (store, dir) = store();
        store.create_blob("a", 0o644).unwrap();
        store.rename_blob("a", "b").unwrap();
        assert!(store.list_names().unwrap().contains(&"b".to_string()));
        store.unlink_blob("b").unwrap();
        assert!(store.list_names().unwrap().is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }
}
