//! The Inode Allocator (component G), adapted from the teacher's `Ino`/
//! `TagTree`: packs a (directory-node, file) pair into one 64-bit inode and
//! lazily builds one tree node per distinct *reachable path of lookups*,
//! not per distinct tag-name combination (two different navigation paths
//! that happen to accumulate the same tag set still get two different
//! nodes, since the kernel can't be told after the fact that they coincide).

use std::cell::RefCell;
use std::collections::HashMap;
use std::iter;
use std::rc::Rc;

use crate::model::{FileId, TagId};

const SPLIT: u64 = 32;
const ROOT_INO: u64 = 1;

/// A 64-bit inode: the high 32 bits identify a File number (0 means "this is
/// a directory node, not a file"), the low 32 bits identify a directory node.
#[repr(C)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Ino(pub u64);

impl Ino {
    pub const ROOT: Ino = Ino(ROOT_INO);

    pub fn is_dir(&self) -> bool {
        self.file_part() == 0
    }

    pub fn is_file(&self) -> bool {
        !self.is_dir()
    }

    pub fn file_part(&self) -> u64 {
        self.0 >> SPLIT
    }

    pub fn dir_part(&self) -> u64 {
        self.0 & (!0 >> SPLIT)
    }

    pub fn from_parts(file: u64, dir: u64) -> Ino {
        Ino((file << SPLIT) | dir)
    }

    pub fn from_dir(dir: u64) -> Ino {
        Ino::from_parts(0, dir)
    }

    pub fn from_file(file: FileId, dir: u64) -> Ino {
        Ino::from_parts(file.0, dir)
    }
}

/// One directory node: the accumulated tag sequence reachable by composing
/// `lookup` calls from the root down to here.
pub struct DirNode {
    pub node_id: u64,
    pub tag: TagId,
    parent: Option<Rc<RefCell<DirNode>>>,
    children: Vec<Rc<RefCell<DirNode>>>,
}

impl DirNode {
    /// The full, ordered tag-id sequence this node represents (root excluded).
    pub fn collect_tags(&self) -> Vec<TagId> {
        match &self.parent {
            None => vec![],
            Some(p) => {
                let mut tags = p.borrow().collect_tags();
                tags.push(self.tag);
                tags
            }
        }
    }

    fn find_child(&self, tag: TagId) -> Option<Rc<RefCell<DirNode>>> {
        self.children.iter().find(|c| c.borrow().tag == tag).cloned()
    }
}

pub struct DirTree {
    root: Rc<RefCell<DirNode>>,
    // Nodes are retained for the mount's lifetime once created (no `forget`
    // eviction): the set of distinct reachable paths is bounded by what a
    // client actually navigates, not the power set of tags, so this doesn't
    // grow unboundedly in practice. Matches the teacher's `TagTree`, which
    // never evicts either.
    by_id: HashMap<u64, Rc<RefCell<DirNode>>>,
    counter: u64,
}

impl Default for DirTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DirTree {
    pub fn new() -> Self {
        let root = Rc::new(RefCell::new(DirNode {
            node_id: ROOT_INO,
            tag: TagId(0),
            parent: None,
            children: Vec::new(),
        }));
        DirTree {
            by_id: HashMap::from_iter(iter::once((ROOT_INO, root.clone()))),
            root,
            counter: ROOT_INO,
        }
    }

    pub fn root(&self) -> Rc<RefCell<DirNode>> {
        self.root.clone()
    }

    pub fn lookup(&self, node_id: u64) -> Option<Rc<RefCell<DirNode>>> {
        self.by_id.get(&node_id).cloned()
    }

    pub fn child_for_tag(&mut self, parent: &Rc<RefCell<DirNode>>, tag: TagId) -> Rc<RefCell<DirNode>> {
        if let Some(existing) = parent.borrow().find_child(tag) {
            return existing;
        }

        self.counter += 1;
        let node = Rc::new(RefCell::new(DirNode {
            node_id: self.counter,
            tag,
            parent: Some(parent.clone()),
            children: Vec::new(),
        }));
        parent.borrow_mut().children.push(node.clone());
        self.by_id.insert(self.counter, node.clone());
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ino_packs_and_unpacks() {
        let ino = Ino::from_file(FileId(7), 3);
        assert!(ino.is_file());
        assert_eq!(ino.file_part(), 7);
        assert_eq!(ino.dir_part(), 3);

        let dir = Ino::from_dir(5);
        assert!(dir.is_dir());
        assert_eq!(dir.dir_part(), 5);
    }

    #[test]
    fn tree_builds_lazily_and_reuses_children() {
        let mut tree = DirTree::new();
        let root = tree.root();
        let a = tree.child_for_tag(&root, TagId(1));
        let a_again = tree.child_for_tag(&root, TagId(1));
        assert_eq!(a.borrow().node_id, a_again.borrow().node_id);

        let ab = tree.child_for_tag(&a, TagId(2));
        assert_eq!(ab.borrow().collect_tags(), vec![TagId(1), TagId(2)]);
    }
}
