//! Builds the Merkle tree describing an action's input root.
//!
//! A [NestedDirectory] is assembled by repeated [NestedDirectory::add]
//! calls with `/`-separated relative paths, then collapsed into canonical
//! [proto::Directory] messages bottom-up by [NestedDirectory::to_digest].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use bytes::Bytes;
use prost::Message;

use crate::file::{FileData, InputFile};
use crate::{compute, proto, Error};

/// Errors when populating a [NestedDirectory].
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum MerkleError {
    /// A path segment is used both as a directory and as a file or symlink.
    #[error("{0:?} is used as both a directory and a leaf entry")]
    NodeKindCollision(String),
}

impl From<MerkleError> for Error {
    fn from(e: MerkleError) -> Self {
        Error::Precondition(format!("merkle tree: {}", e))
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FileEntry {
    digest: proto::Digest,
    executable: bool,
}

/// A mutable directory tree under construction.
///
/// The BTreeMaps are what make serialization canonical: iterating them
/// yields the lexicographic order the Directory message requires, so two
/// trees built from the same entries serialize identically regardless of
/// insertion order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NestedDirectory {
    subdirs: BTreeMap<String, NestedDirectory>,
    files: BTreeMap<String, FileEntry>,
    symlinks: BTreeMap<String, String>,
}

impl NestedDirectory {
    pub fn new() -> Self {
        Default::default()
    }

    /// True if nothing has been added.
    pub fn is_empty(&self) -> bool {
        self.subdirs.is_empty() && self.files.is_empty() && self.symlinks.is_empty()
    }

    /// Inserts `file` at the given `/`-separated relative path, creating
    /// intermediate directories as needed. Empty segments (leading or
    /// doubled slashes) are skipped; a path with no segments is ignored.
    ///
    /// Adding a second leaf at the same full path replaces the first (last
    /// add wins). Using a path segment as both a directory and a leaf is an
    /// error.
    pub fn add(&mut self, file: &InputFile, path: &str) -> Result<(), MerkleError> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let first = match segments.next() {
            Some(s) => s,
            None => return Ok(()),
        };
        self.add_at(file, first, segments)
    }

    fn add_at<'a>(
        &mut self,
        file: &InputFile,
        segment: &'a str,
        mut rest: impl Iterator<Item = &'a str>,
    ) -> Result<(), MerkleError> {
        match rest.next() {
            Some(next) => {
                if self.files.contains_key(segment) || self.symlinks.contains_key(segment) {
                    return Err(MerkleError::NodeKindCollision(segment.to_string()));
                }
                self.subdirs
                    .entry(segment.to_string())
                    .or_default()
                    .add_at(file, next, rest)
            }
            None => {
                if self.subdirs.contains_key(segment) {
                    return Err(MerkleError::NodeKindCollision(segment.to_string()));
                }
                match file {
                    InputFile::Regular {
                        digest, executable, ..
                    } => {
                        self.symlinks.remove(segment);
                        self.files.insert(
                            segment.to_string(),
                            FileEntry {
                                digest: digest.clone(),
                                executable: *executable,
                            },
                        );
                    }
                    InputFile::Symlink { target } => {
                        self.files.remove(segment);
                        self.symlinks
                            .insert(segment.to_string(), target.clone());
                    }
                }
                Ok(())
            }
        }
    }

    /// Ensures the given `/`-separated directory path exists in the tree,
    /// creating empty intermediate directories as needed.
    pub fn add_directory(&mut self, path: &str) -> Result<(), MerkleError> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if node.files.contains_key(segment) || node.symlinks.contains_key(segment) {
                return Err(MerkleError::NodeKindCollision(segment.to_string()));
            }
            node = node.subdirs.entry(segment.to_string()).or_default();
        }
        Ok(())
    }

    /// Collapses the tree into canonical [proto::Directory] blobs,
    /// post-order. Every serialized Directory (intermediate ones included)
    /// is recorded in `blobs`; the returned digest addresses the root.
    ///
    /// Calling this twice on the same tree yields the same digest.
    pub fn to_digest(&self, blobs: &mut HashMap<proto::Digest, Bytes>) -> proto::Digest {
        let mut directory = proto::Directory::default();

        for (name, entry) in &self.files {
            directory.files.push(proto::FileNode {
                name: name.clone(),
                digest: Some(entry.digest.clone()),
                is_executable: entry.executable,
            });
        }

        for (name, subdir) in &self.subdirs {
            let subdir_digest = subdir.to_digest(blobs);
            directory.directories.push(proto::DirectoryNode {
                name: name.clone(),
                digest: Some(subdir_digest),
            });
        }

        for (name, target) in &self.symlinks {
            directory.symlinks.push(proto::SymlinkNode {
                name: name.clone(),
                target: target.clone(),
            });
        }

        let blob: Bytes = directory.encode_to_vec().into();
        let digest = compute(&blob);
        blobs.insert(digest.clone(), blob);
        digest
    }

    /// Builds a NestedDirectory from the filesystem tree rooted at `path`,
    /// returning it together with the contents of every regular file found,
    /// keyed by digest. Paths inside the tree are relative to `path`.
    pub fn from_path(
        path: impl AsRef<Path>,
    ) -> Result<(Self, HashMap<proto::Digest, FileData>), Error> {
        let root = path.as_ref();
        let mut nested = NestedDirectory::new();
        let mut contents = HashMap::new();

        for entry in walkdir::WalkDir::new(root).follow_links(false).min_depth(1) {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root).to_path_buf();
                match e.into_io_error() {
                    Some(io) => Error::io(path, io),
                    None => Error::Protocol("filesystem loop while walking inputs".to_string()),
                }
            })?;

            let relative = entry
                .path()
                .strip_prefix(root)
                .expect("walkdir yields paths under its root")
                .to_string_lossy()
                .into_owned();

            if entry.file_type().is_dir() {
                nested.add_directory(&relative)?;
                continue;
            }

            let file = InputFile::open(entry.path())?;
            if let InputFile::Regular { digest, data, .. } = &file {
                contents.insert(digest.clone(), data.clone());
            }
            nested.add(&file, &relative)?;
        }

        Ok((nested, contents))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::FileData;

    fn regular(contents: &[u8]) -> InputFile {
        InputFile::Regular {
            digest: compute(contents),
            executable: false,
            data: FileData::Inline(Bytes::copy_from_slice(contents)),
        }
    }

    #[test]
    fn empty_tree_digests_to_empty_directory() {
        let mut blobs = HashMap::new();
        let digest = NestedDirectory::new().to_digest(&mut blobs);
        assert_eq!(digest, compute(b""));
        assert_eq!(blobs.len(), 1);
        assert_eq!(blobs[&digest], Bytes::new());
    }

    #[test]
    fn single_file_at_root() {
        let mut nested = NestedDirectory::new();
        nested.add(&regular(b"hello"), "hello.c").unwrap();

        let mut blobs = HashMap::new();
        let digest = nested.to_digest(&mut blobs);

        let root = proto::Directory::decode(&blobs[&digest][..]).unwrap();
        assert_eq!(root.files.len(), 1);
        assert_eq!(root.files[0].name, "hello.c");
        assert_eq!(root.files[0].digest, Some(compute(b"hello")));
        assert!(root.directories.is_empty());
        assert!(root.symlinks.is_empty());
    }

    #[test]
    fn nested_directories_and_sorting() {
        let mut nested = NestedDirectory::new();
        nested.add(&regular(b"22"), "a/b/y").unwrap();
        nested.add(&regular(b"1"), "a/x").unwrap();

        let mut blobs = HashMap::new();
        let root_digest = nested.to_digest(&mut blobs);

        // root + a + a/b
        assert_eq!(blobs.len(), 3);

        let root = proto::Directory::decode(&blobs[&root_digest][..]).unwrap();
        assert_eq!(root.directories.len(), 1);
        assert_eq!(root.directories[0].name, "a");
        assert!(root.files.is_empty());

        let a_digest = root.directories[0].digest.clone().unwrap();
        let a = proto::Directory::decode(&blobs[&a_digest][..]).unwrap();
        assert_eq!(a.directories.len(), 1);
        assert_eq!(a.directories[0].name, "b");
        assert_eq!(a.files.len(), 1);
        assert_eq!(a.files[0].name, "x");
        assert_eq!(a.files[0].digest, Some(compute(b"1")));

        let b_digest = a.directories[0].digest.clone().unwrap();
        let b = proto::Directory::decode(&blobs[&b_digest][..]).unwrap();
        assert_eq!(b.files.len(), 1);
        assert_eq!(b.files[0].name, "y");
        assert_eq!(b.files[0].digest, Some(compute(b"22")));
    }

    #[test]
    fn digest_is_stable_across_insertion_order() {
        let mut first = NestedDirectory::new();
        first.add(&regular(b"1"), "a/x").unwrap();
        first.add(&regular(b"22"), "a/b/y").unwrap();

        let mut second = NestedDirectory::new();
        second.add(&regular(b"22"), "a/b/y").unwrap();
        second.add(&regular(b"1"), "a/x").unwrap();

        let mut blobs = HashMap::new();
        assert_eq!(first.to_digest(&mut blobs), second.to_digest(&mut blobs));
    }

    #[test]
    fn to_digest_is_repeatable() {
        let mut nested = NestedDirectory::new();
        nested.add(&regular(b"1"), "a/x").unwrap();

        let mut blobs = HashMap::new();
        let first = nested.to_digest(&mut blobs);
        let second = nested.to_digest(&mut blobs);
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_path_last_add_wins() {
        let mut twice = NestedDirectory::new();
        twice.add(&regular(b"old"), "a/out.o").unwrap();
        twice.add(&regular(b"new"), "a/out.o").unwrap();

        let mut once = NestedDirectory::new();
        once.add(&regular(b"new"), "a/out.o").unwrap();

        let mut blobs = HashMap::new();
        assert_eq!(twice.to_digest(&mut blobs), once.to_digest(&mut blobs));
    }

    #[test]
    fn file_directory_collision_is_an_error() {
        let mut nested = NestedDirectory::new();
        nested.add(&regular(b"x"), "a").unwrap();
        assert_eq!(
            nested.add(&regular(b"y"), "a/b").unwrap_err(),
            MerkleError::NodeKindCollision("a".to_string()),
        );

        let mut nested = NestedDirectory::new();
        nested.add(&regular(b"y"), "a/b").unwrap();
        assert_eq!(
            nested.add(&regular(b"x"), "a").unwrap_err(),
            MerkleError::NodeKindCollision("a".to_string()),
        );
    }

    #[test]
    fn symlinks_are_recorded_without_digest() {
        let mut nested = NestedDirectory::new();
        nested
            .add(
                &InputFile::Symlink {
                    target: "../lib/libfoo.so".to_string(),
                },
                "lib/libfoo.so.1",
            )
            .unwrap();

        let mut blobs = HashMap::new();
        let root_digest = nested.to_digest(&mut blobs);
        let root = proto::Directory::decode(&blobs[&root_digest][..]).unwrap();
        let lib_digest = root.directories[0].digest.clone().unwrap();
        let lib = proto::Directory::decode(&blobs[&lib_digest][..]).unwrap();
        assert_eq!(lib.symlinks.len(), 1);
        assert_eq!(lib.symlinks[0].name, "libfoo.so.1");
        assert_eq!(lib.symlinks[0].target, "../lib/libfoo.so");
    }

    #[test]
    fn leading_and_doubled_slashes_are_skipped() {
        let mut plain = NestedDirectory::new();
        plain.add(&regular(b"1"), "usr/include/x.h").unwrap();

        let mut slashed = NestedDirectory::new();
        slashed.add(&regular(b"1"), "/usr//include/x.h").unwrap();

        let mut blobs = HashMap::new();
        assert_eq!(plain.to_digest(&mut blobs), slashed.to_digest(&mut blobs));
    }

    #[test]
    fn from_path_walks_the_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/sub")).unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        std::fs::write(dir.path().join("src/main.c"), b"main").unwrap();
        std::fs::write(dir.path().join("src/sub/util.c"), b"util").unwrap();

        let (nested, contents) = NestedDirectory::from_path(dir.path()).unwrap();
        assert!(contents.contains_key(&compute(b"main")));
        assert!(contents.contains_key(&compute(b"util")));

        let mut blobs = HashMap::new();
        let root_digest = nested.to_digest(&mut blobs);
        let root = proto::Directory::decode(&blobs[&root_digest][..]).unwrap();
        let names: Vec<_> = root.directories.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["empty", "src"]);
    }
}
