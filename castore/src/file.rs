use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::{compute, proto, Error};

/// Contents above this size are not kept in memory; the CAS client streams
/// them from disk instead.
pub const INLINE_CONTENTS_LIMIT: usize = 1 << 21;

/// Where the bytes of a regular input file live once it has been digested.
#[derive(Debug, Clone)]
pub enum FileData {
    /// Small contents, kept in memory.
    Inline(Bytes),
    /// Large contents, re-read from this path when uploaded.
    OnDisk(PathBuf),
}

/// A single filesystem entry fed into the Merkle tree: either a regular
/// file (digested, with the owner-executable bit) or a symlink (target
/// only, never digested).
#[derive(Debug, Clone)]
pub enum InputFile {
    Regular {
        digest: proto::Digest,
        executable: bool,
        data: FileData,
    },
    Symlink {
        target: String,
    },
}

impl InputFile {
    /// Reads the entry at `path`. Regular files are digested; symlinks are
    /// resolved with readlink only (their target may dangle). Any other
    /// file type is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let metadata = std::fs::symlink_metadata(path).map_err(|e| Error::io(path, e))?;

        if metadata.is_symlink() {
            let target = std::fs::read_link(path).map_err(|e| Error::io(path, e))?;
            let target = target
                .into_os_string()
                .into_string()
                .map_err(|t| Error::Protocol(format!("non-utf8 symlink target {:?}", t)))?;
            return Ok(InputFile::Symlink { target });
        }

        if !metadata.is_file() {
            return Err(Error::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("unsupported file type: {:?}", metadata.file_type()),
                ),
            ));
        }

        let contents = std::fs::read(path).map_err(|e| Error::io(path, e))?;
        let digest = compute(&contents);
        let executable = metadata.permissions().mode() & 0o100 != 0;
        let data = if contents.len() > INLINE_CONTENTS_LIMIT {
            FileData::OnDisk(path.to_path_buf())
        } else {
            FileData::Inline(contents.into())
        };

        Ok(InputFile::Regular {
            digest,
            executable,
            data,
        })
    }

    /// The digest of a regular file, None for symlinks.
    pub fn digest(&self) -> Option<&proto::Digest> {
        match self {
            InputFile::Regular { digest, .. } => Some(digest),
            InputFile::Symlink { .. } => None,
        }
    }
}
