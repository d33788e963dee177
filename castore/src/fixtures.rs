//! Shared test vectors.

use lazy_static::lazy_static;

use crate::{compute, compute_message, proto};

pub const HELLO_BLOB_CONTENTS: &[u8] = b"hello world\n";
pub const EMPTY_BLOB_CONTENTS: &[u8] = b"";

lazy_static! {
    pub static ref HELLO_BLOB_DIGEST: proto::Digest = compute(HELLO_BLOB_CONTENTS);
    pub static ref EMPTY_BLOB_DIGEST: proto::Digest = compute(EMPTY_BLOB_CONTENTS);
    pub static ref EMPTY_DIRECTORY_DIGEST: proto::Digest =
        compute_message(&proto::Directory::default());
}

/// A synthetic digest with a fixed-width fake hash and the given size.
/// Only good for exercising routing, batching and map plumbing; the hash
/// is not a hash of anything.
pub fn digest_with_size(seed: u8, size_bytes: i64) -> proto::Digest {
    proto::Digest {
        hash: format!("{:02x}", seed).repeat(32),
        size_bytes,
    }
}
