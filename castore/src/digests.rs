use data_encoding::HEXLOWER;
use prost::Message;
use sha2::{Digest as _, Sha256};

use crate::proto;

/// Computes the [proto::Digest] of a blob: the lowercase-hex SHA-256 of its
/// bytes, together with its length.
pub fn compute(bytes: &[u8]) -> proto::Digest {
    let hash = Sha256::digest(bytes);
    proto::Digest {
        hash: HEXLOWER.encode(&hash),
        size_bytes: bytes.len() as i64,
    }
}

/// Computes the [proto::Digest] of a proto message over its canonical
/// serialization.
///
/// prost encodes fields in tag order, so two equal messages serialize to
/// identical bytes. Repeated fields the protocol requires to be sorted
/// (Directory entries, environment variables, platform properties) must be
/// sorted by the caller before this is invoked.
pub fn compute_message(message: &impl Message) -> proto::Digest {
    compute(&message.encode_to_vec())
}

impl std::fmt::Display for proto::Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.hash, self.size_bytes)
    }
}
