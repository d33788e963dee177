mod digests;
mod errors;

pub mod cas;
pub mod context;
pub mod fixtures;
pub mod merkle;
pub mod proto;
pub mod retry;
pub mod tonic;

mod file;
pub use file::{FileData, InputFile};

pub use digests::{compute, compute_message};
pub use errors::Error;
