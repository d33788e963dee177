//! Hand-maintained prost/tonic bindings for the subset of the
//! [Remote Execution API v2][rev2] this crate speaks, plus the Google API
//! protos it builds on (`google.rpc`, `google.bytestream`,
//! `google.longrunning`).
//!
//! The bindings are vendored instead of generated at build time, so
//! building the workspace does not require a protoc toolchain. Field
//! numbers, message shapes and service paths follow the upstream .proto
//! files; only messages and RPCs actually used by the client are carried.
//!
//! [rev2]: https://github.com/bazelbuild/remote-apis/blob/main/build/bazel/remote/execution/v2/remote_execution.proto

pub mod google;

mod remote_execution;
pub use remote_execution::*;

#[cfg(test)]
mod tests;
