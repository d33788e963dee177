//! Bindings for `google/rpc/status.proto`.

/// The `Status` type defines a logical error model suitable for different
/// programming environments. Each `Status` message contains an error code,
/// an error message, and optional error details.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Status {
    /// The status code, a value of `google.rpc.Code`. `0` is OK.
    #[prost(int32, tag = "1")]
    pub code: i32,
    /// A developer-facing error message in English.
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
    /// A list of messages that carry the error details.
    #[prost(message, repeated, tag = "3")]
    pub details: ::prost::alloc::vec::Vec<::prost_types::Any>,
}
