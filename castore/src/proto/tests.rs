use prost::Message;

use crate::fixtures::digest_with_size;
use crate::proto;

/// Decoding a canonical Directory and re-encoding it must reproduce the
/// exact bytes; digests are computed over this serialization.
#[test]
fn directory_roundtrip_is_byte_identical() {
    let directory = proto::Directory {
        files: vec![
            proto::FileNode {
                name: "main.o".to_string(),
                digest: Some(digest_with_size(1, 4)),
                is_executable: false,
            },
            proto::FileNode {
                name: "tool".to_string(),
                digest: Some(digest_with_size(2, 8)),
                is_executable: true,
            },
        ],
        directories: vec![proto::DirectoryNode {
            name: "include".to_string(),
            digest: Some(digest_with_size(3, 2)),
        }],
        symlinks: vec![proto::SymlinkNode {
            name: "latest".to_string(),
            target: "tool".to_string(),
        }],
    };

    let encoded = directory.encode_to_vec();
    let decoded = proto::Directory::decode(&encoded[..]).unwrap();
    assert_eq!(decoded, directory);
    assert_eq!(decoded.encode_to_vec(), encoded);
}

#[test]
fn empty_directory_encodes_to_no_bytes() {
    assert!(proto::Directory::default().encode_to_vec().is_empty());
}

/// The Operation oneof distinguishes an error status from a packed
/// response.
#[test]
fn operation_result_oneof() {
    use proto::google::longrunning::{operation, Operation};

    let op = Operation {
        name: "operations/1".to_string(),
        metadata: None,
        done: true,
        result: Some(operation::Result::Error(proto::google::rpc::Status {
            code: 8,
            message: "out of quota".to_string(),
            details: vec![],
        })),
    };

    let decoded = Operation::decode(&op.encode_to_vec()[..]).unwrap();
    match decoded.result {
        Some(operation::Result::Error(status)) => {
            assert_eq!(status.code, 8);
            assert_eq!(status.message, "out of quota");
        }
        other => panic!("expected error result, got {:?}", other),
    }
}

/// An ExecuteResponse survives the Any packing used inside Operation.
#[test]
fn execute_response_any_roundtrip() {
    let response = proto::ExecuteResponse {
        result: Some(proto::ActionResult {
            exit_code: 1,
            ..Default::default()
        }),
        cached_result: false,
        status: None,
        message: String::new(),
    };

    let any = prost_types::Any {
        type_url: "type.googleapis.com/build.bazel.remote.execution.v2.ExecuteResponse"
            .to_string(),
        value: response.encode_to_vec().into(),
    };

    let unpacked = proto::ExecuteResponse::decode(&any.value[..]).unwrap();
    assert_eq!(unpacked.result.unwrap().exit_code, 1);
}
