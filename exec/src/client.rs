//! Drives one action through the action cache, the execution service and
//! back out to the local filesystem.

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use tonic::transport::Channel;
use tracing::{debug, info, instrument, warn};

use offload_castore::cas::CasClient;
use offload_castore::context::RequestContext;
use offload_castore::proto;
use offload_castore::proto::action_cache_client::ActionCacheClient;
use offload_castore::proto::execution_client::ExecutionClient;
use offload_castore::proto::google::longrunning::{operation, Operation};
use offload_castore::proto::google::longrunning::operations_client::OperationsClient;
use offload_castore::proto::google::longrunning::CancelOperationRequest;
use offload_castore::retry::{retry, RetryContext, RetryPolicy, POLL_WAIT};
use offload_castore::{compute_message, Error};

const EXECUTE_RESPONSE_TYPE: &str = "build.bazel.remote.execution.v2.ExecuteResponse";

/// One regular file to materialize from an ActionResult.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputEntry {
    /// Path relative to the materialization root.
    pub path: String,
    pub digest: proto::Digest,
    pub executable: bool,
}

pub struct RemoteExecutionClient {
    instance: String,
    execution: ExecutionClient<Channel>,
    operations: OperationsClient<Channel>,
    action_cache: ActionCacheClient<Channel>,
    cas: CasClient,
    context: Arc<RequestContext>,
    retry: RetryPolicy,
}

impl RemoteExecutionClient {
    /// `execution_channel` serves both the Execution and Operations
    /// services; the action cache may live elsewhere.
    pub fn new(
        execution_channel: Channel,
        action_cache_channel: Channel,
        cas: CasClient,
        context: Arc<RequestContext>,
        retry: RetryPolicy,
        instance: String,
    ) -> Self {
        RemoteExecutionClient {
            instance,
            execution: ExecutionClient::new(execution_channel.clone()),
            operations: OperationsClient::new(execution_channel),
            action_cache: ActionCacheClient::new(action_cache_channel),
            cas,
            context,
            retry,
        }
    }

    pub fn cas(&self) -> &CasClient {
        &self.cas
    }

    /// Asks the action cache for a prior result of this action. A
    /// `NOT_FOUND` answer is a plain miss, not an error.
    #[instrument(skip(self), fields(action = %action_digest))]
    pub async fn fetch_from_action_cache(
        &self,
        action_digest: &proto::Digest,
    ) -> Result<Option<proto::ActionResult>, Error> {
        let request = proto::GetActionResultRequest {
            instance_name: self.instance.clone(),
            action_digest: Some(action_digest.clone()),
            inline_stdout: false,
            inline_stderr: false,
        };

        retry(&self.retry, self.context.as_ref(), || {
            let mut client = self.action_cache.clone();
            let ctx = self.context.clone();
            let request = request.clone();
            async move {
                match client.get_action_result(ctx.decorate(request).await?).await {
                    Ok(response) => Ok(Some(response.into_inner())),
                    Err(status) if status.code() == tonic::Code::NotFound => Ok(None),
                    Err(status) => Err(status.into()),
                }
            }
        })
        .await
    }

    /// Executes the action (already uploaded to CAS) and waits for its
    /// terminal Operation, polling for cancellation at [POLL_WAIT]
    /// granularity. A non-zero remote exit code is a result, not an error.
    #[instrument(skip(self), fields(action = %action_digest))]
    pub async fn execute_action(
        &self,
        action_digest: &proto::Digest,
        skip_cache_lookup: bool,
    ) -> Result<proto::ActionResult, Error> {
        let request = proto::ExecuteRequest {
            instance_name: self.instance.clone(),
            skip_cache_lookup,
            action_digest: Some(action_digest.clone()),
            execution_policy: None,
            results_cache_policy: None,
        };

        let operation = retry(&self.retry, self.context.as_ref(), || {
            let request = request.clone();
            async move {
                let mut client = self.execution.clone();
                let mut stream = client
                    .execute(self.context.decorate(request).await?)
                    .await
                    .map_err(Error::from)?
                    .into_inner();

                let mut operation: Option<Operation> = None;
                let mut poll = tokio::time::interval(POLL_WAIT);
                loop {
                    tokio::select! {
                        message = stream.message() => {
                            match message.map_err(Error::from)? {
                                Some(op) => {
                                    let done = op.done;
                                    operation = Some(op);
                                    if done {
                                        break;
                                    }
                                }
                                None => break,
                            }
                        }
                        _ = poll.tick() => {
                            if self.context.cancelled() {
                                if let Some(op) = &operation {
                                    if !op.name.is_empty() {
                                        self.cancel_operation(&op.name).await;
                                    }
                                }
                                return Err(Error::Cancelled);
                            }
                        }
                    }
                }

                match operation {
                    Some(op) if op.done => Ok(op),
                    _ => Err(Error::Protocol(
                        "server closed the stream before the operation finished".to_string(),
                    )),
                }
            }
        })
        .await?;

        action_result_from_operation(operation)
    }

    /// Best-effort CancelOperation: failures are logged, never raised.
    pub async fn cancel_operation(&self, name: &str) {
        let request = CancelOperationRequest {
            name: name.to_string(),
        };
        let decorated = match self.context.decorate(request).await {
            Ok(decorated) => decorated,
            Err(e) => {
                warn!(operation = name, %e, "failed to build cancellation request");
                return;
            }
        };
        match self.operations.clone().cancel_operation(decorated).await {
            Ok(_) => info!(operation = name, "cancelled remote operation"),
            Err(status) => warn!(
                operation = name,
                code = ?status.code(),
                "failed to cancel remote operation: {}",
                status.message()
            ),
        }
    }

    /// Resolves an output blob that may be inlined in the ActionResult or
    /// parked in CAS.
    pub async fn get_output_blob(
        &self,
        raw: &Bytes,
        digest: &Option<proto::Digest>,
    ) -> Result<Bytes, Error> {
        if !raw.is_empty() {
            return Ok(raw.clone());
        }
        match digest {
            Some(digest) if digest.size_bytes > 0 => self.cas.fetch_blob(digest).await,
            _ => Ok(Bytes::new()),
        }
    }

    /// Materializes the result's output files, directories and symlinks
    /// under `root`.
    #[instrument(skip_all, fields(root = %root.display()))]
    pub async fn write_files_to_disk(
        &self,
        result: &proto::ActionResult,
        root: &Path,
    ) -> Result<(), Error> {
        let mut entries = Vec::new();
        let mut symlinks: Vec<(String, String)> = result
            .output_symlinks
            .iter()
            .map(|s| (s.path.clone(), s.target.clone()))
            .collect();

        for file in &result.output_files {
            entries.push(OutputEntry {
                path: file.path.clone(),
                digest: file.digest.clone().ok_or_else(|| {
                    Error::Protocol(format!("output file {} carries no digest", file.path))
                })?,
                executable: file.is_executable,
            });
        }

        for directory in &result.output_directories {
            let tree_digest = directory.tree_digest.clone().ok_or_else(|| {
                Error::Protocol(format!(
                    "output directory {} carries no tree digest",
                    directory.path
                ))
            })?;
            let tree: proto::Tree = self.cas.fetch_message(&tree_digest).await?;
            let (tree_files, tree_symlinks) = flatten_tree(&tree, &directory.path)?;
            entries.extend(tree_files);
            symlinks.extend(tree_symlinks);
        }

        let contents = self
            .cas
            .fetch_blobs(entries.iter().map(|e| e.digest.clone()))
            .await?;
        write_output_files(root, &entries, &contents, &symlinks).await
    }
}

/// Extracts the ActionResult out of a terminal Operation, applying the
/// completion rules: an embedded error status fails, a response of the
/// wrong type fails, a non-OK ExecuteResponse status fails.
pub(crate) fn action_result_from_operation(
    operation: Operation,
) -> Result<proto::ActionResult, Error> {
    if !operation.done {
        return Err(Error::Precondition(
            "tried to read the result of an unfinished operation".to_string(),
        ));
    }

    match operation.result {
        None => Err(Error::Protocol(
            "finished operation carries no result".to_string(),
        )),
        Some(operation::Result::Error(status)) => Err(Error::Rpc {
            code: tonic::Code::from(status.code),
            message: status.message,
        }),
        Some(operation::Result::Response(any)) => {
            if !any.type_url.ends_with(EXECUTE_RESPONSE_TYPE) {
                return Err(Error::Protocol(
                    "server returned invalid operation result".to_string(),
                ));
            }
            let response = proto::ExecuteResponse::decode(&any.value[..])
                .map_err(|_| Error::Protocol("could not unpack ExecuteResponse".to_string()))?;

            if let Some(status) = response.status {
                if status.code != 0 {
                    return Err(Error::Rpc {
                        code: tonic::Code::from(status.code),
                        message: status.message,
                    });
                }
            }
            response.result.ok_or_else(|| {
                Error::Protocol("execute response carries no action result".to_string())
            })
        }
    }
}

/// Expands a Tree into the flat list of files and symlinks it contains,
/// with paths prefixed by the output directory's path. Children are looked
/// up by digest; a shared child directory is visited once per reference.
pub(crate) fn flatten_tree(
    tree: &proto::Tree,
    prefix: &str,
) -> Result<(Vec<OutputEntry>, Vec<(String, String)>), Error> {
    let children: HashMap<proto::Digest, &proto::Directory> = tree
        .children
        .iter()
        .map(|child| (compute_message(child), child))
        .collect();
    let root = tree
        .root
        .as_ref()
        .ok_or_else(|| Error::Protocol("tree carries no root directory".to_string()))?;

    let mut files = Vec::new();
    let mut symlinks = Vec::new();
    walk_tree(root, prefix, &children, &mut files, &mut symlinks)?;
    Ok((files, symlinks))
}

fn walk_tree(
    directory: &proto::Directory,
    prefix: &str,
    children: &HashMap<proto::Digest, &proto::Directory>,
    files: &mut Vec<OutputEntry>,
    symlinks: &mut Vec<(String, String)>,
) -> Result<(), Error> {
    for file in &directory.files {
        files.push(OutputEntry {
            path: format!("{}/{}", prefix, file.name),
            digest: file.digest.clone().ok_or_else(|| {
                Error::Protocol(format!("tree file {} carries no digest", file.name))
            })?,
            executable: file.is_executable,
        });
    }

    for symlink in &directory.symlinks {
        symlinks.push((format!("{}/{}", prefix, symlink.name), symlink.target.clone()));
    }

    for subdirectory in &directory.directories {
        let digest = subdirectory.digest.clone().ok_or_else(|| {
            Error::Protocol(format!(
                "tree directory {} carries no digest",
                subdirectory.name
            ))
        })?;
        let child = children.get(&digest).ok_or_else(|| {
            Error::Protocol(format!(
                "tree is missing child directory {}",
                subdirectory.name
            ))
        })?;
        let prefix = format!("{}/{}", prefix, subdirectory.name);
        walk_tree(child, &prefix, children, files, symlinks)?;
    }
    Ok(())
}

/// Writes prefetched output files and symlinks under `root`, creating
/// parent directories as needed and applying the executable bit.
pub(crate) async fn write_output_files(
    root: &Path,
    entries: &[OutputEntry],
    contents: &HashMap<proto::Digest, Bytes>,
    symlinks: &[(String, String)],
) -> Result<(), Error> {
    for entry in entries {
        let path = root.join(&entry.path);
        let data = contents.get(&entry.digest).ok_or_else(|| {
            Error::Protocol(format!("no contents fetched for output {}", entry.path))
        })?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        debug!(path = %path.display(), "writing output file");
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| Error::io(&path, e))?;
        if entry.executable {
            tokio::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
                .await
                .map_err(|e| Error::io(&path, e))?;
        }
    }

    for (link_path, target) in symlinks {
        let path = root.join(link_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }
        tokio::fs::symlink(target, &path)
            .await
            .map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use offload_castore::compute;

    fn packed_response(response: &proto::ExecuteResponse) -> prost_types::Any {
        prost_types::Any {
            type_url: format!("type.googleapis.com/{}", EXECUTE_RESPONSE_TYPE),
            value: response.encode_to_vec(),
        }
    }

    fn done_operation(result: Option<operation::Result>) -> Operation {
        Operation {
            name: "operations/op-1".to_string(),
            metadata: None,
            done: true,
            result,
        }
    }

    #[test]
    fn unfinished_operation_is_a_precondition_error() {
        let op = Operation {
            done: false,
            ..done_operation(None)
        };
        assert!(matches!(
            action_result_from_operation(op).unwrap_err(),
            Error::Precondition(_)
        ));
    }

    #[test]
    fn embedded_error_status_is_surfaced() {
        let op = done_operation(Some(operation::Result::Error(
            proto::google::rpc::Status {
                code: 8,
                message: "out of quota".to_string(),
                details: vec![],
            },
        )));
        let err = action_result_from_operation(op).unwrap_err();
        assert_eq!(err.rpc_code(), Some(tonic::Code::ResourceExhausted));
    }

    #[test]
    fn missing_result_is_a_protocol_error() {
        assert!(matches!(
            action_result_from_operation(done_operation(None)).unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[test]
    fn wrong_response_type_is_a_protocol_error() {
        let op = done_operation(Some(operation::Result::Response(prost_types::Any {
            type_url: "type.googleapis.com/google.protobuf.Empty".to_string(),
            value: vec![],
        })));
        let err = action_result_from_operation(op).unwrap_err();
        assert!(err.to_string().contains("invalid operation result"));
    }

    #[test]
    fn non_ok_execute_response_status_fails() {
        let response = proto::ExecuteResponse {
            result: Some(proto::ActionResult::default()),
            status: Some(proto::google::rpc::Status {
                code: 5,
                message: "blob not found".to_string(),
                details: vec![],
            }),
            ..Default::default()
        };
        let op = done_operation(Some(operation::Result::Response(packed_response(&response))));
        let err = action_result_from_operation(op).unwrap_err();
        assert_eq!(err.rpc_code(), Some(tonic::Code::NotFound));
    }

    #[test]
    fn nonzero_exit_code_is_a_result_not_an_error() {
        let response = proto::ExecuteResponse {
            result: Some(proto::ActionResult {
                exit_code: 2,
                ..Default::default()
            }),
            ..Default::default()
        };
        let op = done_operation(Some(operation::Result::Response(packed_response(&response))));
        let result = action_result_from_operation(op).unwrap();
        assert_eq!(result.exit_code, 2);
    }

    #[test]
    fn flatten_tree_expands_nested_and_shared_children() {
        let leaf = proto::Directory {
            files: vec![proto::FileNode {
                name: "obj.o".to_string(),
                digest: Some(compute(b"OBJ")),
                is_executable: false,
            }],
            ..Default::default()
        };
        let leaf_digest = compute_message(&leaf);
        // two subdirectories share the same child directory
        let root = proto::Directory {
            directories: vec![
                proto::DirectoryNode {
                    name: "debug".to_string(),
                    digest: Some(leaf_digest.clone()),
                },
                proto::DirectoryNode {
                    name: "release".to_string(),
                    digest: Some(leaf_digest.clone()),
                },
            ],
            symlinks: vec![proto::SymlinkNode {
                name: "latest".to_string(),
                target: "release".to_string(),
            }],
            ..Default::default()
        };
        let tree = proto::Tree {
            root: Some(root),
            children: vec![leaf],
        };

        let (files, symlinks) = flatten_tree(&tree, "out").unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["out/debug/obj.o", "out/release/obj.o"]);
        assert_eq!(symlinks, vec![("out/latest".to_string(), "release".to_string())]);
    }

    #[test]
    fn flatten_tree_missing_child_is_a_protocol_error() {
        let tree = proto::Tree {
            root: Some(proto::Directory {
                directories: vec![proto::DirectoryNode {
                    name: "sub".to_string(),
                    digest: Some(compute(b"who knows")),
                }],
                ..Default::default()
            }),
            children: vec![],
        };
        assert!(matches!(
            flatten_tree(&tree, "out").unwrap_err(),
            Error::Protocol(_)
        ));
    }

    #[tokio::test]
    async fn write_output_files_creates_parents_and_modes() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![
            OutputEntry {
                path: "o.txt".to_string(),
                digest: compute(b"hi\n"),
                executable: false,
            },
            OutputEntry {
                path: "bin/tool".to_string(),
                digest: compute(b"#!/bin/sh\n"),
                executable: true,
            },
        ];
        let contents: HashMap<_, _> = [
            (compute(b"hi\n"), Bytes::from_static(b"hi\n")),
            (compute(b"#!/bin/sh\n"), Bytes::from_static(b"#!/bin/sh\n")),
        ]
        .into();
        let symlinks = vec![("bin/latest".to_string(), "tool".to_string())];

        write_output_files(dir.path(), &entries, &contents, &symlinks)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("o.txt")).unwrap(), b"hi\n");
        let mode = std::fs::metadata(dir.path().join("bin/tool"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o111, 0o111);
        let target = std::fs::read_link(dir.path().join("bin/latest")).unwrap();
        assert_eq!(target.to_str().unwrap(), "tool");
    }

    #[tokio::test]
    async fn write_output_files_requires_fetched_contents() {
        let dir = tempfile::tempdir().unwrap();
        let entries = vec![OutputEntry {
            path: "o.txt".to_string(),
            digest: compute(b"hi\n"),
            executable: false,
        }];
        let err = write_output_files(dir.path(), &entries, &HashMap::new(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }
}
