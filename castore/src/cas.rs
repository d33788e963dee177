//! Client for the ContentAddressableStorage and ByteStream services.
//!
//! Uploads and downloads follow the same small/large split: blobs up to
//! [MAX_BATCH_TOTAL_SIZE] travel in Batch{Update,Read}Blobs requests,
//! bigger ones are streamed over ByteStream in [MAX_CHUNK_SIZE] chunks.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use prost::Message;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tracing::{debug, instrument, warn};

use crate::context::RequestContext;
use crate::file::FileData;
use crate::proto;
use crate::proto::content_addressable_storage_client::ContentAddressableStorageClient;
use crate::proto::google::bytestream;
use crate::proto::google::bytestream::byte_stream_client::ByteStreamClient;
use crate::retry::{retry, RetryPolicy};
use crate::Error;

/// Chunk size for ByteStream transfers.
pub const MAX_CHUNK_SIZE: usize = 1 << 20;

/// Upper bound on the cumulative payload of one batch request, and the
/// routing threshold between batched and streamed transfers.
pub const MAX_BATCH_TOTAL_SIZE: usize = 1 << 21;

/// Upper bound on the number of digests in one batch or FindMissingBlobs
/// request.
pub const MAX_BATCH_COUNT: usize = 1 << 14;

/// A blob no larger than the batch cap is batched; anything bigger is
/// streamed unconditionally.
fn routes_to_batch(digest: &proto::Digest) -> bool {
    digest.size_bytes as usize <= MAX_BATCH_TOTAL_SIZE
}

fn resource_prefix(instance: &str) -> String {
    if instance.is_empty() {
        String::new()
    } else {
        format!("{}/", instance)
    }
}

fn upload_resource_name(instance: &str, uuid: &str, digest: &proto::Digest) -> String {
    format!(
        "{}uploads/{}/blobs/{}/{}",
        resource_prefix(instance),
        uuid,
        digest.hash,
        digest.size_bytes
    )
}

fn read_resource_name(instance: &str, digest: &proto::Digest) -> String {
    format!(
        "{}blobs/{}/{}",
        resource_prefix(instance),
        digest.hash,
        digest.size_bytes
    )
}

/// Groups batch-eligible digests into batches respecting both the count
/// cap and the cumulative-size cap, preserving order. Each entry costs its
/// payload size plus the length of its hash string. A blob that alone
/// exceeds the size cap must never get here; callers route those to
/// streaming first.
fn plan_batches(digests: Vec<proto::Digest>) -> Vec<Vec<proto::Digest>> {
    let mut batches = Vec::new();
    let mut current: Vec<proto::Digest> = Vec::new();
    let mut current_size: usize = 0;

    for digest in digests {
        let cost = digest.size_bytes as usize + digest.hash.len();
        if !current.is_empty()
            && (current_size + cost > MAX_BATCH_TOTAL_SIZE || current.len() >= MAX_BATCH_COUNT)
        {
            batches.push(std::mem::take(&mut current));
            current_size = 0;
        }
        current_size += cost;
        current.push(digest);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

/// Client for one CAS endpoint. Cheap to clone; the underlying channel
/// multiplexes concurrent requests.
#[derive(Clone)]
pub struct CasClient {
    instance: String,
    cas: ContentAddressableStorageClient<Channel>,
    bytestream: ByteStreamClient<Channel>,
    context: Arc<RequestContext>,
    retry: RetryPolicy,
    /// One upload session id per client, used in ByteStream resource names.
    uploads_uuid: String,
}

impl CasClient {
    pub fn new(
        channel: Channel,
        instance: String,
        context: Arc<RequestContext>,
        retry: RetryPolicy,
    ) -> Self {
        CasClient {
            instance,
            cas: ContentAddressableStorageClient::new(channel.clone()),
            bytestream: ByteStreamClient::new(channel),
            context,
            retry,
            uploads_uuid: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Asks the server which of `digests` it does not have yet, in chunks
    /// of at most [MAX_BATCH_COUNT].
    pub async fn find_missing(
        &self,
        digests: impl IntoIterator<Item = proto::Digest>,
    ) -> Result<HashSet<proto::Digest>, Error> {
        let all: Vec<proto::Digest> = digests.into_iter().collect();
        let mut missing = HashSet::new();

        for chunk in all.chunks(MAX_BATCH_COUNT) {
            let request = proto::FindMissingBlobsRequest {
                instance_name: self.instance.clone(),
                blob_digests: chunk.to_vec(),
            };
            let response = retry(&self.retry, self.context.as_ref(), || {
                let mut client = self.cas.clone();
                let ctx = self.context.clone();
                let request = request.clone();
                async move {
                    let response = client
                        .find_missing_blobs(ctx.decorate(request).await?)
                        .await
                        .map_err(Error::from)?;
                    Ok(response.into_inner())
                }
            })
            .await?;
            missing.extend(response.missing_blob_digests);
        }
        Ok(missing)
    }

    /// Ensures every digest in `blobs` and `files` exists in CAS: queries
    /// for the missing ones, batches the small ones and streams the large
    /// ones. Blob contents come either inline or from disk.
    #[instrument(skip_all, fields(blobs = blobs.len(), files = files.len()))]
    pub async fn upload_resources(
        &self,
        blobs: &HashMap<proto::Digest, Bytes>,
        files: &HashMap<proto::Digest, FileData>,
    ) -> Result<(), Error> {
        let candidates: Vec<proto::Digest> = blobs.keys().chain(files.keys()).cloned().collect();
        let missing = self.find_missing(candidates).await?;
        debug!(missing = missing.len(), "blobs to upload");

        let (small, large): (Vec<_>, Vec<_>) = missing.into_iter().partition(routes_to_batch);

        for batch in plan_batches(small) {
            let mut requests = Vec::with_capacity(batch.len());
            for digest in batch {
                let data = self.contents_for(&digest, blobs, files).await?;
                requests.push(proto::batch_update_blobs_request::Request {
                    digest: Some(digest),
                    data,
                    compressor: proto::compressor::Value::Identity as i32,
                });
            }
            self.batch_update(requests).await?;
        }

        for digest in large {
            let source = match blobs.get(&digest) {
                Some(data) => FileData::Inline(data.clone()),
                None => files
                    .get(&digest)
                    .cloned()
                    .ok_or_else(|| Self::unknown_digest(&digest))?,
            };
            self.write_blob(&digest, source).await?;
        }
        Ok(())
    }

    async fn contents_for(
        &self,
        digest: &proto::Digest,
        blobs: &HashMap<proto::Digest, Bytes>,
        files: &HashMap<proto::Digest, FileData>,
    ) -> Result<Bytes, Error> {
        if let Some(data) = blobs.get(digest) {
            return Ok(data.clone());
        }
        match files.get(digest) {
            Some(FileData::Inline(data)) => Ok(data.clone()),
            Some(FileData::OnDisk(path)) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| Error::io(path, e)),
            None => Err(Self::unknown_digest(digest)),
        }
    }

    fn unknown_digest(digest: &proto::Digest) -> Error {
        Error::Protocol(format!(
            "CAS server requested digest {} which was never offered",
            digest
        ))
    }

    /// Issues one BatchUpdateBlobs request. A batch with N entries must
    /// come back with N per-blob statuses; any non-OK status fails the
    /// upload immediately, without retrying.
    async fn batch_update(
        &self,
        requests: Vec<proto::batch_update_blobs_request::Request>,
    ) -> Result<(), Error> {
        let count = requests.len();
        let request = proto::BatchUpdateBlobsRequest {
            instance_name: self.instance.clone(),
            requests,
        };
        let response = retry(&self.retry, self.context.as_ref(), || {
            let mut client = self.cas.clone();
            let ctx = self.context.clone();
            let request = request.clone();
            async move {
                let response = client
                    .batch_update_blobs(ctx.decorate(request).await?)
                    .await
                    .map_err(Error::from)?;
                Ok(response.into_inner())
            }
        })
        .await?;

        if response.responses.len() != count {
            return Err(Error::Protocol(format!(
                "BatchUpdateBlobs returned {} statuses for {} blobs",
                response.responses.len(),
                count
            )));
        }
        for entry in response.responses {
            let status = entry.status.unwrap_or_default();
            if status.code != 0 {
                let digest = entry.digest.unwrap_or_default();
                return Err(Error::Rpc {
                    code: tonic::Code::from(status.code),
                    message: format!("upload of blob {} failed: {}", digest, status.message),
                });
            }
        }
        Ok(())
    }

    /// Streams one blob over ByteStream `Write`. On re-attempts the write
    /// resumes from the server's committed offset, via QueryWriteStatus.
    async fn write_blob(&self, digest: &proto::Digest, source: FileData) -> Result<(), Error> {
        let resource_name = upload_resource_name(&self.instance, &self.uploads_uuid, digest);
        let size = digest.size_bytes;
        let attempt = Arc::new(AtomicU32::new(0));

        let response = retry(&self.retry, self.context.as_ref(), || {
            let mut bytestream = self.bytestream.clone();
            let ctx = self.context.clone();
            let resource_name = resource_name.clone();
            let source = source.clone();
            let attempt = attempt.clone();
            async move {
                let offset = if attempt.fetch_add(1, Ordering::SeqCst) == 0 {
                    0
                } else {
                    let status = bytestream
                        .query_write_status(
                            ctx.decorate(bytestream::QueryWriteStatusRequest {
                                resource_name: resource_name.clone(),
                            })
                            .await?,
                        )
                        .await
                        .map_err(Error::from)?
                        .into_inner();
                    if status.complete {
                        return Ok(bytestream::WriteResponse {
                            committed_size: status.committed_size,
                        });
                    }
                    status.committed_size
                };

                let (tx, rx) = mpsc::channel(8);
                tokio::spawn(feed_write_requests(
                    resource_name.clone(),
                    source,
                    offset,
                    size,
                    tx,
                ));
                let request = ctx.decorate(ReceiverStream::new(rx)).await?;
                let response = bytestream.write(request).await.map_err(Error::from)?;
                Ok(response.into_inner())
            }
        })
        .await?;

        if response.committed_size != size {
            return Err(Error::Protocol(format!(
                "ByteStream upload of {} failed: server committed {} of {} bytes",
                digest, response.committed_size, size
            )));
        }
        Ok(())
    }

    /// Fetches a set of blobs, batching the small ones and streaming the
    /// large ones. Returns the contents keyed by digest.
    #[instrument(skip_all)]
    pub async fn fetch_blobs(
        &self,
        digests: impl IntoIterator<Item = proto::Digest>,
    ) -> Result<HashMap<proto::Digest, Bytes>, Error> {
        let unique: HashSet<proto::Digest> = digests.into_iter().collect();
        let (small, large): (Vec<_>, Vec<_>) = unique.into_iter().partition(routes_to_batch);

        let mut out = HashMap::new();
        for batch in plan_batches(small) {
            let request = proto::BatchReadBlobsRequest {
                instance_name: self.instance.clone(),
                digests: batch.clone(),
                acceptable_compressors: vec![proto::compressor::Value::Identity as i32],
            };
            let response = retry(&self.retry, self.context.as_ref(), || {
                let mut client = self.cas.clone();
                let ctx = self.context.clone();
                let request = request.clone();
                async move {
                    let response = client
                        .batch_read_blobs(ctx.decorate(request).await?)
                        .await
                        .map_err(Error::from)?;
                    Ok(response.into_inner())
                }
            })
            .await?;

            if response.responses.len() != batch.len() {
                return Err(Error::Protocol(format!(
                    "BatchReadBlobs returned {} entries for {} digests",
                    response.responses.len(),
                    batch.len()
                )));
            }
            for entry in response.responses {
                let digest = entry
                    .digest
                    .ok_or_else(|| Error::Protocol("BatchReadBlobs entry without digest".into()))?;
                let status = entry.status.unwrap_or_default();
                if status.code != 0 {
                    return Err(Error::Rpc {
                        code: tonic::Code::from(status.code),
                        message: format!("download of blob {} failed: {}", digest, status.message),
                    });
                }
                if entry.data.len() as i64 != digest.size_bytes {
                    return Err(Error::Protocol(format!(
                        "download of blob {} returned {} bytes",
                        digest,
                        entry.data.len()
                    )));
                }
                out.insert(digest, entry.data);
            }
        }

        for digest in large {
            let data = self.fetch_blob(&digest).await?;
            out.insert(digest, data);
        }
        Ok(out)
    }

    /// Fetches one blob over ByteStream `Read`, resuming on re-attempts
    /// from the bytes already received.
    pub async fn fetch_blob(&self, digest: &proto::Digest) -> Result<Bytes, Error> {
        let resource_name = read_resource_name(&self.instance, digest);
        let buffer = Arc::new(Mutex::new(BytesMut::new()));

        retry(&self.retry, self.context.as_ref(), || {
            let mut bytestream = self.bytestream.clone();
            let ctx = self.context.clone();
            let resource_name = resource_name.clone();
            let buffer = buffer.clone();
            async move {
                let read_offset = buffer.lock().expect("blob buffer poisoned").len() as i64;
                let request = bytestream::ReadRequest {
                    resource_name,
                    read_offset,
                    read_limit: 0,
                };
                let mut stream = bytestream
                    .read(ctx.decorate(request).await?)
                    .await
                    .map_err(Error::from)?
                    .into_inner();
                while let Some(response) = stream.message().await.map_err(Error::from)? {
                    buffer
                        .lock()
                        .expect("blob buffer poisoned")
                        .extend_from_slice(&response.data);
                }
                Ok(())
            }
        })
        .await?;

        let data = std::mem::take(&mut *buffer.lock().expect("blob buffer poisoned")).freeze();
        if data.len() as i64 != digest.size_bytes {
            return Err(Error::Protocol(format!(
                "fetched blob {} but got {} bytes",
                digest,
                data.len()
            )));
        }
        Ok(data)
    }

    /// Fetches and decodes a proto message stored in CAS.
    pub async fn fetch_message<T: Message + Default>(
        &self,
        digest: &proto::Digest,
    ) -> Result<T, Error> {
        let data = self.fetch_blob(digest).await?;
        T::decode(data.as_ref())
            .map_err(|_| Error::Protocol(format!("could not deserialize fetched message {}", digest)))
    }
}

/// Feeds WriteRequests for one blob into `tx`, starting at `offset`. The
/// first request names the resource; the last sets `finish_write`. On a
/// local read error the sender is dropped early, which the server answers
/// with a non-OK status, and the retry engine takes it from there.
async fn feed_write_requests(
    resource_name: String,
    source: FileData,
    offset: i64,
    total: i64,
    tx: mpsc::Sender<bytestream::WriteRequest>,
) {
    if offset >= total {
        let _ = tx
            .send(bytestream::WriteRequest {
                resource_name,
                write_offset: offset,
                finish_write: true,
                data: Bytes::new(),
            })
            .await;
        return;
    }

    match source {
        FileData::Inline(data) => {
            let mut pos = offset as usize;
            let len = data.len();
            let mut first = true;
            while pos < len {
                let end = (pos + MAX_CHUNK_SIZE).min(len);
                let request = bytestream::WriteRequest {
                    resource_name: if first {
                        resource_name.clone()
                    } else {
                        String::new()
                    },
                    write_offset: pos as i64,
                    finish_write: end == len,
                    data: data.slice(pos..end),
                };
                first = false;
                if tx.send(request).await.is_err() {
                    return;
                }
                pos = end;
            }
        }
        FileData::OnDisk(path) => {
            let mut file = match tokio::fs::File::open(&path).await {
                Ok(file) => file,
                Err(e) => {
                    warn!(path = %path.display(), %e, "opening input file for upload failed");
                    return;
                }
            };
            if offset > 0 {
                if let Err(e) = file.seek(std::io::SeekFrom::Start(offset as u64)).await {
                    warn!(path = %path.display(), %e, "seeking input file for upload failed");
                    return;
                }
            }

            let mut pos = offset;
            let mut remaining = total - offset;
            let mut first = true;
            while remaining > 0 {
                let chunk_len = remaining.min(MAX_CHUNK_SIZE as i64) as usize;
                let mut buf = vec![0u8; chunk_len];
                if let Err(e) = file.read_exact(&mut buf).await {
                    warn!(path = %path.display(), %e, "reading input file for upload failed");
                    return;
                }
                remaining -= chunk_len as i64;
                let request = bytestream::WriteRequest {
                    resource_name: if first {
                        resource_name.clone()
                    } else {
                        String::new()
                    },
                    write_offset: pos,
                    finish_write: remaining == 0,
                    data: buf.into(),
                };
                first = false;
                if tx.send(request).await.is_err() {
                    return;
                }
                pos += chunk_len as i64;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::digest_with_size;

    #[test]
    fn batch_routing_boundary() {
        assert!(routes_to_batch(&digest_with_size(
            1,
            MAX_BATCH_TOTAL_SIZE as i64
        )));
        assert!(!routes_to_batch(&digest_with_size(
            1,
            MAX_BATCH_TOTAL_SIZE as i64 + 1
        )));
    }

    #[test]
    fn resource_names() {
        let digest = digest_with_size(0xab, 42);
        assert_eq!(
            read_resource_name("main", &digest),
            format!("main/blobs/{}/42", digest.hash),
        );
        assert_eq!(
            read_resource_name("", &digest),
            format!("blobs/{}/42", digest.hash),
        );
        assert_eq!(
            upload_resource_name("main", "uuid-1", &digest),
            format!("main/uploads/uuid-1/blobs/{}/42", digest.hash),
        );
    }

    #[test]
    fn plan_batches_respects_size_cap() {
        // Three blobs of a bit over a third of the cap each: the first two
        // fit together, the third overflows into its own batch.
        let third = (MAX_BATCH_TOTAL_SIZE / 3 + 1024) as i64;
        let batches = plan_batches(vec![
            digest_with_size(1, third),
            digest_with_size(2, third),
            digest_with_size(3, third),
        ]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[1].len(), 1);
        // order preserved
        assert_eq!(batches[0][0].hash, digest_with_size(1, third).hash);
    }

    #[test]
    fn plan_batches_puts_blob_at_cap_alone() {
        // Cost accounting (size + hash length) pushes a cap-sized blob
        // over the limit, but it still goes out, in a batch of its own.
        let batches = plan_batches(vec![
            digest_with_size(1, MAX_BATCH_TOTAL_SIZE as i64),
            digest_with_size(2, 1),
        ]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn plan_batches_respects_count_cap() {
        let digests: Vec<_> = (0..MAX_BATCH_COUNT + 1)
            .map(|_| digest_with_size(0, 1))
            .collect();
        let batches = plan_batches(digests);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), MAX_BATCH_COUNT);
        assert_eq!(batches[1].len(), 1);
    }

    #[test]
    fn plan_batches_empty() {
        assert!(plan_batches(vec![]).is_empty());
    }

    async fn collect_requests(
        source: FileData,
        offset: i64,
        total: i64,
    ) -> Vec<bytestream::WriteRequest> {
        let (tx, mut rx) = mpsc::channel(64);
        feed_write_requests("res/1".to_string(), source, offset, total, tx).await;
        let mut requests = Vec::new();
        while let Some(request) = rx.recv().await {
            requests.push(request);
        }
        requests
    }

    #[tokio::test]
    async fn write_requests_chunked_with_finish_on_last() {
        let total = MAX_CHUNK_SIZE as i64 * 2 + 500;
        let data = Bytes::from(vec![7u8; total as usize]);
        let requests = collect_requests(FileData::Inline(data), 0, total).await;

        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].resource_name, "res/1");
        assert_eq!(requests[0].write_offset, 0);
        assert!(!requests[0].finish_write);
        assert_eq!(requests[1].resource_name, "");
        assert_eq!(requests[1].write_offset, MAX_CHUNK_SIZE as i64);
        assert_eq!(requests[2].write_offset, 2 * MAX_CHUNK_SIZE as i64);
        assert_eq!(requests[2].data.len(), 500);
        assert!(requests[2].finish_write);
    }

    #[tokio::test]
    async fn write_requests_resume_from_offset() {
        let total = MAX_CHUNK_SIZE as i64 + 100;
        let data = Bytes::from(vec![7u8; total as usize]);
        let requests = collect_requests(FileData::Inline(data), MAX_CHUNK_SIZE as i64, total).await;

        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].write_offset, MAX_CHUNK_SIZE as i64);
        assert_eq!(requests[0].data.len(), 100);
        assert!(requests[0].finish_write);
    }

    #[tokio::test]
    async fn write_requests_for_empty_blob() {
        let requests = collect_requests(FileData::Inline(Bytes::new()), 0, 0).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].resource_name, "res/1");
        assert!(requests[0].finish_write);
        assert!(requests[0].data.is_empty());
    }

    #[tokio::test]
    async fn write_requests_stream_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let contents = vec![3u8; MAX_CHUNK_SIZE + 10];
        std::fs::write(&path, &contents).unwrap();

        let requests =
            collect_requests(FileData::OnDisk(path), 0, contents.len() as i64).await;
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].data.len(), MAX_CHUNK_SIZE);
        assert_eq!(requests[1].data.len(), 10);
        assert!(requests[1].finish_write);
        let mut reassembled = requests[0].data.to_vec();
        reassembled.extend_from_slice(&requests[1].data);
        assert_eq!(reassembled, contents);
    }
}
