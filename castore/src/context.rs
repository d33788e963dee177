//! Builds the per-call request context: correlation metadata and
//! credentials. This is the only place credentials touch the RPC layer.

use std::path::PathBuf;
use std::sync::RwLock as StdRwLock;

use prost::Message;
use serde::Deserialize;
use tokio::sync::RwLock;
use tonic::metadata::MetadataValue;
use tracing::debug;

use crate::retry::{CancelFlag, RetryContext};
use crate::{proto, Error};

/// Metadata header carrying the serialized [proto::RequestMetadata].
pub const REQUEST_METADATA_HEADER: &str = "requestmetadata-bin";

const TOOL_NAME: &str = "offload";

/// How this process authenticates to the cluster. Channel-level transport
/// security (TLS or not) is decided by the endpoint URL; `Token` adds a
/// bearer access token to every call on top of it.
pub enum Auth {
    None,
    Token(TokenSession),
}

/// The subset of the token JSON file we care about; unknown fields are
/// ignored so metadata additions don't break parsing.
#[derive(Deserialize)]
struct TokenFile {
    access_token: String,
    #[serde(default)]
    #[allow(dead_code)]
    refresh_token: String,
}

/// A bearer-token session backed by a JSON file maintained out-of-band.
/// Refreshing re-reads the file; the lock serializes a refresh against all
/// concurrent uses of the token.
#[derive(Debug)]
pub struct TokenSession {
    path: PathBuf,
    access_token: RwLock<String>,
}

impl TokenSession {
    /// Reads the token file at `path`. Fails if it cannot be read, is not
    /// JSON, or has no `access_token` field.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let token = Self::read_token(&path)?;
        Ok(TokenSession {
            path,
            access_token: RwLock::new(token),
        })
    }

    fn read_token(path: &PathBuf) -> Result<String, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let parsed: TokenFile = serde_json::from_str(&contents).map_err(|e| {
            Error::Precondition(format!(
                "authentication token {} could not be parsed as JSON: {}",
                path.display(),
                e
            ))
        })?;
        if parsed.access_token.is_empty() {
            return Err(Error::Precondition(format!(
                "authentication token {} missing field access_token",
                path.display()
            )));
        }
        Ok(parsed.access_token)
    }

    pub async fn access_token(&self) -> String {
        self.access_token.read().await.clone()
    }

    /// Re-reads the token file, picking up a token refreshed out-of-band.
    pub async fn refresh(&self) -> Result<(), Error> {
        let mut guard = self.access_token.write().await;
        let token = Self::read_token(&self.path)?;
        debug!(path = %self.path.display(), "reloaded access token");
        *guard = token;
        Ok(())
    }
}

/// Factory for per-call [tonic::Request]s. A fresh request is built for
/// every attempt; requests are never reused across RPCs.
pub struct RequestContext {
    auth: Auth,
    action_id: StdRwLock<String>,
    tool_invocation_id: String,
    correlated_invocations_id: String,
    cancel: CancelFlag,
}

impl RequestContext {
    pub fn new(auth: Auth, correlated_invocations_id: String, cancel: CancelFlag) -> Self {
        let hostname = std::env::var("HOSTNAME").unwrap_or_default();
        let tool_invocation_id =
            format!("{}:{}", hostname, std::os::unix::process::parent_id());
        RequestContext {
            auth,
            action_id: StdRwLock::new(String::new()),
            tool_invocation_id,
            correlated_invocations_id,
            cancel,
        }
    }

    /// Sets the action correlation id stamped onto subsequent requests.
    pub fn set_action_id(&self, action_id: impl Into<String>) {
        *self.action_id.write().expect("action id lock poisoned") = action_id.into();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    fn request_metadata(&self) -> proto::RequestMetadata {
        proto::RequestMetadata {
            tool_details: Some(proto::ToolDetails {
                tool_name: TOOL_NAME.to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
            }),
            action_id: self
                .action_id
                .read()
                .expect("action id lock poisoned")
                .clone(),
            tool_invocation_id: self.tool_invocation_id.clone(),
            correlated_invocations_id: self.correlated_invocations_id.clone(),
        }
    }

    /// Wraps `message` into a request carrying the correlation metadata
    /// header and, for token auth, the bearer token.
    pub async fn decorate<T>(&self, message: T) -> Result<tonic::Request<T>, Error> {
        let mut request = tonic::Request::new(message);

        let metadata = self.request_metadata().encode_to_vec();
        request.metadata_mut().insert_bin(
            REQUEST_METADATA_HEADER,
            MetadataValue::from_bytes(&metadata),
        );

        if let Auth::Token(session) = &self.auth {
            let token = session.access_token().await;
            let value = format!("Bearer {}", token).parse().map_err(|_| {
                Error::Precondition("access token is not a valid header value".to_string())
            })?;
            request.metadata_mut().insert("authorization", value);
        }

        Ok(request)
    }
}

impl RetryContext for RequestContext {
    fn cancelled(&self) -> bool {
        self.cancel.is_set()
    }

    fn auth_refresh(&self) -> impl std::future::Future<Output = Result<(), Error>> + Send {
        async move {
            match &self.auth {
                Auth::None => Err(Error::Precondition(
                    "no auth session was configured".to_string(),
                )),
                Auth::Token(session) => session.refresh().await,
            }
        }
    }
}
