use tokio::net::UnixStream;
use tonic::transport::{Channel, Endpoint};

/// Errors occurring when turning a URL into a [Channel].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported scheme {0:?}, expected grpc+http, grpc+https or grpc+unix")]
    UnsupportedScheme(String),

    #[error("host may not be set for unix domain sockets")]
    HostSetForUnixSocket,

    #[error("path may not be set")]
    PathMayNotBeSet,

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

fn wants_wait_connect(url: &url::Url) -> bool {
    url.query_pairs().any(|(k, v)| k == "wait-connect" && v == "1")
}

/// Turns a [url::Url] into a [Channel]. Supported schemes:
///  - `grpc+http://host:port`, unencrypted HTTP/2 (h2c)
///  - `grpc+https://host:port`, HTTP/2 over TLS with platform roots
///  - `grpc+unix:/path/to/socket`, a unix domain socket
///
/// Connections are established lazily on first use, unless the URL carries
/// `wait-connect=1`, in which case connecting happens (and can fail) here.
pub async fn channel_from_url(url: &url::Url) -> Result<Channel, Error> {
    match url.scheme() {
        "grpc+unix" => {
            if url.host_str().is_some() {
                return Err(Error::HostSetForUnixSocket);
            }

            let socket_path = url.path().to_string();
            let connector = tower::service_fn(move |_: tonic::transport::Uri| {
                let socket_path = socket_path.clone();
                async move {
                    UnixStream::connect(socket_path)
                        .await
                        .map(hyper_util::rt::TokioIo::new)
                }
            });

            // The endpoint URI is never looked at for unix sockets.
            let endpoint = Endpoint::from_static("http://[::]:50051");
            if wants_wait_connect(url) {
                Ok(endpoint.connect_with_connector(connector).await?)
            } else {
                Ok(endpoint.connect_with_connector_lazy(connector))
            }
        }
        "grpc+http" | "grpc+https" => {
            if !url.path().is_empty() {
                return Err(Error::PathMayNotBeSet);
            }

            // tonic doesn't know about the grpc+ prefix; hand it the
            // stringified URL with the prefix stripped. url::Url::set_scheme
            // can't be used here, it refuses some scheme transitions.
            let endpoint_str = url
                .to_string()
                .strip_prefix("grpc+")
                .expect("scheme starts with grpc+")
                .to_owned();

            let endpoint = Endpoint::try_from(endpoint_str)?;
            if wants_wait_connect(url) {
                Ok(endpoint.connect().await?)
            } else {
                Ok(endpoint.connect_lazy())
            }
        }
        scheme => Err(Error::UnsupportedScheme(scheme.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::channel_from_url;
    use rstest::rstest;
    use url::Url;

    #[rstest]
    // lazy connections succeed regardless of whether anything listens
    #[case::unix("grpc+unix:///path/to/somewhere", true)]
    #[case::http_host_port("grpc+http://[::1]:12345", true)]
    #[case::http_no_port("grpc+http://localhost", true)]
    #[case::https("grpc+https://localhost", true)]
    // eager connections to nonexistent endpoints fail here
    #[case::unix_wait("grpc+unix:///path/to/somewhere?wait-connect=1", false)]
    #[case::http_wait("grpc+http://nonexist.invalid?wait-connect=1", false)]
    // malformed shapes
    #[case::unix_with_host("grpc+unix://host.example/path/to/somewhere", false)]
    #[case::http_with_path("grpc+http://localhost/some-path", false)]
    #[case::bare_scheme("http://localhost", false)]
    #[tokio::test]
    async fn from_url(#[case] uri_str: &str, #[case] is_ok: bool) {
        let url = Url::parse(uri_str).expect("must parse");
        assert_eq!(channel_from_url(&url).await.is_ok(), is_ok);
    }
}
