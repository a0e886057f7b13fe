//! HTTP transport used to fetch the trust material.
//!
//! [`HttpClient`] is the seam between the [roots fetcher][crate::roots] and the network. The
//! provided [`HyperClient`] speaks HTTP/1.1 over rustls and resolves host names with
//! [`nameserver::lookup_ip`][crate::nameserver::lookup_ip], so it follows the
//! [internal DNS override][crate::nameserver::use_dns_internally] once one is installed.

use crate::error::Error;
use crate::nameserver;
use hyper::client::connect::dns::Name;
use hyper::client::HttpConnector;
use hyper::service::Service;
use hyper::{Body, Client, Uri};
use hyper_rustls::HttpsConnector;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{self, Poll};
use std::time::Duration;

/// `DynHttpClient` is a type alias for a [`HttpClient`] shared between consumers through an
/// [`Arc`].
#[allow(clippy::module_name_repetitions)]
pub type DynHttpClient = Arc<dyn HttpClient + Send + Sync>;

/// An async trait describing a plain HTTP GET.
#[async_trait::async_trait]
pub trait HttpClient {
    /// GET `url`, returning the full response body and the numeric status code. Non-OK
    /// statuses are not errors at this level.
    async fn get(&self, url: &str) -> Result<(Vec<u8>, u16), Error>;
}

/// A [`HttpClient`] backed by a [`hyper::Client`].
#[derive(Clone, Debug)]
pub struct HyperClient {
    client: Client<HttpsConnector<HttpConnector<InternalResolve>>, Body>,
    timeout: Duration,
}

impl HyperClient {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let mut http = HttpConnector::new_with_resolver(InternalResolve);
        http.enforce_http(false);
        let https = hyper_rustls::HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);
        Self {
            client: Client::builder().build(https),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl HttpClient for HyperClient {
    async fn get(&self, url: &str) -> Result<(Vec<u8>, u16), Error> {
        let uri: Uri = url.parse()?;
        let request = async {
            let response = self.client.get(uri).await?;
            let status = response.status().as_u16();
            let body = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, Error>((body.to_vec(), status))
        };
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(url.to_string())),
        }
    }
}

/// Connector resolver delegating to [`nameserver::lookup_ip`]. The connector sets the port from
/// the request URI afterwards.
#[derive(Clone, Copy, Debug, Default)]
pub struct InternalResolve;

impl Service<Name> for InternalResolve {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = io::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut task::Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, name: Name) -> Self::Future {
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = nameserver::lookup_ip(name.as_str())
                .await?
                .into_iter()
                .map(|ip| SocketAddr::new(ip, 0))
                .collect();
            Ok(addrs.into_iter())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Answers a single connection with the given raw HTTP response.
    async fn serve_once(response: &'static str) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn get_returns_body_and_status() {
        let addr = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 7\r\n\r\ncontent").await;
        let client = HyperClient::new(Duration::from_secs(5));

        let (body, status) = client
            .get(&format!("http://{addr}/root.hints"))
            .await
            .unwrap();

        assert_eq!(status, 200);
        assert_eq!(body, b"content");
    }

    #[tokio::test]
    async fn non_ok_status_is_not_an_error() {
        let addr = serve_once("HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\n\r\n").await;
        let client = HyperClient::new(Duration::from_secs(5));

        let (body, status) = client
            .get(&format!("http://{addr}/root.key"))
            .await
            .unwrap();

        assert_eq!(status, 404);
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn invalid_url_is_an_error() {
        let client = HyperClient::new(Duration::from_secs(5));
        assert!(matches!(
            client.get("not a url").await,
            Err(Error::InvalidURI(_))
        ));
    }

    #[tokio::test]
    async fn connection_refused_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = HyperClient::new(Duration::from_secs(5));

        assert!(matches!(
            client.get(&format!("http://{addr}/")).await,
            Err(Error::HTTP(_))
        ));
    }

    #[tokio::test]
    async fn unanswered_request_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });
        let client = HyperClient::new(Duration::from_millis(100));
        let url = format!("http://{addr}/root.hints");

        let result = client.get(&url).await;
        server.abort();

        assert!(matches!(result, Err(Error::Timeout(u)) if u == url));
    }
}
