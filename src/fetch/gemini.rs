// src/fetch/gemini.rs
// =============================================================================
// A minimal Gemini client: enough to download a twtxt.txt file.
//
// One request is one connection:
//   1. TCP connect to host:port (port 1965 unless the URL says otherwise)
//   2. TLS handshake
//   3. send "<absolute URL>\r\n"
//   4. read "<two digit status> <meta>\r\n", then the body until EOF
//
// Gemini servers almost always use self-signed certificates and clients are
// expected to trust on first use. The crawl keeps nothing between runs, so
// every certificate is a first use: we accept any certificate but still check
// that the handshake signatures are valid for the certificate presented.
//
// Rust concepts:
// - tokio::time::timeout wraps each phase with its own deadline
// - tokio-rustls gives an async TLS stream over a plain TcpStream
// - A custom rustls ServerCertVerifier changes the trust policy
// =============================================================================

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{
    ring, verify_tls12_signature, verify_tls13_signature, CryptoProvider,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;
use url::{Host, Url};

use super::FetchConfig;
use crate::error::FetchError;

const DEFAULT_PORT: u16 = 1965;

// The protocol caps the header line at 1024 bytes of meta plus status and CRLF.
const MAX_HEADER_LEN: usize = 1029;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiResponse {
    pub status: u8,
    pub meta: String,
    pub body: Vec<u8>,
}

impl GeminiResponse {
    /// 20 through 29 are the success class
    pub fn is_success(&self) -> bool {
        (20..=29).contains(&self.status)
    }
}

pub(crate) struct GeminiClient {
    connector: TlsConnector,
    connect_timeout: Duration,
    handshake_timeout: Duration,
    request_timeout: Duration,
}

impl GeminiClient {
    pub(crate) fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let provider = Arc::new(ring::default_provider());
        let tls = ClientConfig::builder_with_provider(Arc::clone(&provider))
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate { provider }))
            .with_no_client_auth();

        Ok(Self {
            connector: TlsConnector::from(Arc::new(tls)),
            connect_timeout: config.connect_timeout,
            handshake_timeout: config.handshake_timeout,
            request_timeout: config.request_timeout,
        })
    }

    pub(crate) async fn request(&self, raw_url: &str) -> Result<GeminiResponse, FetchError> {
        // Pull host and port out of the URL; gemini defaults to 1965
        let url = Url::parse(raw_url)?;
        let host = url
            .host()
            .ok_or_else(|| FetchError::MissingHost(raw_url.to_string()))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        // Step 1: plain TCP connection
        let tcp = timeout(self.connect_timeout, connect(&host, port))
            .await
            .map_err(|_| FetchError::Timeout("connect"))??;

        // Step 2: TLS on top of it (any certificate is accepted, see below)
        let server_name =
            server_name(&host).ok_or_else(|| FetchError::MissingHost(raw_url.to_string()))?;
        let mut tls = timeout(self.handshake_timeout, self.connector.connect(server_name, tcp))
            .await
            .map_err(|_| FetchError::Timeout("handshake"))??;

        // Step 3: send the request line and read everything the server sends back
        let exchange = async {
            tls.write_all(format!("{raw_url}\r\n").as_bytes()).await?;
            tls.flush().await?;

            let mut raw = Vec::new();
            match tls.read_to_end(&mut raw).await {
                Ok(_) => {}
                // Plenty of servers hang up without a TLS close_notify.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof && !raw.is_empty() => {}
                Err(e) => return Err(e),
            }
            Ok::<_, io::Error>(raw)
        };
        let raw = timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout("request"))??;

        // Step 4: split header from body
        parse_response(&raw)
    }
}

// IP literals are connected to directly. host_str() would keep the brackets
// around an IPv6 address, which the resolver does not understand.
async fn connect(host: &Host<&str>, port: u16) -> io::Result<TcpStream> {
    match host {
        Host::Domain(domain) => TcpStream::connect((*domain, port)).await,
        Host::Ipv4(ip) => TcpStream::connect(SocketAddr::from((*ip, port))).await,
        Host::Ipv6(ip) => TcpStream::connect(SocketAddr::from((*ip, port))).await,
    }
}

fn server_name(host: &Host<&str>) -> Option<ServerName<'static>> {
    match host {
        Host::Domain(domain) => ServerName::try_from(domain.to_string()).ok(),
        Host::Ipv4(ip) => Some(ServerName::from(IpAddr::V4(*ip))),
        Host::Ipv6(ip) => Some(ServerName::from(IpAddr::V6(*ip))),
    }
}

/// Splits a raw response into header and body.
pub fn parse_response(raw: &[u8]) -> Result<GeminiResponse, FetchError> {
    let header_end = raw
        .iter()
        .take(MAX_HEADER_LEN)
        .position(|&b| b == b'\n')
        .ok_or_else(|| FetchError::GeminiHeader(lossy_prefix(raw)))?;

    let header = String::from_utf8_lossy(&raw[..header_end]);
    let header = header.trim_end_matches('\r');
    let body = raw[header_end + 1..].to_vec();

    let (status, meta) = match header.split_once(' ') {
        Some((status, meta)) => (status, meta),
        None => (header, ""),
    };
    if status.len() != 2 {
        return Err(FetchError::GeminiHeader(header.to_string()));
    }
    let status = status
        .parse::<u8>()
        .map_err(|_| FetchError::GeminiHeader(header.to_string()))?;

    Ok(GeminiResponse {
        status,
        meta: meta.to_string(),
        body,
    })
}

fn lossy_prefix(raw: &[u8]) -> String {
    String::from_utf8_lossy(&raw[..raw.len().min(64)]).into_owned()
}

#[derive(Debug)]
struct AcceptAnyCertificate {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let raw = b"20 text/plain; charset=utf-8\r\n2022-01-01 hi\n";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 20);
        assert_eq!(response.meta, "text/plain; charset=utf-8");
        assert_eq!(response.body, b"2022-01-01 hi\n");
        assert!(response.is_success());
    }

    #[test]
    fn test_parse_not_found() {
        let response = parse_response(b"51 Not found\r\n").unwrap();
        assert_eq!(response.status, 51);
        assert!(response.body.is_empty());
        assert!(!response.is_success());
    }

    #[test]
    fn test_redirect_is_not_success() {
        let response = parse_response(b"31 gemini://elsewhere/twtxt.txt\r\n").unwrap();
        assert!(!response.is_success());
    }

    #[test]
    fn test_bare_lf_and_missing_meta() {
        let response = parse_response(b"20\nbody").unwrap();
        assert_eq!(response.status, 20);
        assert_eq!(response.meta, "");
        assert_eq!(response.body, b"body");
    }

    #[test]
    fn test_garbage_header_rejected() {
        assert!(matches!(
            parse_response(b"HTTP/1.1 200 OK\r\n"),
            Err(FetchError::GeminiHeader(_))
        ));
        assert!(matches!(parse_response(b"no newline at all"), Err(FetchError::GeminiHeader(_))));
    }

    #[test]
    fn test_client_builds_with_default_config() {
        assert!(GeminiClient::new(&FetchConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_fetch_error() {
        // Bind then drop to get a local port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = GeminiClient::new(&FetchConfig::default()).unwrap();
        let result = client
            .request(&format!("gemini://127.0.0.1:{port}/twtxt.txt"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_self_signed_server_over_ipv4_literal() {
        let addr = test_server::spawn(
            "127.0.0.1:0",
            vec![("/twtxt.txt", b"20 text/plain\r\n2022-01-01 hi\n".as_slice())],
        )
        .await
        .unwrap();

        let client = GeminiClient::new(&FetchConfig::default()).unwrap();
        let response = client
            .request(&format!("gemini://{addr}/twtxt.txt"))
            .await
            .unwrap();
        assert_eq!(response.status, 20);
        assert_eq!(response.meta, "text/plain");
        assert_eq!(response.body, b"2022-01-01 hi\n");
    }

    #[tokio::test]
    async fn test_ipv6_literal_host() {
        // Skip where the machine has no IPv6 loopback.
        let Ok(addr) = test_server::spawn(
            "[::1]:0",
            vec![("/twtxt.txt", b"20 text/plain\r\nhi\n".as_slice())],
        )
        .await
        else {
            return;
        };

        let client = GeminiClient::new(&FetchConfig::default()).unwrap();
        let url = format!("gemini://[::1]:{}/twtxt.txt", addr.port());
        let response = client.request(&url).await.unwrap();
        assert_eq!(response.status, 20);
        assert_eq!(response.body, b"hi\n");
    }

    #[test]
    fn test_server_name_for_ip_literals() {
        let v6 = Url::parse("gemini://[::1]:1965/twtxt.txt").unwrap();
        assert_eq!(
            server_name(&v6.host().unwrap()),
            Some(ServerName::from(IpAddr::V6(std::net::Ipv6Addr::LOCALHOST)))
        );

        let v4 = Url::parse("gemini://127.0.0.1/twtxt.txt").unwrap();
        assert_eq!(
            server_name(&v4.host().unwrap()),
            Some(ServerName::from(IpAddr::V4(std::net::Ipv4Addr::LOCALHOST)))
        );

        let domain = Url::parse("gemini://example.org/twtxt.txt").unwrap();
        assert!(matches!(
            server_name(&domain.host().unwrap()),
            Some(ServerName::DnsName(_))
        ));
    }
}
