//! # TLS Handshake with Certificate Capture
//!
//! rustls validates the server chain inside the handshake. To report which
//! certificate a server offered even when validation fails, a wrapping
//! verifier records the end-entity certificate, consults the observer, and
//! only then delegates to the standard WebPKI verifier.

use std::fmt;
use std::io;
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, RootCertStore, SignatureScheme, StreamOwned};

use crate::error::FetchError;
use crate::observer::FetchObserver;

/// An established TLS session over TCP.
pub type TlsStream = StreamOwned<ClientConnection, TcpStream>;

type CapturedCertificate = Arc<Mutex<Option<CertificateDer<'static>>>>;

/// Trust anchors from the Mozilla root program.
pub fn default_root_store() -> Arc<RootCertStore> {
    Arc::new(RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    })
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

struct CapturingVerifier {
    host: String,
    inner: Arc<WebPkiServerVerifier>,
    observer: Option<Arc<dyn FetchObserver>>,
    captured: CapturedCertificate,
}

impl fmt::Debug for CapturingVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturingVerifier")
            .field("host", &self.host)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl ServerCertVerifier for CapturingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        *self.captured.lock() = Some(end_entity.clone().into_owned());

        if let Some(observer) = &self.observer {
            observer
                .on_certificate(&self.host, end_entity)
                .map_err(rustls::Error::General)?;
        }

        self.inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

fn config_error(host: &str, reason: impl fmt::Display) -> FetchError {
    FetchError::Tls {
        host: host.to_owned(),
        reason: reason.to_string(),
        certificate: None,
    }
}

/// Map a failed handshake step to a fetch error.
///
/// A timeout after the server presented its certificate is still reported
/// as a TLS failure so the certificate is not lost.
fn handshake_failed(host: &str, error: io::Error, certificate: Option<CertificateDer<'static>>) -> FetchError {
    let timed_out = matches!(error.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut);
    tracing::debug!(%host, %error, has_certificate = certificate.is_some(), "TLS handshake failed");
    match certificate {
        None if timed_out => FetchError::Timeout(host.to_owned()),
        certificate => FetchError::Tls {
            host: host.to_owned(),
            reason: if timed_out {
                "timed out after the certificate was presented".to_owned()
            } else {
                error.to_string()
            },
            certificate,
        },
    }
}

/// Complete a TLS handshake with `host` over `tcp` before `deadline`.
///
/// Returns the session and the server's end-entity certificate. On failure
/// the error still carries the certificate if the server presented one.
/// Socket waits are capped by the time left until `deadline`.
pub fn handshake(
    tcp: TcpStream,
    host: &str,
    roots: Arc<RootCertStore>,
    observer: Option<Arc<dyn FetchObserver>>,
    deadline: Instant,
) -> Result<(TlsStream, Option<CertificateDer<'static>>), FetchError> {
    let provider = provider();
    let inner = WebPkiServerVerifier::builder_with_provider(roots, Arc::clone(&provider))
        .build()
        .map_err(|e| config_error(host, e))?;

    let captured: CapturedCertificate = Arc::new(Mutex::new(None));
    let verifier = Arc::new(CapturingVerifier {
        host: host.to_owned(),
        inner,
        observer,
        captured: Arc::clone(&captured),
    });

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| config_error(host, e))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let server_name = ServerName::try_from(bare.to_owned()).map_err(|e| config_error(host, e))?;
    let mut conn =
        ClientConnection::new(Arc::new(config), server_name).map_err(|e| config_error(host, e))?;

    let mut tcp = tcp;
    let read_wait = tcp.read_timeout().ok().flatten();
    while conn.is_handshaking() {
        let Some(remaining) = deadline
            .checked_duration_since(Instant::now())
            .filter(|d| !d.is_zero())
        else {
            let certificate = captured.lock().take();
            return Err(handshake_failed(host, io::ErrorKind::TimedOut.into(), certificate));
        };
        let wait = read_wait.map_or(remaining, |w| w.min(remaining));
        let step = tcp
            .set_read_timeout(Some(wait))
            .and_then(|()| tcp.set_write_timeout(Some(wait)));
        if let Err(e) = step.and_then(|()| conn.complete_io(&mut tcp).map(drop)) {
            let certificate = captured.lock().take();
            return Err(handshake_failed(host, e, certificate));
        }
    }

    let certificate = captured.lock().take();
    Ok((StreamOwned::new(conn, tcp), certificate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread::JoinHandle;
    use std::time::Duration;

    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use rustls::{ServerConfig, ServerConnection};

    /// Self-signed certificate for `localhost`, unknown to the webpki roots.
    const CERT: &[u8] = include_bytes!("../testdata/localhost.cert.der");
    const KEY: &[u8] = include_bytes!("../testdata/localhost.key.der");

    struct Refuse;

    impl FetchObserver for Refuse {
        fn on_certificate(&self, _: &str, _: &CertificateDer<'_>) -> Result<(), String> {
            Err("not today".into())
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl FetchObserver for Recorder {
        fn on_certificate(&self, host: &str, certificate: &CertificateDer<'_>) -> Result<(), String> {
            self.seen.lock().push((host.to_owned(), certificate.to_vec()));
            Ok(())
        }
    }

    fn soon() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    /// Accept one connection and run the server side of a handshake with the fixture certificate.
    fn serve_tls_once() -> (SocketAddr, JoinHandle<()>) {
        let config = ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![CertificateDer::from(CERT.to_vec())],
                PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(KEY.to_vec())),
            )
            .unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            sock.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let mut conn = ServerConnection::new(Arc::new(config)).unwrap();
            while conn.is_handshaking() {
                if conn.complete_io(&mut sock).is_err() {
                    break;
                }
            }
        });
        (addr, handle)
    }

    #[test]
    fn root_store_is_populated() {
        assert!(!default_root_store().is_empty());
    }

    #[test]
    fn plaintext_peer_fails_the_handshake_without_a_certificate() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 512];
            let _ = sock.read(&mut buf);
            let _ = sock.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n");
        });

        let tcp = TcpStream::connect(addr).unwrap();
        let err = handshake(tcp, "localhost", default_root_store(), Some(Arc::new(Refuse)), soon())
            .unwrap_err();
        assert!(matches!(err, FetchError::Tls { certificate: None, .. }), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn untrusted_certificate_is_reported_with_the_failure() {
        let (addr, server) = serve_tls_once();
        let recorder = Arc::new(Recorder::default());
        let observer = Arc::clone(&recorder) as Arc<dyn FetchObserver>;

        let tcp = TcpStream::connect(addr).unwrap();
        let err = handshake(tcp, "localhost", default_root_store(), Some(observer), soon())
            .unwrap_err();
        match &err {
            FetchError::Tls {
                certificate: Some(c), ..
            } => assert_eq!(c.as_ref(), CERT),
            other => panic!("expected a TLS failure with certificate, got {other:?}"),
        }
        assert_eq!(
            recorder.seen.lock().as_slice(),
            [("localhost".to_owned(), CERT.to_vec())]
        );
        server.join().unwrap();
    }

    #[test]
    fn observer_veto_aborts_with_its_reason() {
        let (addr, server) = serve_tls_once();

        let tcp = TcpStream::connect(addr).unwrap();
        let err = handshake(tcp, "localhost", default_root_store(), Some(Arc::new(Refuse)), soon())
            .unwrap_err();
        match &err {
            FetchError::Tls { reason, certificate, .. } => {
                assert!(reason.contains("not today"), "{reason}");
                assert_eq!(certificate.as_ref().map(|c| c.as_ref()), Some(CERT));
            }
            other => panic!("expected a TLS failure, got {other:?}"),
        }
        server.join().unwrap();
    }

    #[test]
    fn silent_server_is_bounded_by_the_deadline() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (sock, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_millis(1_500));
            drop(sock);
        });

        let tcp = TcpStream::connect(addr).unwrap();
        let started = Instant::now();
        let deadline = started + Duration::from_millis(200);
        let err = handshake(tcp, "localhost", default_root_store(), None, deadline).unwrap_err();
        assert!(matches!(err, FetchError::Timeout(ref h) if h == "localhost"), "{err:?}");
        assert!(started.elapsed() < Duration::from_millis(1_000));
        server.join().unwrap();
    }

    #[test]
    fn timeout_after_certificate_keeps_it() {
        let timed_out = || io::Error::from(io::ErrorKind::TimedOut);
        let cert = CertificateDer::from(CERT.to_vec());

        let err = handshake_failed("caller.example", timed_out(), Some(cert));
        assert_eq!(err.certificate().map(|c| c.as_ref()), Some(CERT));
        assert!(matches!(err, FetchError::Tls { .. }));

        let err = handshake_failed("caller.example", timed_out(), None);
        assert!(matches!(err, FetchError::Timeout(_)));
    }

    #[test]
    fn verifier_debug_hides_internals() {
        let verifier = CapturingVerifier {
            host: "caller.example".into(),
            inner: WebPkiServerVerifier::builder_with_provider(default_root_store(), provider())
                .build()
                .unwrap(),
            observer: None,
            captured: Arc::default(),
        };
        let shown = format!("{verifier:?}");
        assert!(shown.contains("caller.example"));
        assert!(!verifier.supported_verify_schemes().is_empty());
    }
}
