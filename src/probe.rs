use std::fmt;
use std::net::{TcpStream, ToSocketAddrs as _};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::Context as _;
use chrono::{TimeZone, Utc};
use log::debug;
use rustls::client::{ServerCertVerified, ServerCertVerifier, WebPkiVerifier};
use rustls::{
    Certificate, ClientConfig, ClientConnection, OwnedTrustAnchor, RootCertStore, ServerName,
};
use x509_parser::parse_x509_certificate;

use crate::identity::ClientIdentity;
use crate::outcome::{PeerCertificate, ProbeOutcome};

/// Prober for one TLS endpoint
pub struct Prober {
    /// Bound on DNS lookup, connect and each handshake read/write
    pub timeout: Duration,
    /// Client certificate and key for mutual TLS
    pub identity: Option<ClientIdentity>,
}

impl fmt::Debug for Prober {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prober")
            .field("timeout", &self.timeout)
            .field("identity", &self.identity)
            .finish()
    }
}

impl Default for Prober {
    fn default() -> Prober {
        Prober {
            timeout: Duration::from_secs(10),
            identity: None,
        }
    }
}

impl Prober {
    /// Probe `host:port` once. Expected network and protocol failures land
    /// in the outcome, never in a panic or an `Err`.
    ///
    /// ```no_run
    /// # use tlc::Prober;
    /// let prober = Prober::default();
    /// let outcome = prober.probe("sha256.badssl.com", 443);
    /// ```
    pub fn probe(&self, host: &str, port: u16) -> ProbeOutcome {
        match self.do_probe(host, port) {
            Ok(outcome) => outcome,
            Err(e) => {
                debug!("probe of {host}:{port} failed: {e:#}");
                ProbeOutcome::failed(format!("{e:#}"))
            }
        }
    }

    fn do_probe(&self, host: &str, port: u16) -> anyhow::Result<ProbeOutcome> {
        let verifier = Arc::new(RecordingVerifier::new(root_store()));
        let config = self.client_config(verifier.clone())?;

        let server_name = ServerName::try_from(host).context("invalid server name")?;
        let mut conn = ClientConnection::new(Arc::new(config), server_name)
            .context("TLS client setup failed")?;

        let address = (host, port)
            .to_socket_addrs()
            .context("DNS lookup failed")?
            .next()
            .context("DNS lookup returned no address")?;
        debug!("connect to {address}");
        let mut stream =
            TcpStream::connect_timeout(&address, self.timeout).context("connection failed")?;
        stream
            .set_read_timeout(Some(self.timeout))
            .context("failed to set read timeout")?;
        stream
            .set_write_timeout(Some(self.timeout))
            .context("failed to set write timeout")?;

        while conn.is_handshaking() {
            conn.complete_io(&mut stream).context("TLS handshake failed")?;
        }
        debug!("handshake with {host}:{port} complete");

        let verify_error = verifier.take();
        if let Some(ref e) = verify_error {
            debug!("verification of {host}:{port} failed: {e}");
        }

        let mut raw_error = None;
        let peer_certificate = match parse_peer_certificate(&conn) {
            Ok(certificate) => Some(certificate),
            Err(e) => {
                debug!("peer certificate of {host}:{port} unusable: {e:#}");
                raw_error = Some(format!("{e:#}"));
                None
            }
        };

        conn.send_close_notify();
        let _ = conn.write_tls(&mut stream);

        Ok(ProbeOutcome {
            connected: true,
            verified: verify_error.is_none(),
            verify_detail: verify_error.map(|e| e.to_string()).unwrap_or_default(),
            raw_error,
            peer_certificate,
        })
    }

    fn client_config(&self, verifier: Arc<RecordingVerifier>) -> anyhow::Result<ClientConfig> {
        let builder = ClientConfig::builder()
            .with_safe_defaults()
            .with_custom_certificate_verifier(verifier);
        let config = match &self.identity {
            Some(identity) => builder
                .with_single_cert(identity.certificates.clone(), identity.key.clone())
                .context("invalid client certificate or key")?,
            None => builder.with_no_client_auth(),
        };
        Ok(config)
    }
}

fn root_store() -> RootCertStore {
    let mut root_store = RootCertStore::empty();
    root_store.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));
    root_store
}

fn parse_peer_certificate(conn: &ClientConnection) -> anyhow::Result<PeerCertificate> {
    let certificates = conn
        .peer_certificates()
        .context("no peer certificate presented")?;
    let leaf = certificates
        .first()
        .context("no peer certificate presented")?;

    let (_, certificate) = parse_x509_certificate(leaf.as_ref())
        .map_err(|e| anyhow::anyhow!("failed to parse peer certificate: {e}"))?;
    let subject_common_name = certificate
        .subject()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_string)
        .context("peer certificate has no subject CN")?;
    let not_after = Utc
        .timestamp_opt(certificate.validity().not_after.timestamp(), 0)
        .single()
        .context("peer certificate has an invalid expiration time")?;

    Ok(PeerCertificate {
        subject_common_name,
        not_after,
    })
}

/// Delegates to [`WebPkiVerifier`] but records a verification failure
/// instead of aborting the handshake, so the probe can separate "could not
/// connect" from "connected but the chain did not validate" and still
/// observe the peer certificate.
struct RecordingVerifier {
    inner: WebPkiVerifier,
    verify_error: Mutex<Option<rustls::Error>>,
}

impl RecordingVerifier {
    fn new(roots: RootCertStore) -> Self {
        RecordingVerifier {
            inner: WebPkiVerifier::new(roots, None),
            verify_error: Mutex::new(None),
        }
    }

    fn take(&self) -> Option<rustls::Error> {
        match self.verify_error.lock() {
            Ok(mut guard) => guard.take(),
            Err(_) => None,
        }
    }
}

impl ServerCertVerifier for RecordingVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &Certificate,
        intermediates: &[Certificate],
        server_name: &ServerName,
        scts: &mut dyn Iterator<Item = &[u8]>,
        ocsp_response: &[u8],
        now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            scts,
            ocsp_response,
            now,
        ) {
            Ok(verified) => Ok(verified),
            Err(e) => {
                if let Ok(mut guard) = self.verify_error.lock() {
                    *guard = Some(e);
                }
                Ok(ServerCertVerified::assertion())
            }
        }
    }
}
