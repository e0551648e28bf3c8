use std::fmt;

use chrono::{DateTime, Utc};

/// Probe severity in the three-level monitoring convention
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Everything checked out
    Ok,
    /// Alerting but the service still works
    Warning,
    /// The service is considered down or misconfigured
    Critical,
}

impl Severity {
    /// Exit code consumed by the monitoring scheduler
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Fields of the peer leaf certificate the probe cares about
#[derive(Clone, Debug)]
pub struct PeerCertificate {
    /// Subject common name
    pub subject_common_name: String,
    /// Expiration time
    pub not_after: DateTime<Utc>,
}

/// Outcome of a single TLS probe, created once per invocation
#[derive(Debug, Default)]
pub struct ProbeOutcome {
    /// Did the handshake itself complete?
    pub connected: bool,
    /// Did the peer certificate chain validate against the trusted roots?
    pub verified: bool,
    /// Diagnostic reported by the verifier when `verified` is false
    pub verify_detail: String,
    /// Last transport or protocol diagnostic, if any
    pub raw_error: Option<String>,
    /// Peer leaf certificate, if the handshake reached that stage
    pub peer_certificate: Option<PeerCertificate>,
}

impl ProbeOutcome {
    /// The probe never reached a verify result
    ///
    /// ```
    /// # use tlc::ProbeOutcome;
    /// ProbeOutcome::failed("connection refused");
    /// ```
    pub fn failed<T>(e: T) -> Self
    where
        T: fmt::Display,
    {
        ProbeOutcome {
            raw_error: Some(e.to_string()),
            ..Default::default()
        }
    }
}

/// The sole output artifact of a run
#[derive(Clone, Debug)]
pub struct Report {
    /// Final severity
    pub severity: Severity,
    /// One-line human-readable message
    pub message: String,
}

impl Report {
    /// Report with [`Severity::Ok`]
    pub fn ok<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        Report {
            severity: Severity::Ok,
            message: message.into(),
        }
    }

    /// Report with [`Severity::Warning`]
    pub fn warning<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        Report {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    /// Report with [`Severity::Critical`]
    pub fn critical<T>(message: T) -> Self
    where
        T: Into<String>,
    {
        Report {
            severity: Severity::Critical,
            message: message.into(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}
