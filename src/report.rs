//! Combines the connector and expiration outcomes into the final report.

use chrono::{DateTime, Utc};

use crate::expiry;
use crate::outcome::{ProbeOutcome, Report, Severity};

/// Map a probe outcome to the single report of the run.
///
/// A failed handshake is final. With the expiration check disabled the
/// verification result is final. With it enabled, the expiration message
/// supersedes the verification message and the worse of the two severities
/// wins.
pub fn evaluate(
    host: &str,
    port: u16,
    outcome: &ProbeOutcome,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> Report {
    if !outcome.connected {
        let detail = outcome.raw_error.as_deref().unwrap_or("unknown error");
        return Report::critical(format!("connection to {host}:{port} failed: {detail}"));
    }

    if threshold_days == 0 {
        return if outcome.verified {
            Report::ok(format!("certificate of {host}:{port} verified"))
        } else {
            Report::warning(format!(
                "certificate verification of {host}:{port} failed: {}",
                outcome.verify_detail
            ))
        };
    }

    let verify_severity = if outcome.verified {
        Severity::Ok
    } else {
        Severity::Warning
    };
    match &outcome.peer_certificate {
        Some(certificate) => {
            let expiry = expiry::check(certificate, threshold_days, now);
            Report {
                severity: verify_severity.max(expiry.severity),
                message: expiry.message,
            }
        }
        None => Report::critical(format!("unable to parse peer certificate of {host}:{port}")),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    use chrono::Duration;

    use crate::outcome::PeerCertificate;

    fn verified_outcome(not_after: DateTime<Utc>) -> ProbeOutcome {
        ProbeOutcome {
            connected: true,
            verified: true,
            peer_certificate: Some(PeerCertificate {
                subject_common_name: "example.com".to_string(),
                not_after,
            }),
            ..Default::default()
        }
    }

    fn unverified_outcome(not_after: DateTime<Utc>) -> ProbeOutcome {
        ProbeOutcome {
            verified: false,
            verify_detail: "invalid peer certificate: UnknownIssuer".to_string(),
            ..verified_outcome(not_after)
        }
    }

    #[test]
    fn t_connection_failure_is_final() {
        let outcome = ProbeOutcome::failed("connection refused");
        for threshold in [0, 15] {
            let report = evaluate("example.com", 443, &outcome, threshold, Utc::now());
            assert_eq!(Severity::Critical, report.severity);
            assert!(report
                .message
                .contains("connection to example.com:443 failed"));
            assert!(report.message.contains("connection refused"));
        }
    }

    #[test]
    fn t_verified_without_expiry_check() {
        let outcome = verified_outcome(Utc::now() + Duration::days(90));
        let report = evaluate("example.com", 443, &outcome, 0, Utc::now());
        assert_eq!(Severity::Ok, report.severity);
        assert_eq!("certificate of example.com:443 verified", report.message);
    }

    #[test]
    fn t_unverified_without_expiry_check() {
        let outcome = unverified_outcome(Utc::now() + Duration::days(90));
        let report = evaluate("example.com", 443, &outcome, 0, Utc::now());
        assert_eq!(Severity::Warning, report.severity);
        assert!(report
            .message
            .contains("certificate verification of example.com:443 failed"));
        assert!(report.message.contains("UnknownIssuer"));
    }

    #[test]
    fn t_expiry_message_supersedes() {
        let now = Utc::now();
        let outcome = verified_outcome(now + Duration::days(90));
        let report = evaluate("example.com", 443, &outcome, 15, now);
        assert_eq!(Severity::Ok, report.severity);
        assert!(report.message.contains("will expire on"));
    }

    #[test]
    fn t_expiry_within_threshold_wins() {
        let now = Utc::now();
        let outcome = verified_outcome(now + Duration::days(10));
        let report = evaluate("example.com", 443, &outcome, 15, now);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report.message.contains("expires in 10 days"));
    }

    #[test]
    fn t_most_severe_wins() {
        // verification warning carries over even when the expiry check is ok
        let now = Utc::now();
        let outcome = unverified_outcome(now + Duration::days(90));
        let report = evaluate("example.com", 443, &outcome, 15, now);
        assert_eq!(Severity::Warning, report.severity);
        assert!(report.message.contains("will expire on"));
    }

    #[test]
    fn t_unparsable_certificate() {
        let mut outcome = verified_outcome(Utc::now());
        outcome.peer_certificate = None;
        let report = evaluate("example.com", 443, &outcome, 15, Utc::now());
        assert_eq!(Severity::Critical, report.severity);
        assert!(report
            .message
            .contains("unable to parse peer certificate of example.com:443"));
    }
}
