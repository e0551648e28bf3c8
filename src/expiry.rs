//! Expiration-window arithmetic on the peer leaf certificate.

use chrono::{DateTime, Duration, Utc};

use crate::outcome::{PeerCertificate, Report};

/// Classify the remaining validity window of a certificate against a
/// threshold in days.
///
/// A certificate whose expiry falls strictly within the window is reported
/// CRITICAL, matching the severity this check has always carried. Day counts
/// truncate toward zero.
pub fn check(certificate: &PeerCertificate, threshold_days: i64, now: DateTime<Utc>) -> Report {
    let cn = &certificate.subject_common_name;
    let not_after = certificate.not_after;
    let expires_on = not_after.to_rfc3339();
    if now > not_after {
        return Report::critical(format!("certificate '{cn}' is expired ({expires_on})"));
    }
    if now + Duration::days(threshold_days) > not_after {
        let days = (not_after - now).num_days();
        return Report::critical(format!(
            "certificate '{cn}' expires in {days} days ({expires_on})"
        ));
    }
    Report::ok(format!("certificate '{cn}' will expire on {expires_on}"))
}
