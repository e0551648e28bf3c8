#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! TLS endpoint health check

pub use outcome::{PeerCertificate, ProbeOutcome, Report, Severity};
pub use probe::Prober;
pub use report::evaluate;
pub use validate::{bounded_uint, valid_hostname, valid_uint};

pub mod expiry;
pub mod identity;
mod outcome;
mod probe;
mod report;
mod validate;
