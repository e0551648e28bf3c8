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

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use chrono::Utc;
use clap::error::ErrorKind;
use clap::Parser;
use log::debug;

use tlc::{
    bounded_uint, evaluate, identity, valid_hostname, Prober, Report, Severity,
};

/// Argument parser
#[derive(Debug, Parser)]
#[command(author, about, version)]
struct Opts {
    /// Target hostname, an IPv4 literal or fully qualified domain name
    #[arg(short = 'H', long)]
    hostname: String,
    /// Client certificate file (PEM) for mutual TLS
    #[arg(short = 'c', long)]
    client_cert: Option<PathBuf>,
    /// Client private key file (PEM)
    #[arg(short = 'k', long)]
    client_key: Option<PathBuf>,
    /// Passphrase of the client private key
    #[arg(short = 'P', long, env = "TLC_KEY_PASSPHRASE")]
    key_passphrase: Option<String>,
    /// Target port
    #[arg(short = 'p', long, default_value = "443")]
    port: String,
    /// Expiration warning threshold in days, 0 to disable the check
    #[arg(short = 'e', long, default_value = "0")]
    expire_days: String,
    /// Network timeout in seconds
    #[arg(short = 't', long, default_value = "10")]
    timeout: String,
}

fn main() {
    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            process::exit(Severity::Ok.exit_code());
        }
        Err(e) => {
            let detail = e.to_string();
            let first_line = detail.lines().next().unwrap_or("invalid arguments");
            exit_with(Report::warning(first_line));
        }
    };

    pretty_env_logger::init();

    exit_with(run(&opts))
}

fn exit_with(report: Report) -> ! {
    println!("{report}");
    process::exit(report.severity.exit_code())
}

fn run(opts: &Opts) -> Report {
    if !valid_hostname(&opts.hostname) {
        return Report::critical(format!("invalid hostname '{}'", opts.hostname));
    }
    let port = match bounded_uint(&opts.port, Some(1), Some(65535)) {
        Some(port) => port as u16,
        None => return Report::critical(format!("invalid port '{}'", opts.port)),
    };
    let threshold_days = match bounded_uint(&opts.expire_days, Some(0), Some(3650)) {
        Some(days) => days as i64,
        None => {
            return Report::critical(format!(
                "invalid expiration threshold '{}'",
                opts.expire_days
            ))
        }
    };
    let timeout = match bounded_uint(&opts.timeout, Some(1), Some(3600)) {
        Some(seconds) => Duration::from_secs(seconds),
        None => return Report::critical(format!("invalid timeout '{}'", opts.timeout)),
    };

    let identity = match (&opts.client_cert, &opts.client_key) {
        (Some(certificate), Some(key)) => {
            match identity::load(certificate, key, opts.key_passphrase.as_deref()) {
                Ok(identity) => Some(identity),
                Err(e) => return Report::critical(format!("{e:#}")),
            }
        }
        (Some(_), None) => {
            return Report::critical("client certificate given without client key")
        }
        (None, Some(_)) => {
            return Report::critical("client key given without client certificate")
        }
        (None, None) => None,
    };

    let prober = Prober { timeout, identity };
    debug!("{prober:?}");
    let outcome = prober.probe(&opts.hostname, port);
    debug!("{outcome:?}");
    evaluate(&opts.hostname, port, &outcome, threshold_days, Utc::now())
}

#[cfg(test)]
mod test {
    use super::*;

    fn build_opts(args: &[&str]) -> Opts {
        let argv = std::iter::once("tlc").chain(args.iter().copied());
        Opts::try_parse_from(argv).unwrap()
    }

    #[test]
    fn t_defaults() {
        let opts = build_opts(&["-H", "example.com"]);
        assert_eq!("example.com", opts.hostname);
        assert_eq!("443", opts.port);
        assert_eq!("0", opts.expire_days);
        assert_eq!("10", opts.timeout);
        assert!(opts.client_cert.is_none());
        assert!(opts.client_key.is_none());
    }

    #[test]
    fn t_unknown_flag() {
        let e = Opts::try_parse_from(["tlc", "-H", "example.com", "-x"]).unwrap_err();
        assert!(!matches!(
            e.kind(),
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
        ));
    }

    #[test]
    fn t_invalid_hostname() {
        let opts = build_opts(&["-H", "not a hostname"]);
        let report = run(&opts);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report.message.contains("invalid hostname"));
    }

    #[test]
    fn t_invalid_port() {
        let opts = build_opts(&["-H", "example.com", "-p", "65536"]);
        let report = run(&opts);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report.message.contains("invalid port"));
    }

    #[test]
    fn t_invalid_threshold() {
        let opts = build_opts(&["-H", "example.com", "-e", "1.5"]);
        let report = run(&opts);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report.message.contains("invalid expiration threshold"));
    }

    #[test]
    fn t_certificate_without_key() {
        let opts = build_opts(&["-H", "example.com", "-c", "client.pem"]);
        let report = run(&opts);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report
            .message
            .contains("client certificate given without client key"));
    }

    #[test]
    fn t_key_without_certificate() {
        let opts = build_opts(&["-H", "example.com", "-k", "client.key"]);
        let report = run(&opts);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report
            .message
            .contains("client key given without client certificate"));
    }

    #[test]
    fn t_missing_identity_files() {
        let opts = build_opts(&[
            "-H",
            "example.com",
            "-c",
            "/nonexistent/client.pem",
            "-k",
            "/nonexistent/client.key",
        ]);
        let report = run(&opts);
        assert_eq!(Severity::Critical, report.severity);
        assert!(report.message.contains("failed to open client certificate"));
    }
}
