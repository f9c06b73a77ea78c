use std::env;
use std::fs;

use tracing::debug;

use crate::error::{Error, Result};

const HOSTNAME_ENV: &str = "HOSTNAME";
const HOSTNAME_FILE: &str = "/etc/hostname";

/// Shard ordinal of this process, taken from the suffix of its hostname
/// (`argocd-application-controller-2` is shard 2).
pub fn infer_shard() -> Result<u32> {
    infer_shard_with(current_hostname)
}

/// Same as [`infer_shard`] with the hostname supplied by `hostname`.
pub fn infer_shard_with<F>(hostname: F) -> Result<u32>
where
    F: FnOnce() -> Result<String>,
{
    let hostname = hostname()?;
    let shard = infer_shard_from_hostname(&hostname)?;
    debug!(hostname, shard, "inferred shard from hostname");
    Ok(shard)
}

/// Parse the numeric suffix after the last `-` of `hostname`.
pub fn infer_shard_from_hostname(hostname: &str) -> Result<u32> {
    let hostname = hostname.trim();
    let (_, ordinal) = hostname
        .rsplit_once('-')
        .ok_or_else(|| Error::MissingOrdinal(hostname.to_string()))?;

    ordinal.parse().map_err(|_| Error::InvalidOrdinal {
        hostname: hostname.to_string(),
        ordinal: ordinal.to_string(),
    })
}

/// `$HOSTNAME` if set and non-empty, otherwise the contents of `/etc/hostname`.
pub fn current_hostname() -> Result<String> {
    if let Ok(hostname) = env::var(HOSTNAME_ENV) {
        if !hostname.trim().is_empty() {
            return Ok(hostname.trim().to_string());
        }
    }

    let hostname = fs::read_to_string(HOSTNAME_FILE)
        .map_err(|e| Error::HostnameUnavailable(format!("{HOSTNAME_FILE}: {e}")))?;
    let hostname = hostname.trim();
    if hostname.is_empty() {
        return Err(Error::HostnameUnavailable(format!("{HOSTNAME_FILE} is empty")));
    }
    Ok(hostname.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("argocd-application-controller-2", 2)]
    #[case("argocd-application-controller-0", 0)]
    #[case("controller-17", 17)]
    #[case("controller-3\n", 3)]
    fn test_valid_hostnames(#[case] hostname: &str, #[case] expected: u32) {
        assert_eq!(infer_shard_from_hostname(hostname).unwrap(), expected);
    }

    #[test]
    fn hostname_without_dash_is_rejected() {
        assert!(matches!(
            infer_shard_from_hostname("controller"),
            Err(Error::MissingOrdinal(hostname)) if hostname == "controller"
        ));
    }

    #[rstest]
    #[case("controller-abc", "abc")]
    #[case("controller-", "")]
    #[case("controller-1.5", "1.5")]
    #[case("controller-1x", "1x")]
    fn test_invalid_ordinals(#[case] hostname: &str, #[case] expected: &str) {
        match infer_shard_from_hostname(hostname) {
            Err(Error::InvalidOrdinal { ordinal, .. }) => assert_eq!(ordinal, expected),
            other => panic!("expected an invalid ordinal, got {other:?}"),
        }
    }

    #[test]
    fn only_the_last_dash_counts() {
        assert_eq!(infer_shard_from_hostname("controller--1").unwrap(), 1);
        assert_eq!(infer_shard_from_hostname("a-1-b-2").unwrap(), 2);
    }

    #[test]
    fn hostname_source_errors_propagate() {
        let result = infer_shard_with(|| Err(Error::HostnameUnavailable("no hostname".into())));
        assert!(matches!(result, Err(Error::HostnameUnavailable(_))));

        assert_eq!(infer_shard_with(|| Ok("app-controller-4".into())).unwrap(), 4);
    }
}
