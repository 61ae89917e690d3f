//! Hostname heuristics deciding whether a host is the authoritative server.

/// Substring marking a hostname as a configuration-management server.
pub const SERVER_MARKER: &str = "chef";

/// Whether `hostname` looks like the server.
pub fn looks_like_server(hostname: &str) -> bool {
    hostname.contains(SERVER_MARKER)
}

/// First label of a dotted hostname: `chef01.example.com` → `chef01`.
pub fn short_hostname(hostname: &str) -> &str {
    hostname.split('.').next().unwrap_or(hostname)
}

/// Hostname of the machine running this process.
pub fn local_hostname() -> String {
    whoami::fallible::hostname().unwrap_or_else(|err| {
        tracing::debug!("could not determine local hostname: {err}");
        "unknown".to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("chef02", true)]
    #[case("chef01.example.com", true)]
    #[case("ci02", false)]
    #[case("", false)]
    fn server_detection(#[case] hostname: &str, #[case] expected: bool) {
        assert_eq!(looks_like_server(hostname), expected);
    }

    #[test]
    fn short_hostname_drops_domain() {
        assert_eq!(short_hostname("chef01.example.com"), "chef01");
        assert_eq!(short_hostname("ci02"), "ci02");
        assert_eq!(short_hostname(""), "");
    }

    #[test]
    fn local_hostname_is_never_empty() {
        assert!(!local_hostname().is_empty());
    }
}
