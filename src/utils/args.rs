//! Command-line helpers shared by the binary and its tests.

use std::ffi::OsString;
use std::net::Ipv4Addr;

use crate::utils::error::{AppError, AppResult};

/// Long option names that may also be written with a single dash,
/// e.g. `-sport 443` or `-from=10.0.0.5`.
pub const LONG_FLAGS: &[&str] = &[
    "from",
    "to",
    "sport",
    "dport",
    "syn",
    "ack",
    "fin",
    "psh",
    "rst",
    "urg",
    "interface",
    "list-interfaces",
    "snaplen",
    "no-promisc",
    "timeout",
    "read",
    "count",
    "json",
    "color",
    "log-level",
    "help",
    "version",
];

/// Rewrite single-dash long options (`-syn`) to their double-dash form
/// (`--syn`) so clap can parse them. Short options such as `-i` and
/// everything after a bare `--` are passed through untouched.
pub fn normalize_args<I, S>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut passthrough = false;

    args.into_iter()
        .map(Into::into)
        .enumerate()
        .map(|(index, arg)| {
            // argv[0] is the program name
            if index == 0 || passthrough {
                return arg;
            }
            let Some(text) = arg.to_str() else {
                return arg;
            };
            if text == "--" {
                passthrough = true;
                return arg;
            }
            match text.strip_prefix('-') {
                Some(rest) if !rest.starts_with('-') && rest.len() > 1 => {
                    let name = rest.split('=').next().unwrap_or(rest);
                    if LONG_FLAGS.contains(&name) {
                        OsString::from(format!("-{text}"))
                    } else {
                        arg
                    }
                }
                _ => arg,
            }
        })
        .collect()
}

/// Parse an address filter argument. An empty string means "unset".
pub fn parse_address(value: &str) -> AppResult<Option<Ipv4Addr>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<Ipv4Addr>()
        .map(Some)
        .map_err(|_| AppError::InvalidAddress(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(args: &[&str]) -> Vec<String> {
        normalize_args(args.iter().copied())
            .into_iter()
            .map(|arg| arg.into_string().unwrap())
            .collect()
    }

    #[test]
    fn single_dash_long_flags_get_a_second_dash() {
        assert_eq!(
            normalized(&["tcp-capture", "-from", "10.0.0.5", "-dport=443", "-syn"]),
            vec!["tcp-capture", "--from", "10.0.0.5", "--dport=443", "--syn"]
        );
    }

    #[test]
    fn short_and_double_dash_options_are_untouched() {
        assert_eq!(
            normalized(&["tcp-capture", "-i", "eth0", "--rst", "-c", "5"]),
            vec!["tcp-capture", "-i", "eth0", "--rst", "-c", "5"]
        );
    }

    #[test]
    fn unknown_words_and_values_are_untouched() {
        assert_eq!(
            normalized(&["tcp-capture", "-xyz", "-to", "-"]),
            vec!["tcp-capture", "-xyz", "--to", "-"]
        );
    }

    #[test]
    fn nothing_after_double_dash_is_rewritten() {
        assert_eq!(
            normalized(&["tcp-capture", "--", "-syn"]),
            vec!["tcp-capture", "--", "-syn"]
        );
    }

    #[test]
    fn program_name_is_never_rewritten() {
        assert_eq!(normalized(&["-syn"]), vec!["-syn"]);
    }

    #[test]
    fn empty_address_means_unset() {
        assert_eq!(parse_address("").unwrap(), None);
        assert_eq!(parse_address("  ").unwrap(), None);
    }

    #[test]
    fn dotted_quad_parses() {
        assert_eq!(
            parse_address("10.0.0.1").unwrap(),
            Some(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn garbage_address_is_rejected() {
        let err = parse_address("localhost").unwrap_err();
        assert!(matches!(err, AppError::InvalidAddress(ref a) if a == "localhost"));
        assert!(parse_address("::1").is_err());
    }
}
