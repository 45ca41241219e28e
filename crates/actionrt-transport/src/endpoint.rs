use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::TransportError;

/// Host used for TCP endpoints built from a bare port.
pub const DEFAULT_TCP_HOST: &str = "127.0.0.1";

/// Prefix of generated local socket names.
pub const IPC_NAME_PREFIX: &str = "actionrt-";

const TCP_SCHEME: &str = "tcp://";
const IPC_SCHEME: &str = "ipc://";

/// Address a socket binds to or connects to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// `tcp://host:port`
    Tcp { host: String, port: u16 },
    /// `ipc:///path/to.sock` (filesystem Unix domain socket)
    Ipc(PathBuf),
    /// `ipc://@name` (Linux abstract namespace socket)
    Abstract(String),
}

impl Endpoint {
    /// TCP endpoint on the loopback interface.
    pub fn tcp_local(port: u16) -> Self {
        Endpoint::Tcp {
            host: DEFAULT_TCP_HOST.to_string(),
            port,
        }
    }

    /// IPC endpoint from a socket name; a leading `@` selects the abstract namespace.
    pub fn ipc(name: &str) -> Result<Self, TransportError> {
        format!("{IPC_SCHEME}{name}").parse()
    }

    /// Default local endpoint derived from component identity parts.
    pub fn default_ipc<S: AsRef<str>>(parts: &[S]) -> Self {
        Endpoint::Abstract(ipc_name(parts))
    }

    /// URI scheme of the endpoint.
    pub fn scheme(&self) -> &'static str {
        match self {
            Endpoint::Tcp { .. } => "tcp",
            Endpoint::Ipc(_) | Endpoint::Abstract(_) => "ipc",
        }
    }
}

/// Build a local socket name from identity parts.
///
/// Parts are joined with `-`, every run of non-alphanumeric characters is
/// collapsed into a single `-`, and the result is prefixed with
/// [`IPC_NAME_PREFIX`].
pub fn ipc_name<S: AsRef<str>>(parts: &[S]) -> String {
    let mut name = String::from(IPC_NAME_PREFIX);
    let mut in_separator_run = false;
    let joined = parts
        .iter()
        .map(|part| part.as_ref())
        .collect::<Vec<&str>>()
        .join("-");

    for ch in joined.chars() {
        if ch.is_ascii_alphanumeric() {
            name.push(ch);
            in_separator_run = false;
        } else if !in_separator_run {
            name.push('-');
            in_separator_run = true;
        }
    }
    name
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TransportError::InvalidEndpoint(s.to_string());

        if let Some(rest) = s.strip_prefix(TCP_SCHEME) {
            let (host, port) = rest.rsplit_once(':').ok_or_else(invalid)?;
            let host = host
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host);
            if host.is_empty() {
                return Err(invalid());
            }
            let port = port.parse::<u16>().map_err(|_| invalid())?;
            return Ok(Endpoint::Tcp {
                host: host.to_string(),
                port,
            });
        }

        if let Some(rest) = s.strip_prefix(IPC_SCHEME) {
            if let Some(name) = rest.strip_prefix('@') {
                if name.is_empty() {
                    return Err(invalid());
                }
                return Ok(Endpoint::Abstract(name.to_string()));
            }
            if rest.is_empty() {
                return Err(invalid());
            }
            return Ok(Endpoint::Ipc(PathBuf::from(rest)));
        }

        Err(invalid())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => {
                write!(f, "{TCP_SCHEME}[{host}]:{port}")
            }
            Endpoint::Tcp { host, port } => write!(f, "{TCP_SCHEME}{host}:{port}"),
            Endpoint::Ipc(path) => write!(f, "{IPC_SCHEME}{}", path.display()),
            Endpoint::Abstract(name) => write!(f, "{IPC_SCHEME}@{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tcp_endpoints() {
        let endpoint: Endpoint = "tcp://127.0.0.1:5010".parse().unwrap();
        assert_eq!(endpoint, Endpoint::tcp_local(5010));

        let v6: Endpoint = "tcp://[::1]:80".parse().unwrap();
        assert_eq!(
            v6,
            Endpoint::Tcp {
                host: "::1".to_string(),
                port: 80
            }
        );
        assert_eq!(v6.to_string(), "tcp://[::1]:80");
    }

    #[test]
    fn parses_ipc_endpoints() {
        let path: Endpoint = "ipc:///tmp/users.sock".parse().unwrap();
        assert_eq!(path, Endpoint::Ipc(PathBuf::from("/tmp/users.sock")));

        let abstract_name: Endpoint = "ipc://@users".parse().unwrap();
        assert_eq!(abstract_name, Endpoint::Abstract("users".to_string()));
        assert_eq!(abstract_name.to_string(), "ipc://@users");
    }

    #[test]
    fn rejects_malformed_endpoints() {
        for input in [
            "udp://127.0.0.1:1",
            "tcp://127.0.0.1",
            "tcp://:80",
            "tcp://host:99999",
            "ipc://",
            "ipc://@",
            "users.sock",
        ] {
            assert!(
                matches!(
                    input.parse::<Endpoint>(),
                    Err(TransportError::InvalidEndpoint(_))
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn ipc_name_collapses_non_alphanumeric_runs() {
        assert_eq!(
            ipc_name(&["service", "users", "1.0.0"]),
            "actionrt-service-users-1-0-0"
        );
        assert_eq!(
            ipc_name(&["middleware", "auth  gateway", "2.1.0-beta+3"]),
            "actionrt-middleware-auth-gateway-2-1-0-beta-3"
        );
    }

    #[test]
    fn default_ipc_is_deterministic_abstract_endpoint() {
        let first = Endpoint::default_ipc(&["service", "users", "1.0.0"]);
        let second = Endpoint::default_ipc(&["service", "users", "1.0.0"]);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "ipc://@actionrt-service-users-1-0-0");
    }

    #[test]
    fn ipc_constructor_honors_abstract_prefix() {
        assert_eq!(
            Endpoint::ipc("@users").unwrap(),
            Endpoint::Abstract("users".to_string())
        );
        assert_eq!(
            Endpoint::ipc("/run/users.sock").unwrap(),
            Endpoint::Ipc(PathBuf::from("/run/users.sock"))
        );
    }
}
