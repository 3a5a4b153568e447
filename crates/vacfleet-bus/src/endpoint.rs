//! Broker endpoint parsing.

use std::str::FromStr;

use crate::BusError;

/// Default broker port when the endpoint names none.
pub const DEFAULT_PORT: u16 = 1883;

/// A broker endpoint, `mqtt://host[:port]` with the scheme optional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl FromStr for Endpoint {
    type Err = BusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let rest = match value.split_once("://") {
            Some(("mqtt" | "tcp", rest)) => rest,
            Some((scheme, _)) => {
                return Err(BusError::InvalidEndpoint(format!(
                    "unsupported scheme {scheme:?} in {value:?}"
                )))
            }
            None => value,
        };

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    BusError::InvalidEndpoint(format!("bad port in {value:?}"))
                })?;
                (host, port)
            }
            None => (rest, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(BusError::InvalidEndpoint(format!("empty host in {value:?}")));
        }

        Ok(Self::new(host, port))
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mqtt://{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_host() {
        let endpoint: Endpoint = "nuc1".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new("nuc1", DEFAULT_PORT));
    }

    #[test]
    fn test_parse_scheme_and_port() {
        let endpoint: Endpoint = "mqtt://broker.lan:2883".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new("broker.lan", 2883));

        let endpoint: Endpoint = "tcp://broker.lan".parse().unwrap();
        assert_eq!(endpoint, Endpoint::new("broker.lan", DEFAULT_PORT));
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!("ws://broker".parse::<Endpoint>().is_err());
        assert!("mqtt://broker:notaport".parse::<Endpoint>().is_err());
        assert!("mqtt://".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let endpoint: Endpoint = "mqtt://nuc1:1883".parse().unwrap();
        assert_eq!(endpoint.to_string(), "mqtt://nuc1:1883");
        assert_eq!(endpoint.to_string().parse::<Endpoint>().unwrap(), endpoint);
    }
}
