//! Minimal CLI parsing for configuration overrides.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::config::{Config, SearchBackend};

#[derive(Debug, Default, PartialEq)]
pub struct CliOptions {
    /// `.env` file loaded before reading the environment
    pub env_file: Option<PathBuf>,
    pub port: Option<u16>,
    pub backend: Option<SearchBackend>,
}

impl CliOptions {
    pub fn from_args() -> Result<Self> {
        Self::parse(env::args().skip(1))
    }

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
                None => (arg, None),
            };
            let mut value = || inline.clone().or_else(|| args.next());

            match flag.as_str() {
                "--env-file" => {
                    options.env_file = value().map(PathBuf::from);
                }
                "--port" => {
                    let port = value().context("--port needs a value")?;
                    options.port = Some(port.parse().context("Invalid --port")?);
                }
                "--backend" => {
                    let backend = value().context("--backend needs a value")?;
                    options.backend = Some(backend.parse()?);
                }
                _ => {}
            }
        }
        Ok(options)
    }

    /// Flags win over the environment
    pub fn apply(&self, config: &mut Config) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions> {
        CliOptions::parse(args.iter().map(|a| a.to_string()))
    }

    #[test]
    fn test_parse_flags() {
        let options = parse(&["--env-file", "prod.env", "--port=9090", "--backend", "memory"]).unwrap();
        assert_eq!(
            options,
            CliOptions {
                env_file: Some(PathBuf::from("prod.env")),
                port: Some(9090),
                backend: Some(SearchBackend::Memory),
            }
        );
    }

    #[test]
    fn test_unknown_flags_are_ignored() {
        assert_eq!(parse(&["--verbose"]).unwrap(), CliOptions::default());
    }

    #[test]
    fn test_bad_values() {
        assert!(parse(&["--port", "eighty"]).is_err());
        assert!(parse(&["--port"]).is_err());
        assert!(parse(&["--backend", "solr"]).is_err());
    }
}
