pub mod profiles;

use dotenvy::dotenv;
use profiles::{Profile, ProfileDefaults};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub gateway_url: String,
    pub cors_allowed_origins: Option<String>,
}

pub struct ConfigInfo {
    pub config: Config,
    pub profile: Profile,
    pub overrides: Vec<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<ConfigInfo> {
        dotenv().ok();

        let profile = Profile::from_env();
        let defaults = ProfileDefaults::for_profile(profile);
        let mut overrides = Vec::new();

        let server_port = match env::var("SERVER_PORT") {
            Ok(v) => {
                let port = parse_server_port(&v)?;
                overrides.push("SERVER_PORT".to_string());
                port
            }
            Err(_) => defaults.server_port,
        };

        let database_url = env::var("DATABASE_URL").or_else(|_| {
            defaults
                .database_url
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))
        })?;
        if env::var("DATABASE_URL").is_ok() {
            overrides.push("DATABASE_URL".to_string());
        }

        let gateway_url = env::var("PAYMENT_GATEWAY_URL")
            .ok()
            .map(|v| {
                overrides.push("PAYMENT_GATEWAY_URL".to_string());
                v
            })
            .unwrap_or(defaults.gateway_url);

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|v| {
                overrides.push("CORS_ALLOWED_ORIGINS".to_string());
                Some(v)
            })
            .unwrap_or(defaults.cors_allowed_origins);

        Ok(ConfigInfo {
            config: Config {
                server_port,
                database_url,
                gateway_url,
                cors_allowed_origins,
            },
            profile,
            overrides,
        })
    }
}

/// A bad `SERVER_PORT` is a startup error, never a silent fallback to the
/// profile default.
fn parse_server_port(raw: &str) -> anyhow::Result<u16> {
    raw.parse()
        .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a port number, got '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_server_port_parses() {
        assert_eq!(parse_server_port("8080").unwrap(), 8080);
    }

    #[test]
    fn test_unparseable_server_port_is_an_error() {
        let err = parse_server_port("eight-thousand").unwrap_err();
        assert!(err.to_string().contains("SERVER_PORT"));
    }

    #[test]
    fn test_out_of_range_server_port_is_an_error() {
        assert!(parse_server_port("70000").is_err());
    }
}
