use crate::{db::PgTlsFiles, pagination::DEFAULT_PAGE_SIZE};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    /// Externally visible origin used in generated links, without a trailing slash.
    pub public_url: String,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_pool_size: u32,
    pub pg_tls: PgTlsFiles,
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub request_timeout: Duration,
    pub seed_demo: bool,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    scenes_listen_addr: Option<String>,
    #[serde(default)]
    scenes_listen_host: Option<String>,
    #[serde(default)]
    scenes_listen_port: Option<u16>,
    #[serde(default)]
    scenes_public_url: Option<String>,
    #[serde(default)]
    scenes_database_url: Option<String>,
    #[serde(default)]
    database_url: Option<String>,
    #[serde(default = "default_pool_size")]
    scenes_max_pool_size: u32,
    #[serde(default)]
    pgsslrootcert: Option<String>,
    #[serde(default)]
    pgsslcert: Option<String>,
    #[serde(default)]
    pgsslkey: Option<String>,
    #[serde(default = "default_page_size")]
    scenes_default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    scenes_max_page_size: u32,
    #[serde(default = "default_timeout_secs")]
    scenes_request_timeout_secs: u64,
    #[serde(default)]
    scenes_seed_demo: bool,
}

const fn default_pool_size() -> u32 {
    10
}

const fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

const fn default_max_page_size() -> u32 {
    100
}

const fn default_timeout_secs() -> u64 {
    30
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse SCENES_* environment variables")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let listen_addr = resolve_addr(
            raw.scenes_listen_addr,
            raw.scenes_listen_host,
            raw.scenes_listen_port,
        )?;

        let public_url = raw
            .scenes_public_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| format!("http://{listen_addr}"));

        let database_url = non_blank(raw.scenes_database_url).or(non_blank(raw.database_url));

        let default_page_size = raw.scenes_default_page_size.max(1);

        Ok(Self {
            listen_addr,
            public_url,
            database_url,
            max_pool_size: raw.scenes_max_pool_size.max(1),
            pg_tls: PgTlsFiles {
                root_cert: raw.pgsslrootcert,
                client_cert: raw.pgsslcert,
                client_key: raw.pgsslkey,
            },
            default_page_size,
            max_page_size: raw.scenes_max_page_size.max(default_page_size),
            request_timeout: Duration::from_secs(raw.scenes_request_timeout_secs.max(1)),
            seed_demo: raw.scenes_seed_demo,
        })
    }

    /// Absolute URL of the scenes collection endpoint.
    pub fn scenes_url(&self) -> String {
        format!("{}/api/scenes", self.public_url)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid SCENES_LISTEN_ADDR value")?
            .next()
            .context("SCENES_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8490);
    format!("{host}:{port}")
        .to_socket_addrs()
        .context("invalid scenes listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
