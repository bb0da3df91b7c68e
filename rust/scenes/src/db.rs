//! PostgreSQL connection pooling for the scenes store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use bb8::{ManageConnection, Pool};
use diesel_async::{AsyncPgConnection, SimpleAsyncConnection};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use std::fs::File;
use std::io::BufReader;
use tokio_postgres::{Config as PgConfig, NoTls};
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{error, info};

pub type PgPool = Pool<PgConnectionManager>;

/// PEM files for TLS to PostgreSQL (`PGSSLROOTCERT`, `PGSSLCERT`, `PGSSLKEY`).
#[derive(Debug, Clone, Default)]
pub struct PgTlsFiles {
    pub root_cert: Option<String>,
    pub client_cert: Option<String>,
    pub client_key: Option<String>,
}

pub async fn connect_pool(database_url: &str, max_size: u32, tls: &PgTlsFiles) -> Result<PgPool> {
    let manager = PgConnectionManager::new(database_url, tls)?;
    let pool = Pool::builder()
        .max_size(max_size)
        .build(manager)
        .await
        .context("failed to build PostgreSQL connection pool")?;

    match pool.get().await {
        Ok(_) => info!("database connectivity check succeeded"),
        Err(err) => error!(error = ?err, "initial database connectivity check failed"),
    }

    Ok(pool)
}

/// Runs idempotent DDL on a pooled connection.
pub async fn ensure_schema(pool: &PgPool, ddl: &str) -> Result<()> {
    let mut conn = pool
        .get()
        .await
        .map_err(|err| anyhow::anyhow!("failed to acquire connection for schema setup: {err:?}"))?;
    conn.batch_execute(ddl)
        .await
        .context("failed to apply scenes schema")?;
    Ok(())
}

#[derive(Clone)]
pub struct PgConnectionManager {
    config: PgConfig,
    tls: Option<MakeRustlsConnect>,
}

impl PgConnectionManager {
    fn new(database_url: &str, tls: &PgTlsFiles) -> Result<Self> {
        let config = database_url
            .parse::<PgConfig>()
            .context("invalid database URL")?;
        let tls = tls
            .root_cert
            .as_deref()
            .map(|root| {
                build_client_config(root, tls.client_cert.as_deref(), tls.client_key.as_deref())
                    .map(MakeRustlsConnect::new)
            })
            .transpose()?;
        Ok(Self { config, tls })
    }
}

#[async_trait]
impl ManageConnection for PgConnectionManager {
    type Connection = AsyncPgConnection;
    type Error = anyhow::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let connection = match &self.tls {
            None => {
                let (client, connection) = self.config.connect(NoTls).await?;
                AsyncPgConnection::try_from_client_and_connection(client, connection).await
            }
            Some(connector) => {
                let (client, connection) = self.config.connect(connector.clone()).await?;
                AsyncPgConnection::try_from_client_and_connection(client, connection).await
            }
        };
        connection.map_err(|err| anyhow::anyhow!(err))
    }

    async fn is_valid(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        conn.batch_execute("SELECT 1").await?;
        Ok(())
    }

    fn has_broken(&self, _: &mut Self::Connection) -> bool {
        false
    }
}

fn build_client_config(
    root_cert: &str,
    client_cert: Option<&str>,
    client_key: Option<&str>,
) -> Result<ClientConfig> {
    let mut root_store = RootCertStore::empty();
    for cert in read_certs(root_cert)? {
        root_store
            .add(cert)
            .map_err(|_| anyhow::anyhow!("invalid certificate in PGSSLROOTCERT"))?;
    }
    let builder = ClientConfig::builder().with_root_certificates(root_store);

    match (client_cert, client_key) {
        (None, None) => Ok(builder.with_no_client_auth()),
        (Some(cert), Some(key)) => {
            let chain = read_certs(cert)?;
            if chain.is_empty() {
                anyhow::bail!("PGSSLCERT contained no certificates");
            }
            builder
                .with_client_auth_cert(chain, read_key(key)?)
                .with_context(|| format!("failed to build client TLS config for {root_cert}"))
        }
        _ => anyhow::bail!("PGSSLCERT and PGSSLKEY must both be set (or neither)"),
    }
}

fn read_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open certificate file '{path}'"))?,
    );
    rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("failed to parse certificates in '{path}'"))
}

fn read_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let mut reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open PGSSLKEY file '{path}'"))?,
    );
    rustls_pemfile::private_key(&mut reader)
        .context("failed to parse PGSSLKEY")?
        .context("PGSSLKEY contained no private keys")
}
