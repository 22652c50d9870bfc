use crate::{error::CursorError, sql::postgres::cursor::PgCursor};
use native_tls::{Certificate, TlsConnector};
use postgres_native_tls::MakeTlsConnector;
use std::path::Path;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    task::JoinHandle,
};
use tokio_postgres::{Client, Connection, NoTls, types::Type};
use tracing::{debug, error, info};

/// One Postgres connection used for a single query run.
pub struct PgSession {
    client: Client,
    connection: JoinHandle<()>,
}

impl PgSession {
    pub async fn connect(conn_str: &str, ca_cert: Option<&Path>) -> Result<Self, CursorError> {
        let (client, connection) = match ca_cert {
            Some(path) => {
                debug!("Using CA certificate {}", path.display());
                let pem = tokio::fs::read(path).await?;
                let cert = Certificate::from_pem(&pem).map_err(|e| CursorError::Tls(e.to_string()))?;
                let connector = TlsConnector::builder()
                    .add_root_certificate(cert)
                    .build()
                    .map_err(|e| CursorError::Tls(e.to_string()))?;
                let (client, connection) =
                    tokio_postgres::connect(conn_str, MakeTlsConnector::new(connector))
                        .await
                        .map_err(connect_failed)?;
                (client, spawn_connection(connection))
            }
            None => {
                let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
                    .await
                    .map_err(connect_failed)?;
                (client, spawn_connection(connection))
            }
        };

        Ok(Self { client, connection })
    }

    pub async fn ping(&self) -> Result<(), CursorError> {
        let row = self.client.query_one("SELECT 1", &[]).await?;
        let val: i32 = row.try_get(0)?;
        if val != 1 {
            return Err(CursorError::Unexpected(format!(
                "Postgres ping returned unexpected result: {val}"
            )));
        }

        info!("Postgres ping succeeded");
        Ok(())
    }

    /// Prepares `sql` and opens a streaming cursor over its result set.
    ///
    /// Parameters are bound positionally as `TEXT`; statements cast them
    /// where another type is needed (`$1::int`).
    pub async fn query(&self, sql: &str, params: &[String]) -> Result<PgCursor, CursorError> {
        let param_types = vec![Type::TEXT; params.len()];
        let statement = self.client.prepare_typed(sql, &param_types).await?;
        debug!(
            params = statement.params().len(),
            columns = statement.columns().len(),
            "Postgres statement prepared"
        );

        let stream = self.client.query_raw(&statement, params.iter()).await?;
        Ok(PgCursor::new(&statement, stream))
    }

    pub async fn close(self) -> Result<(), CursorError> {
        drop(self.client);
        if let Err(e) = self.connection.await {
            error!("Postgres connection task failed: {}", e);
        }
        Ok(())
    }

    /// Stops the connection task without waiting for the rows still in flight.
    pub fn abandon(self) {
        debug!("Abandoning Postgres connection");
        self.connection.abort();
        drop(self.client);
    }
}

fn connect_failed(e: tokio_postgres::Error) -> CursorError {
    error!("Postgres connection failed: {}", e);
    CursorError::Postgres(e)
}

fn spawn_connection<S, T>(connection: Connection<S, T>) -> JoinHandle<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Postgres connection error: {}", e);
        }
    })
}
