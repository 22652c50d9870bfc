use crate::{
    error::CursorError,
    sql::mysql::cursor::{MySqlCursor, QueryKiller},
};
use mysql_async::{
    Conn, Opts, OptsBuilder, Params, SslOpts, Statement, Value as MySqlValue, prelude::*,
};
use std::path::Path;
use tracing::{debug, error, info};

/// One MySQL connection used for a single query run.
pub struct MySqlSession {
    conn: Conn,
    opts: Opts,
    statement: Option<Statement>,
}

impl MySqlSession {
    pub async fn connect(conn_str: &str, ca_cert: Option<&Path>) -> Result<Self, CursorError> {
        let opts = Opts::from_url(conn_str).map_err(|e| {
            error!("MySQL connection string parse failed: {}", e);
            CursorError::InvalidConnection(e.to_string())
        })?;

        let mut builder = OptsBuilder::from_opts(opts);
        if let Some(path) = ca_cert {
            debug!("Using CA certificate {}", path.display());
            builder =
                builder.ssl_opts(SslOpts::default().with_root_certs(vec![path.to_path_buf().into()]));
        }

        let opts = Opts::from(builder);
        let conn = Conn::new(opts.clone()).await.map_err(|e| {
            error!("MySQL connection failed: {}", e);
            CursorError::MySql(e)
        })?;

        Ok(Self {
            conn,
            opts,
            statement: None,
        })
    }

    pub async fn ping(&mut self) -> Result<(), CursorError> {
        let val: i32 = self
            .conn
            .query_first("SELECT 1")
            .await?
            .ok_or_else(|| CursorError::Unexpected("MySQL ping returned no result".into()))?;

        if val != 1 {
            return Err(CursorError::Unexpected(format!(
                "MySQL ping returned unexpected result: {val}"
            )));
        }

        info!("MySQL ping succeeded");
        Ok(())
    }

    /// Prepares `sql` and opens a cursor over its result set.
    ///
    /// Parameters are bound positionally as strings.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<MySqlCursor<'_>, CursorError> {
        let statement = self.conn.prep(sql).await?;
        debug!(
            params = statement.num_params(),
            columns = statement.columns().len(),
            "MySQL statement prepared"
        );
        self.statement = Some(statement.clone());

        let killer = QueryKiller::new(self.opts.clone(), self.conn.id());
        let result = self.conn.exec_iter(statement, bind_params(params)).await?;
        Ok(MySqlCursor::new(result, killer))
    }

    /// Closes the prepared statement, if any, and disconnects.
    pub async fn close(mut self) -> Result<(), CursorError> {
        if let Some(statement) = self.statement.take() {
            self.conn.close(statement).await?;
        }
        self.conn.disconnect().await?;
        Ok(())
    }

    /// Drops the connection without the graceful shutdown, which would first
    /// read any result left pending on it.
    pub fn abandon(self) {
        debug!(connection_id = self.conn.id(), "Abandoning MySQL connection");
        drop(self.conn);
    }
}

fn bind_params(params: &[String]) -> Params {
    if params.is_empty() {
        return Params::Empty;
    }
    Params::Positional(
        params
            .iter()
            .map(|p| MySqlValue::Bytes(p.clone().into_bytes()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_params_are_positional_strings() {
        assert!(matches!(bind_params(&[]), Params::Empty));

        match bind_params(&["42".to_string(), "x".to_string()]) {
            Params::Positional(values) => {
                assert_eq!(
                    values,
                    vec![
                        MySqlValue::Bytes(b"42".to_vec()),
                        MySqlValue::Bytes(b"x".to_vec())
                    ]
                );
            }
            _ => panic!("expected positional params"),
        }
    }
}
