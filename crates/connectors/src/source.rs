use crate::{
    cursor::RowCursor,
    error::CursorError,
    sql::{mysql::session::MySqlSession, postgres::session::PgSession},
};
use std::{fmt, path::PathBuf, str::FromStr};

/// Database flavour behind a connection string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    MySql,
    Postgres,
}

impl FromStr for ConnectionKind {
    type Err = CursorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(ConnectionKind::MySql),
            "pg" | "postgres" | "postgresql" => Ok(ConnectionKind::Postgres),
            other => Err(CursorError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionKind::MySql => f.write_str("mysql"),
            ConnectionKind::Postgres => f.write_str("postgres"),
        }
    }
}

impl ConnectionKind {
    /// Infers the kind from the URL scheme, e.g. `mysql://` or `postgres://`.
    pub fn from_url(conn_str: &str) -> Result<Self, CursorError> {
        let (scheme, _) = conn_str.split_once("://").ok_or_else(|| {
            CursorError::InvalidConnection("expected a URL of the form <scheme>://…".into())
        })?;
        scheme.parse()
    }
}

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub conn_str: String,
    pub kind: ConnectionKind,
    /// PEM file with the root certificate to trust for TLS.
    pub ca_cert: Option<PathBuf>,
}

impl SourceOptions {
    pub fn new(conn_str: impl Into<String>, kind: Option<ConnectionKind>) -> Result<Self, CursorError> {
        let conn_str = conn_str.into();
        let kind = match kind {
            Some(kind) => kind,
            None => ConnectionKind::from_url(&conn_str)?,
        };
        Ok(Self {
            conn_str,
            kind,
            ca_cert: None,
        })
    }

    pub fn with_ca_cert(mut self, ca_cert: Option<PathBuf>) -> Self {
        self.ca_cert = ca_cert;
        self
    }
}

/// An open database connection able to run one query at a time.
pub enum Session {
    MySql(MySqlSession),
    Postgres(PgSession),
}

impl Session {
    pub async fn connect(opts: &SourceOptions) -> Result<Self, CursorError> {
        let ca_cert = opts.ca_cert.as_deref();
        match opts.kind {
            ConnectionKind::MySql => Ok(Session::MySql(
                MySqlSession::connect(&opts.conn_str, ca_cert).await?,
            )),
            ConnectionKind::Postgres => Ok(Session::Postgres(
                PgSession::connect(&opts.conn_str, ca_cert).await?,
            )),
        }
    }

    pub async fn ping(&mut self) -> Result<(), CursorError> {
        match self {
            Session::MySql(session) => session.ping().await,
            Session::Postgres(session) => session.ping().await,
        }
    }

    /// Prepares `sql`, binds `params` and opens a cursor over the result.
    ///
    /// The cursor borrows the session; drop it before calling `close`.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[String],
    ) -> Result<Box<dyn RowCursor + '_>, CursorError> {
        match self {
            Session::MySql(session) => Ok(Box::new(session.query(sql, params).await?)),
            Session::Postgres(session) => Ok(Box::new(session.query(sql, params).await?)),
        }
    }

    pub async fn close(self) -> Result<(), CursorError> {
        match self {
            Session::MySql(session) => session.close().await,
            Session::Postgres(session) => session.close().await,
        }
    }

    /// Drops the connection after a cancelled run without draining it.
    pub fn abandon(self) {
        match self {
            Session::MySql(session) => session.abandon(),
            Session::Postgres(session) => session.abandon(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_token() {
        assert_eq!("MariaDB".parse::<ConnectionKind>().unwrap(), ConnectionKind::MySql);
        assert_eq!("pg".parse::<ConnectionKind>().unwrap(), ConnectionKind::Postgres);
        assert!(matches!(
            "ftp".parse::<ConnectionKind>(),
            Err(CursorError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_kind_from_url_scheme() {
        assert_eq!(
            ConnectionKind::from_url("mysql://u:p@localhost:3306/db").unwrap(),
            ConnectionKind::MySql
        );
        assert_eq!(
            ConnectionKind::from_url("postgresql://localhost/db").unwrap(),
            ConnectionKind::Postgres
        );
        assert!(matches!(
            ConnectionKind::from_url("localhost/db"),
            Err(CursorError::InvalidConnection(_))
        ));
    }

    #[test]
    fn test_explicit_kind_wins_over_scheme() {
        let opts = SourceOptions::new("host=localhost user=app", Some(ConnectionKind::Postgres))
            .unwrap()
            .with_ca_cert(Some(PathBuf::from("/etc/ssl/ca.pem")));
        assert_eq!(opts.kind, ConnectionKind::Postgres);
        assert!(opts.ca_cert.is_some());
    }
}
