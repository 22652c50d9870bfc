use crate::{
    commands::Commands,
    conn::QueryRequest,
    env::EnvManager,
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::source::{ConnectionKind, SourceOptions};
use render::registry::OutputFormat;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod commands;
mod conn;
mod env;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "rowdump",
    version,
    about = "Run a SQL query and stream the result set as text, CSV or JSON"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match execute(cli.command, &shutdown).await {
        Ok(()) => ExitCode::Success,
        Err(err) => {
            let code = if shutdown.is_shutdown_requested() {
                ExitCode::ShutdownRequested
            } else {
                err.exit_code()
            };
            match code {
                ExitCode::ShutdownRequested => warn!("Interrupted: {}", err),
                _ => error!("{}", err),
            }
            code
        }
    };

    std::process::exit(code.as_i32());
}

/// Logs go to stderr; stdout carries the rendered result.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(command: Commands, shutdown: &ShutdownCoordinator) -> Result<(), CliError> {
    let cancel = shutdown.cancel_token();

    match command {
        Commands::Query {
            conn,
            sql,
            args,
            format,
            output,
            cacert,
            kind,
            env_file,
        } => {
            let env = load_env(env_file.as_deref())?;
            let opts = source_options(&env, &conn, kind.as_deref(), cacert)?;
            let request = QueryRequest {
                sql,
                params: args,
                format: env.output_format(format.as_deref())?,
                output,
            };

            let summary = conn::run_query(&opts, &request, &cancel).await?;
            info!(
                rows = summary.rows,
                columns = summary.columns,
                "Query finished"
            );
        }
        Commands::Formats => {
            for format in OutputFormat::ALL {
                let marker = if format == OutputFormat::default() {
                    " (default)"
                } else {
                    ""
                };
                println!("{:<20}{}{}", format.token(), format.help(), marker);
            }
        }
        Commands::TestConn {
            conn_str,
            kind,
            cacert,
            env_file,
        } => {
            let env = load_env(env_file.as_deref())?;
            let opts = source_options(&env, &conn_str, kind.as_deref(), cacert)?;
            conn::test_connection(&opts, &cancel).await?;
            info!("Connection to {} succeeded", conn::redact(&opts.conn_str));
        }
    }

    Ok(())
}

fn load_env(env_file: Option<&Path>) -> Result<EnvManager, CliError> {
    let mut env = EnvManager::from_system();
    if let Some(path) = env_file {
        env.load_from_file(path)?;
    }
    Ok(env)
}

fn source_options(
    env: &EnvManager,
    conn: &str,
    kind: Option<&str>,
    cacert: Option<PathBuf>,
) -> Result<SourceOptions, CliError> {
    let kind = kind.map(str::parse::<ConnectionKind>).transpose()?;
    let opts = SourceOptions::new(env.conn_str(conn)?, kind)?;
    Ok(opts.with_ca_cert(cacert))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "rowdump",
            "query",
            "--format",
            "json-object",
            "-o",
            "out.json",
            "mysql://app@localhost/sakila",
            "SELECT * FROM actor WHERE actor_id > ? AND last_name <> ?",
            "-5",
            "DAVIS",
        ])
        .unwrap();

        match cli.command {
            Commands::Query {
                conn,
                args,
                format,
                output,
                ..
            } => {
                assert_eq!(conn, "mysql://app@localhost/sakila");
                assert_eq!(args, ["-5", "DAVIS"]);
                assert_eq!(format.as_deref(), Some("json-object"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected the query command"),
        }
    }

    #[test]
    fn test_conn_from_env_and_kind_override() {
        let mut env = EnvManager::default();
        env.set(env::CONN_VAR, "host=localhost user=app dbname=sales");

        let opts = source_options(&env, "-", Some("pg"), None).unwrap();
        assert_eq!(opts.kind, ConnectionKind::Postgres);
        assert_eq!(opts.conn_str, "host=localhost user=app dbname=sales");

        assert!(source_options(&env, "-", None, None).is_err());
        assert!(source_options(&env, "-", Some("oracle"), None).is_err());
    }
}
