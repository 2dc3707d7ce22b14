use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use galedb_common::{DEFAULT_HOST, DEFAULT_PORT, MAX_CONNECTIONS};
use galedb_storage::Db;

#[derive(Parser, Debug)]
#[command(name = "galedb-server", about = "GaleDB — in-memory key/value and list store")]
struct Args {
    #[arg(long, env = "GALEDB_HOST", default_value = DEFAULT_HOST)]
    host: String,
    #[arg(long, env = "GALEDB_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, env = "GALEDB_MAX_CONNECTIONS", default_value_t = MAX_CONNECTIONS)]
    max_connections: usize,
    /// Filtro de log (sintaxe do RUST_LOG); tem precedência sobre RUST_LOG
    #[arg(long, env = "GALEDB_LOG", value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match args.log_level.as_deref() {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "galedb_server=info,galedb_storage=info".into()),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("GaleDB escutando em {addr}");

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("falha ao instalar handler de ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    galedb_server::run(listener, Db::new(), args.max_connections, shutdown).await;

    Ok(())
}
