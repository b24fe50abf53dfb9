//! Dump the entire history database to stdout, one row per line.

use clap::Parser;
use etcd_scribe::each_row;
use etcd_scribe::Result;
use etcd_scribe::SledHistoryStore;
use tracing_subscriber::EnvFilter;

/// Prints every stored field as a `bucket key value` row.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database storage file name
    #[arg(long, default_value = "/opt/storage/etcd/db-localhost")]
    db_file: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_observability();
    println!("config: db-file={}", cli.db_file);

    let store = SledHistoryStore::open(&cli.db_file)?;
    each_row(&store, |row| {
        println!("{} {} {}", row.bucket, row.key, row.value);
    });
    Ok(())
}

/// Logs go to stderr so stdout stays machine readable.
fn init_observability() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}
