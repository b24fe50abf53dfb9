//! Print the history of one key inside an inclusive time window.

use chrono::DateTime;
use chrono::Utc;
use clap::Parser;
use etcd_scribe::each_row;
use etcd_scribe::Result;
use etcd_scribe::SledHistoryStore;
use etcd_scribe::TimeRange;
use etcd_scribe::utils::time::parse_time_bound;
use tracing_subscriber::EnvFilter;

/// Prints matching fields as `bucket key value` rows.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database storage file name
    #[arg(long, default_value = "/opt/storage/etcd/db-localhost")]
    db_file: String,

    /// Key whose history to print
    #[arg(long)]
    key: String,

    /// Start time, inclusive
    #[arg(long, value_parser = parse_time_arg)]
    start: Option<DateTime<Utc>>,

    /// End time, inclusive
    #[arg(long, value_parser = parse_time_arg)]
    end: Option<DateTime<Utc>>,
}

fn parse_time_arg(arg: &str) -> std::result::Result<DateTime<Utc>, String> {
    parse_time_bound(arg).ok_or_else(|| {
        format!("unrecognized time `{arg}`, expected RFC 3339, `YYYY-MM-DDTHH:MM:SS` or `YYYY-MM-DD`")
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_observability();
    println!("config: db-file={}", cli.db_file);

    let range = TimeRange {
        start: cli.start,
        end: cli.end,
    };
    let store = SledHistoryStore::open(&cli.db_file)?;
    each_row(&store, |row| {
        if row.key == cli.key && range.matches(row.bucket) {
            println!("{} {} {}", row.bucket, row.key, row.value);
        }
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
