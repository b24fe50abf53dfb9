mod history_store;
mod sled_store;


use std::path::Path;

#[doc(hidden)]
pub use history_store::*;
#[doc(hidden)]
pub use sled_store::*;
use tracing::debug;
use tracing::warn;

/// history bucket storage
pub fn init_sled_history_db(
    db_path: impl AsRef<Path> + std::fmt::Debug
) -> std::result::Result<sled::Db, std::io::Error> {
    debug!("init_sled_history_db from path: {:?}", &db_path);

    sled::Config::default()
        .path(db_path.as_ref())
        .cache_capacity(10 * 1024 * 1024) //10MB
        .use_compression(true)
        .compression_factor(1)
        .open()
        .map_err(|e| {
            warn!(
                "Try to open DB at this location: {:?} and failed: {:?}",
                db_path.as_ref(),
                e
            );
            std::io::Error::other(e)
        })
}
