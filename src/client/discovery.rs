use std::env;
use std::path::Path;
use std::sync::Arc;

use log::debug;

use crate::api;
use crate::client::Client;
use crate::engine::{FileRawStorage, GenericStorage, Serializer};
use crate::Result;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "FLEET_DATA_DIR";
/// Data directory used when neither a flag nor [`DATA_DIR_ENV`] is given.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/fleet";

/// Picks the data directory: explicit value, then `FLEET_DATA_DIR`, then the default.
pub fn resolve_data_dir(explicit: Option<String>) -> String {
    explicit
        .filter(|dir| !dir.is_empty())
        .or_else(|| env::var(DATA_DIR_ENV).ok().filter(|dir| !dir.is_empty()))
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
}

/// Opens the on-disk store at `data_dir` with every kind from [`api::scheme`].
///
/// # Examples
///
/// ```no_run
/// use fleet_store::client;
/// use fleet_store::filter::IdNameFilter;
///
/// fn main() -> anyhow::Result<()> {
///     let client = client::open("/var/lib/fleet")?;
///     let vm = client.vms().find(&mut IdNameFilter::new("web"))?;
///     println!("{}", vm.metadata.uid);
///     Ok(())
/// }
/// ```
pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Client> {
    debug!("opening store at {:?}", data_dir.as_ref());
    let raw = FileRawStorage::new(data_dir)?;
    let storage = GenericStorage::new(Arc::new(raw), Serializer::new(api::scheme()));
    Ok(Client::new(Arc::new(storage)))
}
