/// Typed, per-kind access to a [`Storage`](crate::engine::Storage).
///
/// This module pins a kind and a concrete record type so callers work with
/// `Vm`/`Kernel`/`Image` values instead of `Box<dyn Object>`.
pub mod scoped;
/// Assembly of the default on-disk store.
pub mod discovery;

pub use scoped::{Client, KindClient};
pub use discovery::{open, resolve_data_dir, DATA_DIR_ENV, DEFAULT_DATA_DIR};
