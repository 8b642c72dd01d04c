pub mod memstore;
pub mod persistence;
pub mod raw;
pub mod serializer;
pub mod storage;

pub use memstore::MemoryRawStorage;
pub use persistence::FileRawStorage;
pub use raw::RawStorage;
pub use serializer::{Scheme, Serializer};
pub use storage::{is_storable_uid, key_for_id, key_for_kind, GenericStorage, Storage};
