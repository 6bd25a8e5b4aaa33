//! authwire-file - Filesystem-backed token persistence.

mod store;

pub use store::FilePersistence;
