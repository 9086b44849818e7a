pub mod error;
pub mod file;
pub mod store;

pub use error::PersistenceError;
pub use file::FileCounter;
pub use store::CounterStore;
