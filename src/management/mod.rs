mod credentials;
mod store;

pub use credentials::CredentialStore;
pub use credentials::Credentials;
pub use credentials::TokenState;
pub use store::FileStore;
pub use store::KeyValueStore;
pub use store::MemoryStore;
pub use store::StoreError;
pub use store::StoreKey;
