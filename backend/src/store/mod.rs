pub mod users;

pub use users::{ProviderProfile, StoreError, UserStore};
