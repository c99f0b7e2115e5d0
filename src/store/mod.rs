pub mod local;
pub mod r#trait;

pub use local::LocalStore;
pub use r#trait::Store;
