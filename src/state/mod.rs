pub mod attribute_cache;
pub mod session_store;

pub use attribute_cache::AttributeCache;
pub use session_store::{SessionKey, SessionStore};
