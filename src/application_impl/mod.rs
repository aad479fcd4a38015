mod auth_service_impl;
mod credential_hasher;
mod jwt_codec;
mod session_store_impl;
mod user_service_impl;

pub use auth_service_impl::*;
pub use credential_hasher::*;
pub use jwt_codec::*;
pub use session_store_impl::*;
pub use user_service_impl::*;
