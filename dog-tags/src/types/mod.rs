pub mod ids;
pub mod ctx;
pub mod tag;

pub use ids::{TagId, TenantId};
pub use ctx::TagCtx;
pub use tag::Tag;
