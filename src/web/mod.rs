//! Request/response plumbing shared by every route module.

pub mod negotiate;
pub mod path;
pub mod payload;
pub mod query;
pub mod response;

pub use negotiate::ResponseFormat;
pub use path::ApiPath;
pub use payload::Payload;
pub use query::{ListFilter, ListParams, SortDirection, SortField};
pub use response::ApiResponse;
