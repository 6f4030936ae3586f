//! Drawing tools: shapes anchored in chart space, hit testing and the
//! pointer state machine that places and edits them.

pub mod engine;
pub mod entities;
pub mod session;
pub mod tools;

pub use engine::*;
pub use entities::*;
pub use hit_test::*;
pub use session::*;
pub use tools::*;
