//! Market data aggregate: raw rows, validated points, the reconciler and the
//! repository seam.

pub mod entities;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use repositories::*;
pub use services::*;
pub use value_objects::*;
