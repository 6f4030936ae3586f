//! Chart aggregate: the pane/series layout and its scale bindings.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use services::*;
pub use value_objects::*;
