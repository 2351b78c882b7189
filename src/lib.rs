pub mod capture;
pub mod error;
pub mod minimap;
pub mod perception;
pub mod template_matching;

#[cfg(test)]
mod test_support;

pub use error::{PerceptionError, PerceptionResult};
