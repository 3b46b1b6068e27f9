//! Position evaluation for display
//!
//! ## Module Organization
//!
//! - `material` - Material balance evaluation
//! - `position` - Material plus centre control and mobility

mod material;
mod position;

pub use material::evaluate_material;
pub use position::evaluate_position;
