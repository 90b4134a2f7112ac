//! Common types shared by the math, config and engine crates

pub mod errors;
pub mod fixed_point;
pub mod full_math;
pub mod identifiers;
