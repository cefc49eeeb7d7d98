pub mod point;

pub use point::NormPoint;
