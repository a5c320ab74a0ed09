pub mod compile;
pub mod theme;
