pub mod decode;
pub mod model;
