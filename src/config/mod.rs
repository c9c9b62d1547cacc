pub mod global;
pub mod load;
pub mod model;
