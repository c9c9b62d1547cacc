pub mod command;
pub mod elapsed;
pub mod paths;
