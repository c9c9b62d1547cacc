pub mod rotate;
pub mod transcript;

pub use rotate::rotate_logs;
pub use transcript::RunLog;
