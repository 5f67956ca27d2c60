pub mod pixeldrain;
pub mod retry;
