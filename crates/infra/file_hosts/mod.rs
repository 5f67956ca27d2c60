pub mod pixeldrain;
