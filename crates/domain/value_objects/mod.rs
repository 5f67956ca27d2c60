pub mod file_host;
pub mod upload_result;
