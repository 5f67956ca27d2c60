pub mod file_hosts;
