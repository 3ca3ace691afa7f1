//! Hospital Directory infrastructure

mod http_directory;

pub use http_directory::HttpHospitalDirectory;
