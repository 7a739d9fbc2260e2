mod config;

pub use config::S3Config;
