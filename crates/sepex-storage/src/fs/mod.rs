mod config;

pub use config::FsConfig;
