//! Request extractors used by the SEPEX HTTP handlers.

mod connection_info;
mod validated_json;

pub use connection_info::AppConnectInfo;
pub use validated_json::ValidateJson;
