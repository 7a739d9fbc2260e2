#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod mock;

pub use mock::{
    MockAsyncBackend, MockAsyncBackendConfig, MockBlobStore, MockContainerConfig,
    MockContainerRuntime, MockJobStore, MockProcessConfig, MockProcessHandle, MockProcessRuntime,
    MockTerminalState,
};
