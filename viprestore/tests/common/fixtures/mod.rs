//! Reusable test utilities:
//! - Mock controller REST API
//! - Stub/spy remote client
//! - Test configuration builder
//! - Record and allocation builders

// Not every test binary uses every fixture
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod mock_controller;
pub mod stub_remote;
pub mod test_config;
pub mod test_data;

pub use mock_controller::MockController;
pub use stub_remote::{RemoteCall, StubRemote};
pub use test_config::TestConfigBuilder;
pub use test_data::*;
