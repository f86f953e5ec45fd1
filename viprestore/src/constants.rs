// File: viprestore/src/constants.rs
//! Central repository for timeouts, limits, controller paths and the
//! string tokens written into selection files.

use std::time::Duration;

/// HTTP client timeout constants
pub mod http {
    use super::Duration;

    /// Default timeout for a single controller request
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Timeout for establishing a connection to the controller
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

    /// Header carrying the anti-forgery token on authenticated requests
    pub const XSRF_HEADER: &str = "X-XSRF-TOKEN";

    /// Cookie set by the controller after a successful login
    pub const XSRF_COOKIE: &str = "XSRF-TOKEN";
}

/// Controller REST paths
pub mod controller {
    pub const SESSION_PATH: &str = "/api/_session";

    pub const CURRENT_SERVICES_PATH: &str =
        "/rest/v1/data/status/pathman/currentModernServices/**";

    pub const PROFILES_PATH: &str = "/rest/v1/data/config/profiles/*/id,name,description,tags/**";

    pub const LOCAL_ENDPOINTS_PATH: &str = "/rest/v1/data/config/network/nGraphElements/**";

    pub const EXTERNAL_ENDPOINTS_PATH: &str = "/rest/v1/data/status/network/externalEndpoints/**";

    pub const GROUP_CONNECTIONS_PATH: &str = "/rest/v1/data/status/conman/services/\
        *%20where%20type='group'/connection/\
        connection.generic,generic/**/.../.../connection.to,from,to,id,rev,specific/\
        specific.breakAway,breakAway,complete,missingActiveConnections,numChildren,children/*";

    pub const CREATE_SERVICES_PATH: &str = "/api/setModernServices";

    pub const CANCEL_SERVICES_PATH: &str = "/api/cancelModernServices";

    /// Booking conflict strategy sent with create and cancel requests
    pub const CONFLICT_STRATEGY: u32 = 0;

    /// Booking strategy sent with create and cancel requests
    pub const BOOKING_STRATEGY: u32 = 2;
}

/// Batch orchestration defaults
pub mod batch {
    /// Concurrent remote calls per batch when the config does not say otherwise
    pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

    /// Detail recorded for items that never left `Pending` because the batch was aborted
    pub const CANCELLED_DETAIL: &str = "cancelled";

    /// Detail recorded when a selected id has no entry in the selection file
    pub const MISSING_ENTRY_DETAIL: &str = "not present in selection file";
}

/// Tokens used in persisted selection files
pub mod selection {
    pub const SCHEDULE_TYPE_ONCE: &str = "once";

    pub const SERVICE_TYPE_CONNECTION: &str = "connection";

    /// Connection ctype the controller expects for endpoint-based services
    pub const CONNECTION_CTYPE: u32 = 2;
}

/// Default configuration values
pub mod defaults {
    pub const CONFIG_DIR: &str = "config";

    pub const MAIN_CONFIG_FILE: &str = "main.toml";

    pub const SECRETS_FILE: &str = "secrets.toml";

    pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;

    pub const CONNECT_TIMEOUT_SECONDS: u64 = 5;
}
