//! Error code constants

/// Transport error codes (0100-0199)
pub const ERR_TRANSPORT_CLIENT: &str = "E-POOL-0100";
pub const ERR_TRANSPORT_REQUEST: &str = "E-POOL-0101";
pub const ERR_TRANSPORT_STATUS: &str = "E-POOL-0102";
pub const ERR_TRANSPORT_DECODE: &str = "E-POOL-0103";
pub const ERR_TRANSPORT_URL: &str = "E-POOL-0104";
pub const ERR_TRANSPORT_TASK: &str = "E-POOL-0105";

/// Catalog (bundled pools/polygons) error codes (0200-0299)
pub const ERR_CATALOG_LOAD: &str = "E-POOL-0200";
pub const ERR_CATALOG_IO: &str = "E-POOL-0201";
pub const ERR_CATALOG_PARSE: &str = "E-POOL-0202";

/// Configuration error codes (0300-0399)
pub const ERR_CONFIG_ENV: &str = "E-POOL-0300";
pub const ERR_CONFIG_SERVER: &str = "E-POOL-0301";
pub const ERR_CONFIG_INTERVAL: &str = "E-POOL-0302";

/// CLI error codes (0600-0699)
pub const ERR_CLI_MISSING_COMMAND: &str = "E-POOL-0640";
pub const ERR_CLI_UNKNOWN_COMMAND: &str = "E-POOL-0641";
pub const ERR_CLI_BAD_FLAG: &str = "E-POOL-0642";
pub const ERR_CLI_VALIDATION: &str = "E-POOL-0643";
pub const ERR_CLI_OFFLINE: &str = "E-POOL-0644";
