//! Network constants for the Wistia stats API.

/// Default REST API base URL for Wistia.
pub const DEFAULT_API_URL: &str = "https://api.wistia.com/v1";

/// Username sent with HTTP Basic auth. The API token is the password.
pub const BASIC_AUTH_USERNAME: &str = "api";

/// Environment variable conventionally holding the API token.
pub const API_TOKEN_ENV: &str = "WISTIA_API_TOKEN";
