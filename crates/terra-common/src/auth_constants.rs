//! Google OAuth and Sam constants for Terra authentication
//!
//! These constants are pre-compiled into the binary so that a bare install
//! can sign in without a configuration file. The OAuth client id is not
//! compiled in and must come from configuration.

/// Google OAuth 2.0 token endpoint
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Default base URL of Sam, Terra's identity and access service
pub const SAM_BASE_URL: &str = "https://sam.dsde-prod.broadinstitute.org";

/// Lifetime Google assigns to ID tokens when a response omits it
pub const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

/// Tokens are treated as expired this long before their literal deadline
pub const TOKEN_SAFETY_MARGIN_SECS: u64 = 60;

/// Reason string Google's sign-in flow reports when the user closes the picker
pub const POPUP_CLOSED_BY_USER: &str = "popup_closed_by_user";
