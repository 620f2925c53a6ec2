//! # notedrop-oauth
//!
//! Notion OAuth sign-in flow for the notedrop extension core.
//!
//! The flow is proxy-based: the browser obtains an authorization code
//! interactively, and the code is exchanged for an access token by a trusted
//! HTTPS proxy that holds the client secret. This crate covers:
//!
//! - Authorization-URL construction with a random `state` parameter
//! - Callback-URL validation (state match, provider error, code presence)
//! - Trusted-proxy origin enforcement (the security boundary: no code is
//!   ever sent to a proxy whose origin is not allow-listed)
//! - The bounded-latency code-for-token exchange
//!
//! The interactive browser hop itself (opening the consent page, capturing
//! the redirect) is the host's job; this crate only consumes its output.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
mod flow;

pub use error::{Error, Result};
pub use flow::{
    DEFAULT_CLIENT_ID, DEFAULT_PROXY_URL, OAuthConfig, SignInFlow, generate_state,
    is_trusted_proxy_url,
};
