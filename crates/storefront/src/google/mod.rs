//! Google OAuth 2.0 login.
//!
//! Authorization-code flow: [`GoogleOAuthClient::authorization_url`] sends the
//! user to Google with a CSRF `state`, the callback exchanges the code for an
//! access token, and the userinfo endpoint supplies the email and name.

mod client;

pub use client::{GoogleOAuthClient, GoogleOAuthError, GoogleProfile};
