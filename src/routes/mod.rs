// # Routes Module
//
// HTTP route handlers for the FuelTrackr server, grouped by API area.
// Routers and their auth layers are assembled in `server.rs`.

/// Health check and root endpoints
pub mod health;

/// Registration and login
pub mod auth;

/// Own profile and admin user management
pub mod users;

/// Travel log endpoints
pub mod travels;

/// Emails are compared and stored trimmed and lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
