//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the form rules and backend calls so route handlers
//! can stay focused on request translation and visitor plumbing. Controllers
//! talk to the backend only through the `supabase` traits.

pub mod booking;
pub mod contact;
pub mod feedback;
pub mod session;
pub mod shell;
pub mod sidebar;
pub mod validate;
pub mod visitors;
