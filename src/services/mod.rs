//! Auth services used by the page routes.
//!
//! ARCHITECTURE
//! ============
//! `gotrue` talks HTTP to the hosted auth provider behind the `AuthApi`
//! trait. `session_client` layers session persistence, refresh and PKCE on
//! top of it, writing through a `storage` backend and announcing changes on
//! the `events` hub. Route handlers only see `SessionClient`.

pub mod events;
pub mod gotrue;
pub mod session_client;
pub mod storage;
pub mod types;
