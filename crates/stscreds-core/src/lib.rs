//! Core library for stscreds.
//!
//! stscreds keeps two tiers of AWS credentials per profile: long-lived
//! bootstrap keys, used only to ask STS for a session, and short-lived
//! MFA-backed session credentials written where other tools expect them.
//!
//! - `store`: section/key/value files on disk
//! - `credentials`: the bootstrap and session stores for one profile
//! - `issuer`: identity, MFA device and session-token exchange
//! - `lifecycle`: run a command, re-authenticating once if the session expired
//! - `config`: resolved settings threaded into every component

pub mod config;
pub mod credentials;
pub mod error;
pub mod issuer;
pub mod lifecycle;
pub mod store;

pub use config::{Config, Overrides, Settings};
pub use error::{Error, Result};
pub use lifecycle::{Lifecycle, LifecycleState};
