//! Spotlight - a natural-language command palette for NirvanaHQ.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  ┌─────────────┐
//! │   Overlay   │  │     CLI     │
//! └──────┬──────┘  └──────┬──────┘
//!        └────────┬───────┘
//!          ┌──────┴──────┐      ┌──────────────┐
//!          │    Relay    │ ───► │    Model     │
//!          └──────┬──────┘      └──────────────┘
//!          ┌──────┴──────┐
//!          │ Task tools  │
//!          └──────┬──────┘
//!     ┌───────────┴───────────┐
//! ┌───┴────────┐      ┌───────┴──────┐
//! │ Data cache │ ───► │ Nirvana API  │
//! └────────────┘      └──────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod overlay;

pub use config::Config;
pub use core::{Error, Result, Services};
