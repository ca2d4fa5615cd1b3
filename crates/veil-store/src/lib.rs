//! # Veil Store
//!
//! The viewer's mutable state: the current image session and the cache of
//! revealed region content.
//!
//! ## Overview
//!
//! Both stores are plain owned values with narrow mutation APIs. The viewer
//! owns them together behind one lock, so a session load and the cache clear
//! that accompanies it happen in the same critical section.
//!
//! ## Key Types
//!
//! - [`RegionStore`] - The current [`ImageSession`](veil_core::ImageSession), replaced wholesale
//! - [`SessionEpoch`] - Identifies one load; used to discard stale results
//! - [`RevealCache`] - Region id to revealed content, write-once per session
//! - [`PutResult`] - Result of a cache put
//!
//! ## Design Notes
//!
//! - **Wholesale replacement**: sessions are never patched in place
//! - **Idempotent puts**: re-revealing a region returns `AlreadyRevealed`
//! - **Epoch checks**: results tagged with an old epoch are rejected

pub mod cache;
pub mod error;
pub mod session;

pub use cache::{PutResult, RevealCache};
pub use error::{Result, StoreError};
pub use session::{RegionStore, SessionEpoch};
