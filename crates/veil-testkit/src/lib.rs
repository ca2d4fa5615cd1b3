//! # Veil Testkit
//!
//! Testing utilities for the Veil viewer.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a viewer wired to an in-memory backend, plus staged images
//! - **Generators**: Proptest strategies for polygons and regions
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust,no_run
//! use veil_testkit::fixtures::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     fixture.load_scenario().await.unwrap();
//!     fixture.viewer.set_reviewer(true).await;
//!     let outcome = fixture.viewer.click(0).await;
//!     assert!(outcome.is_revealed());
//! }
//! ```
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use veil_core::to_overlay_box;
//! use veil_testkit::generators::sized_polygon;
//!
//! proptest! {
//!     #[test]
//!     fn box_is_deterministic((dims, polygon) in sized_polygon()) {
//!         prop_assert_eq!(to_overlay_box(&polygon, dims), to_overlay_box(&polygon, dims));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{png_bytes, png_data_url, scenario_image, second_image, TestFixture};
