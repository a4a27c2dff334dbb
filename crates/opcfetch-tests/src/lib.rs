// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # opcfetch Integration Tests
//!
//! Shared test doubles and fixtures plus the cross-crate integration tests
//! of the opcfetch workspace.
//!
//! ## Module Structure
//!
//! - [`common`]: shared test utilities
//!   - `mocks`: `MockTransport`, `RecordingSink`, `CountingScheduler`,
//!     `HeldSecureProvider`
//!   - `fixtures`: property sets and mock address spaces
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p opcfetch-tests
//! cargo test -p opcfetch-tests --test integration_traversal
//! cargo test -p opcfetch-tests --test integration_processor
//! ```
//!
//! ## Test Categories
//!
//! ### Traversal (`integration_traversal.rs`)
//! - Ordering, depth limits, cycles, browse failures
//! - Node data attributes
//!
//! ### Path cache (`integration_path_cache.rs`)
//! - Memoization, invalidation, failed and empty translations
//!
//! ### Processor (`integration_processor.rs`)
//! - Scheduling, backoff, per-node failures, routing, single flight

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::fixtures::*;
    pub use crate::common::mocks::*;
    pub use crate::common::init_test_logging;
}
