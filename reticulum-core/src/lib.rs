//! Shared primitives for the Reticulum phylogenetic-network workspace.
//!
//! `reticulum-core` provides the foundation the domain crates build on:
//!
//! - **Error types** — [`ReticulumError`] and [`Result`] for structured error handling
//! - **Bitsets** — [`BitSet`], the dense taxon-cluster representation
//! - **Traits** — small shared abstractions like [`Summarizable`]

pub mod bitset;
pub mod error;
pub mod traits;

pub use bitset::BitSet;
pub use error::{ReticulumError, Result};
pub use traits::*;
