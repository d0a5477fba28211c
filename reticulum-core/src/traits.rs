//! Core trait definitions shared across the Reticulum workspace.

/// A type that can produce a one-line summary of its contents.
pub trait Summarizable {
    /// A one-line summary suitable for display.
    fn summary(&self) -> String;
}
