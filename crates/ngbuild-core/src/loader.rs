//! Two-variant loader outcome.
//!
//! A loader that only understands one file format reports
//! [`LoadOutcome::RequiresAlternateFormat`] instead of failing, and the caller
//! picks the next loader by matching on the variant.

/// Result of attempting to load something in one particular format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome<T> {
    /// The loader understood the input
    Loaded(T),
    /// The input is in a format this loader does not handle
    RequiresAlternateFormat,
}

impl<T> LoadOutcome<T> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    /// Use `fallback` when this outcome asks for another format.
    pub fn or_else<F>(self, fallback: F) -> LoadOutcome<T>
    where
        F: FnOnce() -> LoadOutcome<T>,
    {
        match self {
            LoadOutcome::Loaded(value) => LoadOutcome::Loaded(value),
            LoadOutcome::RequiresAlternateFormat => fallback(),
        }
    }

    pub fn loaded(self) -> Option<T> {
        match self {
            LoadOutcome::Loaded(value) => Some(value),
            LoadOutcome::RequiresAlternateFormat => None,
        }
    }
}
