//! Type-state markers.

/// Connected, greeting read, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no mailbox selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is selected.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selected;
