use thiserror::Error;

/// Errors raised while building or addressing the containment tree.
///
/// Malformed structure is rejected at build time; the layout passes
/// themselves assume a valid tree and never re-check it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node '{0}' is not part of the diagram")]
    UnknownNode(String),
    #[error("node '{0}' was declared more than once")]
    DuplicateNode(String),
}
