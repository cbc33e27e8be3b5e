use thiserror::Error;

/// Errors returned by keyed lookups on an [`AvlMap`](crate::AvlMap).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("key not found")]
    KeyNotFound,
}

/// Structural damage discovered while relinking nodes.
///
/// None of these can occur in a correctly maintained tree. They are never handed to callers:
/// the mutating entry points log them and panic.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Corruption {
    #[error("node is not referenced by the parent it links back to")]
    ParentMismatch,

    #[error("no subtree hangs from the slot being rotated")]
    MissingSubtree,

    #[error("the subtree being rotated has no child to pivot on")]
    MissingPivot,
}

#[cold]
#[track_caller]
pub(crate) fn corrupted(err: Corruption) -> ! {
    log::error!("AVL tree corrupted: {err}");
    panic!("AVL tree corrupted: {err}");
}
