pub mod drag;
pub mod link;

pub use drag::{
    CommitTicket, DragError, DragInteractionController, DragKind, DragPhase, DragRelease,
    EditCapability, PendingCommit,
};
pub use link::{
    DependencyEdge, DependencyLinkController, HandleHit, HandleSide, LinkEffect, LinkingState,
};
