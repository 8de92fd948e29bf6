//! Self-revalidating node references for Arbor.
//!
//! A reference tracks "the node I mean" across tree mutations without ever
//! owning it. Each strategy listens to a small set of tree notifications and
//! re-resolves itself when they fire:
//!
//! - **Local** references name a direct child of a container by id. They
//!   resolve the moment such a child appears and clear when it moves away.
//! - **Path** references evaluate a path string from an origin and
//!   re-evaluate on every structural change reaching the origin or the
//!   current target.
//! - **Pointer** references hold exactly what the caller set, clearing only
//!   when the target starts disposal.
//!
//! All three fire "instance changed" only when the resolved identity
//! actually differs, and dispose themselves when their anchor node starts
//! disposal.
//!
//! # Modules
//!
//! - [`traits`]: The object-safe [`NodeRef`] trait and [`InstanceChange`]
//! - [`local`]: [`LocalRef`]
//! - [`path`]: [`PathRef`]
//! - [`pointer`]: [`PointerRef`]

mod kernel;
pub mod local;
pub mod path;
pub mod pointer;
pub mod traits;

pub use local::LocalRef;
pub use path::PathRef;
pub use pointer::PointerRef;
pub use traits::{InstanceChange, NodeRef};
