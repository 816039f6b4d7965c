//! SquatCount Render Engine
//!
//! Turns decoded frames plus estimator output into the images streamed to
//! clients.
//!
//! ```text
//! RGB frame ──┐
//!             ├── Skeleton overlay (connections + landmark dots)
//! landmarks ──┘         │
//!                       ▼
//!                 JPEG encode ──► binary WebSocket message
//! ```

pub mod compositor;
pub mod encode;

pub use compositor::{SkeletonOverlay, SKELETON_CONNECTIONS};
pub use encode::encode_jpeg;
