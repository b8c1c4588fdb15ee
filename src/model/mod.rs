//! # Canvas Model
//!
//! Plain DTOs that cross every boundary: store ↔ pipeline ↔ sink.
//!
//! Design rule: this module is pure data. No I/O, no state, no async.

pub mod space;
pub mod position;
pub mod edge;
pub mod community;
pub mod presence;
pub mod batch;

pub use space::{SpaceNode, SpaceId};
pub use position::Position;
pub use edge::SimilarityEdge;
pub use community::Community;
pub use presence::{PresenceRecord, active_user_counts};
pub use batch::{VectorUpdate, ClusterUpdate, LayoutUpdate};
