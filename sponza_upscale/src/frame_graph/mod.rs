//! Frame graph: offscreen attachments, the two resolution tiers and the
//! swapchain-facing present targets.

mod attachment;
mod tier;
mod pass_graph;
mod present;

pub use attachment::{Attachment, shading_rate_extent};
pub use tier::{Tier, TierKind, TierExtent};
pub use pass_graph::{PassGraph, GBUFFER_PASS_LABEL, LIGHTING_PASS_LABEL};
pub use present::{PresentTargets, COMPOSITE_PASS_LABEL, PRESENT_DEPTH_LABEL};
