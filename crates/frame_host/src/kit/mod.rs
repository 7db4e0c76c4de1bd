//! Rendering shortcuts for applications
//!
//! Nothing here is needed by the frame loop itself. These are the pieces
//! most applications rebuild anyway: a forward pass, framebuffers that follow
//! the present target, a per-slot uniform ring, and a pipeline builder.

pub mod frame_data;
pub mod framebuffers;
pub mod pipeline;
pub mod render_pass;
pub mod staging;
pub mod uniform;
pub mod vertex;

pub use frame_data::{look_at_camera, stereo_eyes, vulkan_perspective, FrameData};
pub use framebuffers::FramebufferCache;
pub use pipeline::{Pipeline, PipelineBuilder, ShaderModule};
pub use render_pass::{external_dependency, view_mask, ForwardPass, DEPTH_FORMAT};
pub use staging::StagingUpload;
pub use uniform::{align_up, UniformRing};
pub use vertex::Vertex;
