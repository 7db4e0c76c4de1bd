//! Position + color vertex

use std::mem::size_of;

use ash::vk;
use bytemuck::{Pod, Zeroable};

/// A vertex with position and color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Object-space position
    pub pos: [f32; 3],
    /// Linear RGB color
    pub color: [f32; 3],
}

impl Vertex {
    /// Create a vertex
    pub const fn new(pos: [f32; 3], color: [f32; 3]) -> Self {
        Self { pos, color }
    }

    /// Single per-vertex binding at slot 0
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Position at location 0, color at location 1
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 2] {
        [
            vk::VertexInputAttributeDescription {
                location: 0,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: 0,
            },
            vk::VertexInputAttributeDescription {
                location: 1,
                binding: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: size_of::<[f32; 3]>() as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_matches_descriptions() {
        assert_eq!(Vertex::binding_description().stride, 24);

        let [pos, color] = Vertex::attribute_descriptions();
        assert_eq!(pos.offset, 0);
        assert_eq!(color.offset, 12);
        assert_eq!(color.location, 1);

        let vertex = Vertex::new([1.0, 2.0, 3.0], [0.5, 0.25, 1.0]);
        let bytes = bytemuck::bytes_of(&vertex);
        assert_eq!(&bytes[12..16], &0.5_f32.to_ne_bytes());
    }
}
