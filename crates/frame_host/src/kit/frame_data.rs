//! Per-frame uniform record and camera helpers

use bytemuck::{Pod, Zeroable};
use nalgebra::{Matrix4, Point3, Vector3};

/// Uniform data for one frame, laid out for std140
///
/// One camera per view; a mono frame repeats the same matrix.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FrameData {
    /// Clip-from-world matrix per view, column major
    pub cameras: [[[f32; 4]; 4]; 2],
    /// Animation scalar, seconds since start
    pub anim: f32,
    _padding: [f32; 3],
}

impl FrameData {
    /// Frame data for a stereo pair
    pub fn new(cameras: [Matrix4<f32>; 2], anim: f32) -> Self {
        Self {
            cameras: [cameras[0].into(), cameras[1].into()],
            anim,
            _padding: [0.0; 3],
        }
    }

    /// Frame data with the same camera for both views
    pub fn mono(camera: Matrix4<f32>, anim: f32) -> Self {
        Self::new([camera, camera], anim)
    }

    /// Camera for `view` as a matrix
    pub fn camera(&self, view: usize) -> Matrix4<f32> {
        Matrix4::from(self.cameras[view])
    }
}

/// Vulkan perspective projection: right-handed view space in, depth in `[0, 1]` out
///
/// Combines the projection with the axis flip from Y-up, Z-backward view
/// space to Vulkan's Y-down, Z-forward clip space.
pub fn vulkan_perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4<f32> {
    let tan_half_fovy = (fov_y * 0.5).tan();

    let mut projection = Matrix4::zeros();
    projection[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
    projection[(1, 1)] = 1.0 / tan_half_fovy;
    projection[(2, 2)] = far / (far - near);
    projection[(2, 3)] = -(near * far) / (far - near);
    projection[(3, 2)] = 1.0;

    let flip = Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, -1.0, 0.0, 0.0,
        0.0, 0.0, -1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    );

    projection * flip
}

/// Eye positions for a stereo pair looking at `target`, `separation` apart
pub fn stereo_eyes(center: Point3<f32>, target: Point3<f32>, separation: f32) -> [Point3<f32>; 2] {
    let forward = (target - center).normalize();
    let right = forward.cross(&Vector3::y()).normalize();
    let offset = right * (separation * 0.5);
    [center - offset, center + offset]
}

/// Clip-from-world matrix for an eye at `eye` looking at `target`
pub fn look_at_camera(eye: Point3<f32>, target: Point3<f32>, projection: &Matrix4<f32>) -> Matrix4<f32> {
    projection * Matrix4::look_at_rh(&eye, &target, &Vector3::y())
}
