//! Orbit camera for the off-screen renders
//!
//! Matrices are column-major (`m[column][row]`) and project into wgpu's
//! `0..1` clip depth range.

use tetvol_core::CameraView;

use crate::config::CameraConfig;

/// Camera circling a target point at a fixed distance
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    /// Rotation around +Y in degrees
    pub yaw: f32,
    /// Elevation in degrees, kept inside (-90, 90)
    pub pitch: f32,
    pub distance: f32,
    pub target: [f32; 3],
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    /// Pitch limit that keeps the up vector well defined
    const PITCH_LIMIT: f32 = 89.0;

    pub fn new(yaw: f32, pitch: f32, distance: f32) -> Self {
        Self {
            yaw,
            pitch: pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT),
            distance,
            target: [0.0; 3],
            fov: 45.0,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
        }
    }

    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            fov: config.fov,
            aspect,
            near: config.near,
            far: config.far,
            ..Self::new(config.yaw, config.pitch, config.distance)
        }
    }

    /// Rotate around the target by the given angles in degrees
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw = (self.yaw + delta_yaw) % 360.0;
        self.pitch = (self.pitch + delta_pitch).clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
    }

    /// World-space eye position
    pub fn eye(&self) -> [f32; 3] {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        [
            self.target[0] + self.distance * pitch.cos() * yaw.sin(),
            self.target[1] + self.distance * pitch.sin(),
            self.target[2] + self.distance * pitch.cos() * yaw.cos(),
        ]
    }

    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        look_at_matrix(self.eye(), self.target, [0.0, 1.0, 0.0])
    }

    pub fn projection_matrix(&self) -> [[f32; 4]; 4] {
        perspective_matrix(self.fov.to_radians(), self.aspect, self.near, self.far)
    }
}

impl CameraView for OrbitCamera {
    fn world_direction(&self) -> [f32; 3] {
        let eye = self.eye();
        normalize([
            self.target[0] - eye[0],
            self.target[1] - eye[1],
            self.target[2] - eye[2],
        ])
    }

    fn view_projection(&self) -> [[f32; 4]; 4] {
        mat4_mul(self.projection_matrix(), self.view_matrix())
    }
}

/// Right-handed perspective projection with `0..1` depth
pub fn perspective_matrix(fov_y: f32, aspect: f32, near: f32, far: f32) -> [[f32; 4]; 4] {
    let f = 1.0 / (fov_y / 2.0).tan();
    let nf = 1.0 / (near - far);

    [
        [f / aspect, 0.0, 0.0, 0.0],
        [0.0, f, 0.0, 0.0],
        [0.0, 0.0, far * nf, -1.0],
        [0.0, 0.0, far * near * nf, 0.0],
    ]
}

/// Helper to create a look-at view matrix
pub fn look_at_matrix(eye: [f32; 3], target: [f32; 3], up: [f32; 3]) -> [[f32; 4]; 4] {
    let f = normalize([
        target[0] - eye[0],
        target[1] - eye[1],
        target[2] - eye[2],
    ]);
    let s = normalize(cross(f, up));
    let u = cross(s, f);

    [
        [s[0], u[0], -f[0], 0.0],
        [s[1], u[1], -f[1], 0.0],
        [s[2], u[2], -f[2], 0.0],
        [-dot(s, eye), -dot(u, eye), dot(f, eye), 1.0],
    ]
}

/// Matrix product `a * b`
pub fn mat4_mul(a: [[f32; 4]; 4], b: [[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut result = [[0.0f32; 4]; 4];
    for (col, out) in result.iter_mut().enumerate() {
        for (row, value) in out.iter_mut().enumerate() {
            *value = (0..4).map(|k| a[k][row] * b[col][k]).sum();
        }
    }
    result
}

/// Apply `m` to a point, returning homogeneous coordinates
pub fn transform_point(m: [[f32; 4]; 4], p: [f32; 3]) -> [f32; 4] {
    std::array::from_fn(|row| m[0][row] * p[0] + m[1][row] * p[1] + m[2][row] * p[2] + m[3][row])
}

fn normalize(v: [f32; 3]) -> [f32; 3] {
    let len = dot(v, v).sqrt();
    if len > 0.0 {
        [v[0] / len, v[1] / len, v[2] / len]
    } else {
        v
    }
}

fn cross(a: [f32; 3], b: [f32; 3]) -> [f32; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [f32; 3], b: [f32; 3]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}
