//! Vertex-to-fragment stage interface record
//!
//! [`VertexOut`] is what the particle vertex stage writes for every vertex and
//! what the fragment stage reads back after rasterization. The Rust type and
//! the WGSL declaration in [`VertexOut::WGSL`] describe the same three fields
//! in the same order.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

/// Pipeline output slot a [`VertexOut`] field is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageBinding {
    /// Mandatory clip-space position output (`@builtin(position)`)
    Position,
    /// Point rasterization size output
    PointSize,
    /// Plain interpolated data with no special meaning to the pipeline
    None,
}

/// Static description of one [`VertexOut`] field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub components: u32,
    pub offset: usize,
    pub binding: StageBinding,
}

/// Reasons a [`VertexOut`] cannot be rasterized
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum VertexOutError {
    #[error("position {0:?} is not a finite homogeneous coordinate")]
    NonFinitePosition([f32; 4]),
    #[error("position has w = 0 and cannot be perspective-divided")]
    DegenerateW,
    #[error("point size {0} must be finite and non-negative")]
    InvalidPointSize(f32),
}

/// Per-vertex output of the particle vertex stage
///
/// Stage outputs are matched by location, not by memory layout, so the host
/// copy is packed with no padding.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexOut {
    /// Homogeneous clip-space coordinate.
    pub position: [f32; 4],
    /// Rasterized diameter in pixels.
    pub point_size: f32,
    /// Interpolated RGBA colour.
    pub color: [f32; 4],
}

impl VertexOut {
    /// WGSL declaration of the record used by the particle shader.
    ///
    /// WGSL has no point-size built-in, so `point_size` travels in a
    /// flat-interpolated location; the vertex stage uses the same value to
    /// expand the particle into a screen-aligned quad of that many pixels.
    pub const WGSL: &'static str = r#"
struct VertexOut {
    @builtin(position) position: vec4<f32>,
    @location(0) @interpolate(flat) point_size: f32,
    @location(1) color: vec4<f32>,
}
"#;

    /// Fields in declaration order.
    pub const FIELDS: [FieldLayout; 3] = [
        FieldLayout {
            name: "position",
            components: 4,
            offset: 0,
            binding: StageBinding::Position,
        },
        FieldLayout {
            name: "point_size",
            components: 1,
            offset: 16,
            binding: StageBinding::PointSize,
        },
        FieldLayout {
            name: "color",
            components: 4,
            offset: 20,
            binding: StageBinding::None,
        },
    ];

    pub fn new(position: [f32; 4], point_size: f32, color: [f32; 4]) -> Self {
        Self {
            position,
            point_size,
            color,
        }
    }

    /// Checks the invariants the rasterizer relies on. Colour is not
    /// range-checked.
    pub fn validate(&self) -> Result<(), VertexOutError> {
        if self.position.iter().any(|c| !c.is_finite()) {
            return Err(VertexOutError::NonFinitePosition(self.position));
        }
        if self.position[3] == 0.0 {
            return Err(VertexOutError::DegenerateW);
        }
        if !self.point_size.is_finite() || self.point_size < 0.0 {
            return Err(VertexOutError::InvalidPointSize(self.point_size));
        }
        Ok(())
    }

    /// Normalized device coordinates after perspective division.
    pub fn ndc(&self) -> Result<[f32; 3], VertexOutError> {
        self.validate()?;
        let [x, y, z, w] = self.position;
        Ok([x / w, y / w, z / w])
    }

    /// Linear blend the rasterizer applies between two vertices.
    ///
    /// `point_size` is per-primitive and comes from the provoking vertex `a`.
    pub fn interpolate(a: &VertexOut, b: &VertexOut, t: f32) -> VertexOut {
        let lerp4 = |x: [f32; 4], y: [f32; 4]| {
            let mut out = [0.0; 4];
            for i in 0..4 {
                out[i] = x[i] + (y[i] - x[i]) * t;
            }
            out
        };

        VertexOut::new(
            lerp4(a.position, b.position),
            a.point_size,
            lerp4(a.color, b.color),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_after_construction() {
        let v = VertexOut::new([0.0, 0.0, 0.0, 1.0], 1.0, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(v.position, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(v.point_size, 1.0);
        assert_eq!(v.color, [1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_field_description() {
        let names: Vec<_> = VertexOut::FIELDS.iter().map(|f| f.name).collect();
        assert_eq!(names, ["position", "point_size", "color"]);

        assert_eq!(VertexOut::FIELDS[0].components, 4);
        assert_eq!(VertexOut::FIELDS[0].binding, StageBinding::Position);
        assert_eq!(VertexOut::FIELDS[1].components, 1);
        assert_eq!(VertexOut::FIELDS[1].binding, StageBinding::PointSize);
        assert_eq!(VertexOut::FIELDS[2].components, 4);
        assert_eq!(VertexOut::FIELDS[2].binding, StageBinding::None);
    }

    #[test]
    fn test_field_offsets_match_memory() {
        let v = VertexOut::new([1.0, 2.0, 3.0, 4.0], 5.0, [6.0, 7.0, 8.0, 9.0]);
        let floats: &[f32] = bytemuck::cast_slice(bytemuck::bytes_of(&v));

        assert_eq!(std::mem::size_of::<VertexOut>(), 36);
        for field in VertexOut::FIELDS {
            let start = field.offset / 4;
            let first = floats[start];
            match field.name {
                "position" => assert_eq!(first, 1.0),
                "point_size" => assert_eq!(first, 5.0),
                "color" => assert_eq!(first, 6.0),
                other => panic!("unexpected field {other}"),
            }
        }
    }

    #[test]
    fn test_wgsl_declaration() {
        assert!(VertexOut::WGSL.contains("@builtin(position) position: vec4<f32>"));
        assert!(VertexOut::WGSL.contains("point_size: f32"));
        assert!(VertexOut::WGSL.contains("@location(1) color: vec4<f32>"));
        assert_eq!(VertexOut::WGSL.matches(':').count(), 3);
    }

    #[test]
    fn test_validate() {
        let ok = VertexOut::new([0.5, -0.5, 0.2, 2.0], 0.0, [2.0, -1.0, 0.0, 1.0]);
        assert!(ok.validate().is_ok());

        let zero_w = VertexOut::new([0.0, 0.0, 0.0, 0.0], 1.0, [1.0; 4]);
        assert_eq!(zero_w.validate(), Err(VertexOutError::DegenerateW));

        let nan = VertexOut::new([f32::NAN, 0.0, 0.0, 1.0], 1.0, [1.0; 4]);
        assert!(matches!(
            nan.validate(),
            Err(VertexOutError::NonFinitePosition(_))
        ));

        let negative = VertexOut::new([0.0, 0.0, 0.0, 1.0], -1.0, [1.0; 4]);
        assert_eq!(
            negative.validate(),
            Err(VertexOutError::InvalidPointSize(-1.0))
        );
    }

    #[test]
    fn test_ndc() {
        let v = VertexOut::new([2.0, -4.0, 1.0, 2.0], 1.0, [1.0; 4]);
        assert_eq!(v.ndc().unwrap(), [1.0, -2.0, 0.5]);
    }

    #[test]
    fn test_interpolate() {
        let a = VertexOut::new([0.0, 0.0, 0.0, 1.0], 3.0, [1.0, 0.0, 0.0, 1.0]);
        let b = VertexOut::new([2.0, 2.0, 0.0, 1.0], 7.0, [0.0, 0.0, 1.0, 1.0]);

        let mid = VertexOut::interpolate(&a, &b, 0.5);
        assert_eq!(mid.position, [1.0, 1.0, 0.0, 1.0]);
        assert_eq!(mid.color, [0.5, 0.0, 0.5, 1.0]);
        assert_eq!(mid.point_size, 3.0);

        assert_eq!(VertexOut::interpolate(&a, &b, 0.0), a);
    }
}
