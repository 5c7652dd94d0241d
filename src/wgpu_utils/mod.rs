//! WGPU utility functions and helpers
//!
//! Binding builders, binding-type shorthands and typed buffer wrappers shared
//! by the compute and render sides.

pub mod binding_builder;
pub mod binding_types;
pub mod uniform_buffer;

pub use binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc};
pub use uniform_buffer::{ArrayBuffer, UniformBuffer};

/// Number of workgroups needed to cover `problem_size` invocations
pub fn workgroup_count(problem_size: u32, workgroup_size: u32) -> u32 {
    problem_size.div_ceil(workgroup_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workgroup_count_rounds_up() {
        assert_eq!(workgroup_count(0, 64), 0);
        assert_eq!(workgroup_count(1, 64), 1);
        assert_eq!(workgroup_count(64, 64), 1);
        assert_eq!(workgroup_count(65, 64), 2);
        assert_eq!(workgroup_count(5120, 64), 80);
    }
}
