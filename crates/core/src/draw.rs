//! Per-frame draw inputs and the GPU-free part of the draw decision.

use std::ops::Range;

use glam::{Mat4, Vec2};

use crate::value::UniformValues;

/// Vertices per instance when drawing instanced quads (two triangles).
pub const QUAD_VERTICES: i32 = 6;

/// Frame-level values every program may read as uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawContext {
    pub projection: Mat4,
    pub view: Mat4,
    /// Viewport size in CSS pixels.
    pub viewport: Vec2,
    pub pixel_ratio: f32,
}

impl Default for DrawContext {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            viewport: Vec2::ONE,
            pixel_ratio: 1.0,
        }
    }
}

impl DrawContext {
    /// Uniform values for one collection placed by `world_model`.
    ///
    /// Provides `projection`, `view`, `model`, `modelView`,
    /// `modelViewProjection`, `viewport` and `pixelRatio`.
    pub fn uniforms(&self, world_model: Mat4) -> UniformValues {
        let model_view = self.view * world_model;
        UniformValues::new()
            .with("projection", self.projection)
            .with("view", self.view)
            .with("model", world_model)
            .with("modelView", model_view)
            .with("modelViewProjection", self.projection * model_view)
            .with("viewport", self.viewport)
            .with("pixelRatio", self.pixel_ratio)
    }
}

/// Why a draw call did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    EmptyRange,
    TextureNotReady,
}

/// What a draw call will submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawPlan {
    Skip(SkipReason),
    /// `draw_arrays(primitive, first, count)`.
    Plain { first: i32, count: i32 },
    /// One quad per vertex in `first..first + instances`. Per-vertex
    /// attribute pointers start at vertex `first`.
    Instanced { first: usize, instances: i32 },
}

/// Decides the draw call for a program holding `count` vertices.
///
/// `range` is clamped to `0..count`.
pub fn plan_draw(
    count: usize,
    range: Option<Range<usize>>,
    textures_ready: bool,
    instanced: bool,
) -> DrawPlan {
    if count == 0 {
        return DrawPlan::Skip(SkipReason::Empty);
    }
    if !textures_ready {
        return DrawPlan::Skip(SkipReason::TextureNotReady);
    }
    let Range { start, end } = range.unwrap_or(0..count);
    let end = end.min(count);
    if start >= end {
        return DrawPlan::Skip(SkipReason::EmptyRange);
    }
    let span = to_gl_count(end - start);
    if instanced {
        DrawPlan::Instanced {
            first: start,
            instances: span,
        }
    } else {
        DrawPlan::Plain {
            first: to_gl_count(start),
            count: span,
        }
    }
}

fn to_gl_count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::UniformValue;
    use glam::Vec3;

    #[test]
    fn empty_program_skips() {
        assert_eq!(plan_draw(0, None, true, false), DrawPlan::Skip(SkipReason::Empty));
    }

    #[test]
    fn unready_texture_skips_even_with_vertices() {
        assert_eq!(
            plan_draw(10, None, false, false),
            DrawPlan::Skip(SkipReason::TextureNotReady)
        );
    }

    #[test]
    fn full_plain_draw_covers_every_vertex() {
        assert_eq!(
            plan_draw(7, None, true, false),
            DrawPlan::Plain { first: 0, count: 7 }
        );
    }

    #[test]
    fn instanced_draw_repeats_quad_per_vertex() {
        assert_eq!(
            plan_draw(7, None, true, true),
            DrawPlan::Instanced { first: 0, instances: 7 }
        );
    }

    #[test]
    fn range_is_clamped_to_count() {
        assert_eq!(
            plan_draw(5, Some(2..100), true, false),
            DrawPlan::Plain { first: 2, count: 3 }
        );
        assert_eq!(
            plan_draw(5, Some(1..3), true, true),
            DrawPlan::Instanced { first: 1, instances: 2 }
        );
    }

    #[test]
    fn empty_or_inverted_range_skips() {
        assert_eq!(
            plan_draw(5, Some(3..3), true, false),
            DrawPlan::Skip(SkipReason::EmptyRange)
        );
        assert_eq!(
            plan_draw(5, Some(8..9), true, false),
            DrawPlan::Skip(SkipReason::EmptyRange)
        );
    }

    #[test]
    fn context_uniforms_compose_matrices() {
        let ctx = DrawContext {
            projection: Mat4::from_scale(Vec3::splat(2.0)),
            view: Mat4::from_translation(Vec3::new(0.0, 0.0, -5.0)),
            viewport: Vec2::new(800.0, 600.0),
            pixel_ratio: 2.0,
        };
        let model = Mat4::from_translation(Vec3::X);
        let uniforms = ctx.uniforms(model);

        assert_eq!(uniforms.len(), 7);
        assert_eq!(uniforms.get("pixelRatio"), Some(&UniformValue::Float(2.0)));
        assert_eq!(uniforms.get("viewport"), Some(&UniformValue::Vec2([800.0, 600.0])));
        let expected = ctx.projection * ctx.view * model;
        assert_eq!(
            uniforms.get("modelViewProjection"),
            Some(&UniformValue::Mat4(expected.to_cols_array()))
        );
    }

    #[test]
    fn default_context_is_identity() {
        let uniforms = DrawContext::default().uniforms(Mat4::IDENTITY);
        assert_eq!(
            uniforms.get("modelView"),
            Some(&UniformValue::Mat4(Mat4::IDENTITY.to_cols_array()))
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn planned_span_never_exceeds_count(
                count in 0_usize..1000,
                start in 0_usize..1200,
                len in 0_usize..1200,
                instanced in any::<bool>(),
            ) {
                match plan_draw(count, Some(start..start + len), true, instanced) {
                    DrawPlan::Skip(_) => prop_assert!(count == 0 || start >= count || len == 0),
                    DrawPlan::Plain { first, count: n } => {
                        prop_assert!(first as usize + n as usize <= count);
                        prop_assert!(n > 0);
                    }
                    DrawPlan::Instanced { first, instances } => {
                        prop_assert!(first + instances as usize <= count);
                        prop_assert!(instances > 0);
                    }
                }
            }
        }
    }
}
