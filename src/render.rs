//! The draw call loop.
//!
//! Scene nodes list what they want drawn as [`Instanced`] draws, the frame issues
//! them with the single scene pipeline.

use crate::{
    context::Context,
    data_structures::model::{DrawModel, Model},
};

/// Data for instanced object rendering: a model and its instance buffer.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
}

/// Issue the draw calls for `instanced` with the scene pipeline.
///
/// Meshes whose material bind group has not been built yet, or that have no
/// material, are drawn with the context's default material.
pub fn draw_instanced<'a>(
    ctx: &'a Context,
    render_pass: &mut wgpu::RenderPass<'a>,
    instanced: &[Instanced<'a>],
) {
    render_pass.set_pipeline(&ctx.pipeline);
    for draw in instanced {
        if draw.amount == 0 {
            continue;
        }
        render_pass.set_vertex_buffer(1, draw.instance.slice(..));
        render_pass.draw_model_instanced(
            draw.model,
            0..draw.amount as u32,
            &ctx.default_material,
            &ctx.camera.bind_group,
            &ctx.light.bind_group,
        );
    }
}
