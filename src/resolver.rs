use std::collections::HashMap;

use crate::{attachment::AttachmentLayout, AttachmentName, RenderPassBuilder};

/// Assigns every attachment use the layout it has to transition from, and returns the layout
/// `output` is left in after the last pass.
///
/// Passes are walked in declaration order. Within a pass, inputs are resolved first, then
/// color outputs, then the depth attachment. Each use records the layout it leaves behind:
/// inputs end up in `ShaderRead`, color outputs in `ColorAttachment`, depth in
/// `DepthAttachment`. A name nobody touched before resolves to `Unknown`.
pub fn resolve_layouts(
    passes: &mut [RenderPassBuilder],
    output: AttachmentName,
) -> AttachmentLayout {
    let mut last_layouts: HashMap<AttachmentName, AttachmentLayout> = HashMap::new();

    let mut transition = |name: AttachmentName, next: AttachmentLayout| {
        let previous = last_layouts.insert(name, next).unwrap_or_default();
        log::trace!("{name}: {previous:?} -> {next:?}");
        previous
    };

    for pass in passes.iter_mut() {
        for input in &mut pass.input_color_attachments {
            input.initial_layout = transition(input.name, AttachmentLayout::ShaderRead);
        }

        for output in &mut pass.output_color_attachments {
            output.initial_layout = transition(output.name, AttachmentLayout::ColorAttachment);
        }

        let depth = &mut pass.depth_attachment;
        if depth.is_set() {
            depth.initial_layout = transition(depth.name, AttachmentLayout::DepthAttachment);
        }
    }

    last_layouts.get(&output).copied().unwrap_or_default()
}
