use crate::{
    attachment::{
        AttachmentInitialState, ClearColor, ClearDepthStencil, ReadOnlyColorAttachment,
        WriteOnlyColorAttachment, WriteOnlyDepthAttachment,
    },
    command_buffer::CommandRecorder,
    graph::PassContext,
    pipeline::GraphicPipeline,
    AttachmentName,
};

/// Called once per frame while the pass's render pass is active.
pub type RenderCallback = Box<dyn FnMut(&mut dyn CommandRecorder, &PassContext<'_>)>;

/// Everything a single pass declares before it is compiled.
///
/// Building a pass never touches the device and never fails. Names that don't resolve to an
/// image are reported when the graph is built.
pub struct RenderPassBuilder {
    pub(crate) name: AttachmentName,
    pub(crate) on_render: Option<RenderCallback>,
    pub(crate) input_color_attachments: Vec<ReadOnlyColorAttachment>,
    pub(crate) output_color_attachments: Vec<WriteOnlyColorAttachment>,
    pub(crate) depth_attachment: WriteOnlyDepthAttachment,
    pub(crate) pipeline: Option<GraphicPipeline>,
}

impl RenderPassBuilder {
    pub fn new(name: impl Into<AttachmentName>) -> Self {
        Self {
            name: name.into(),
            on_render: None,
            input_color_attachments: vec![],
            output_color_attachments: vec![],
            depth_attachment: WriteOnlyDepthAttachment::default(),
            pipeline: None,
        }
    }

    pub fn with_render_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&mut dyn CommandRecorder, &PassContext<'_>) + 'static,
    {
        self.on_render = Some(Box::new(callback));
        self
    }

    pub fn add_read_only_color_attachment(mut self, name: impl Into<AttachmentName>) -> Self {
        self.input_color_attachments.push(ReadOnlyColorAttachment {
            name: name.into(),
            ..Default::default()
        });
        self
    }

    /// Adds a color output whose previous contents are discarded.
    pub fn add_write_only_color_attachment(self, name: impl Into<AttachmentName>) -> Self {
        self.push_color_output(WriteOnlyColorAttachment {
            name: name.into(),
            ..Default::default()
        })
    }

    /// Adds a color output that is cleared to `clear` when the pass begins.
    pub fn add_write_only_color_attachment_with_clear(
        self,
        name: impl Into<AttachmentName>,
        clear: ClearColor,
    ) -> Self {
        self.push_color_output(WriteOnlyColorAttachment {
            name: name.into(),
            clear_value: clear,
            initial_state: AttachmentInitialState::Clear,
            ..Default::default()
        })
    }

    pub fn add_write_only_color_attachment_with_state(
        self,
        name: impl Into<AttachmentName>,
        state: AttachmentInitialState,
    ) -> Self {
        self.push_color_output(WriteOnlyColorAttachment {
            name: name.into(),
            initial_state: state,
            ..Default::default()
        })
    }

    pub fn set_write_only_depth_attachment(mut self, name: impl Into<AttachmentName>) -> Self {
        self.depth_attachment = WriteOnlyDepthAttachment {
            name: name.into(),
            ..Default::default()
        };
        self
    }

    pub fn set_write_only_depth_attachment_with_clear(
        mut self,
        name: impl Into<AttachmentName>,
        clear: ClearDepthStencil,
    ) -> Self {
        self.depth_attachment = WriteOnlyDepthAttachment {
            name: name.into(),
            clear_value: clear,
            initial_state: AttachmentInitialState::Clear,
            ..Default::default()
        };
        self
    }

    pub fn set_write_only_depth_attachment_with_state(
        mut self,
        name: impl Into<AttachmentName>,
        state: AttachmentInitialState,
    ) -> Self {
        self.depth_attachment = WriteOnlyDepthAttachment {
            name: name.into(),
            initial_state: state,
            ..Default::default()
        };
        self
    }

    pub fn set_pipeline(mut self, pipeline: GraphicPipeline) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    pub fn name(&self) -> AttachmentName {
        self.name
    }

    pub fn input_color_attachments(&self) -> &[ReadOnlyColorAttachment] {
        &self.input_color_attachments
    }

    pub fn output_color_attachments(&self) -> &[WriteOnlyColorAttachment] {
        &self.output_color_attachments
    }

    pub fn depth_attachment(&self) -> &WriteOnlyDepthAttachment {
        &self.depth_attachment
    }

    pub fn pipeline(&self) -> Option<&GraphicPipeline> {
        self.pipeline.as_ref()
    }

    /// Every name this pass refers to, in declaration order. The depth attachment is only
    /// included when it is set.
    pub(crate) fn referenced_names(&self) -> impl Iterator<Item = AttachmentName> + '_ {
        self.input_color_attachments
            .iter()
            .map(|a| a.name)
            .chain(self.output_color_attachments.iter().map(|a| a.name))
            .chain(
                Some(self.depth_attachment.name).filter(|_| self.depth_attachment.is_set()),
            )
    }

    fn push_color_output(mut self, attachment: WriteOnlyColorAttachment) -> Self {
        self.output_color_attachments.push(attachment);
        self
    }
}

impl std::fmt::Debug for RenderPassBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderPassBuilder")
            .field("name", &self.name)
            .field("has_render_callback", &self.on_render.is_some())
            .field("input_color_attachments", &self.input_color_attachments)
            .field("output_color_attachments", &self.output_color_attachments)
            .field("depth_attachment", &self.depth_attachment)
            .field("pipeline", &self.pipeline)
            .finish()
    }
}
