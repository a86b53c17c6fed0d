use ash::vk;
use thiserror::Error;

use crate::AttachmentName;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("No image named {0} in the image table")]
    ImageNotFound(AttachmentName),
    #[error("No render pass named {0} in the graph")]
    PassNotFound(AttachmentName),
    #[error("Failed to create {object}: {source}")]
    DeviceObjectCreation {
        object: &'static str,
        #[source]
        source: vk::Result,
    },
    #[error("Attachment {attachment} of pass {pass} is {found:?}, but the pass renders at {expected:?}")]
    MismatchedExtent {
        pass: AttachmentName,
        attachment: AttachmentName,
        expected: vk::Extent2D,
        found: vk::Extent2D,
    },
    #[error("Pass {pass} reads {attachment} before any pass has written it")]
    UnwrittenRead {
        pass: AttachmentName,
        attachment: AttachmentName,
    },
    #[error("Failed to load shader: {0}")]
    ShaderLoad(#[from] std::io::Error),
}

impl GraphError {
    pub(crate) fn creation(object: &'static str) -> impl FnOnce(vk::Result) -> GraphError {
        move |source| GraphError::DeviceObjectCreation { object, source }
    }
}

pub type Result<T, E = GraphError> = std::result::Result<T, E>;
