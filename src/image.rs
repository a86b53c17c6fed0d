use std::{collections::HashMap, sync::Arc};

use ash::vk;

use crate::{error::Result, AttachmentName, GraphError, FULL_IMAGE};

/// An image the graph renders into or samples from.
///
/// `memory` is null for images whose memory is managed elsewhere (swapchain images, images
/// from another allocator).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Image {
    pub handle: vk::Image,
    pub view: vk::ImageView,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
    pub memory: vk::DeviceMemory,
}

impl Image {
    pub fn from_raw(
        handle: vk::Image,
        view: vk::ImageView,
        extent: vk::Extent2D,
        format: vk::Format,
    ) -> Self {
        Self {
            handle,
            view,
            extent,
            format,
            memory: vk::DeviceMemory::null(),
        }
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn is_depth(&self) -> bool {
        is_depth_format(self.format)
    }

    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        let mut range = FULL_IMAGE;
        range.aspect_mask = aspect_mask(self.format);
        range
    }
}

pub(crate) fn is_depth_format(format: vk::Format) -> bool {
    matches!(
        format,
        vk::Format::D16_UNORM
            | vk::Format::X8_D24_UNORM_PACK32
            | vk::Format::D32_SFLOAT
            | vk::Format::D16_UNORM_S8_UINT
            | vk::Format::D24_UNORM_S8_UINT
            | vk::Format::D32_SFLOAT_S8_UINT
    )
}

pub(crate) fn aspect_mask(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM_S8_UINT
        | vk::Format::D24_UNORM_S8_UINT
        | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        f if is_depth_format(f) => vk::ImageAspectFlags::DEPTH,
        _ => vk::ImageAspectFlags::COLOR,
    }
}

/// How an image entered the image table.
#[derive(Debug, Clone)]
pub enum ImageEntry {
    /// The graph owns the image and destroys it when the graph is dropped.
    Owned(Image),
    /// Shared with an external owner, which is responsible for destroying it.
    Reference(Arc<Image>),
}

impl ImageEntry {
    pub fn image(&self) -> &Image {
        match self {
            ImageEntry::Owned(image) => image,
            ImageEntry::Reference(image) => image,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, ImageEntry::Owned(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImageTable {
    entries: HashMap<AttachmentName, ImageEntry>,
}

impl ImageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, returning the one previously stored under `name`.
    pub fn insert(&mut self, name: AttachmentName, entry: ImageEntry) -> Option<ImageEntry> {
        self.entries.insert(name, entry)
    }

    pub fn get(&self, name: AttachmentName) -> Result<&Image> {
        self.entries
            .get(&name)
            .map(ImageEntry::image)
            .ok_or(GraphError::ImageNotFound(name))
    }

    pub fn entry(&self, name: AttachmentName) -> Option<&ImageEntry> {
        self.entries.get(&name)
    }

    pub fn contains(&self, name: AttachmentName) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn drain_owned(&mut self) -> impl Iterator<Item = Image> + '_ {
        self.entries.drain().filter_map(|(_, entry)| match entry {
            ImageEntry::Owned(image) => Some(image),
            ImageEntry::Reference(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(format: vk::Format) -> Image {
        Image::from_raw(
            vk::Image::null(),
            vk::ImageView::null(),
            vk::Extent2D {
                width: 16,
                height: 8,
            },
            format,
        )
    }

    #[test]
    fn depth_formats_get_depth_aspect() {
        assert_eq!(
            image(vk::Format::D32_SFLOAT).subresource_range().aspect_mask,
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            image(vk::Format::D24_UNORM_S8_UINT)
                .subresource_range()
                .aspect_mask,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(
            image(vk::Format::R8G8B8A8_UNORM)
                .subresource_range()
                .aspect_mask,
            vk::ImageAspectFlags::COLOR
        );
    }

    #[test]
    fn lookup_of_missing_name_fails() {
        let mut table = ImageTable::new();
        let albedo = AttachmentName::new("albedo");
        table.insert(albedo, ImageEntry::Owned(image(vk::Format::R8G8B8A8_UNORM)));

        assert_eq!(table.get(albedo).unwrap().width(), 16);
        assert!(matches!(
            table.get(AttachmentName::new("normals")),
            Err(GraphError::ImageNotFound(_))
        ));
    }

    #[test]
    fn references_share_the_external_image() {
        let shared = Arc::new(image(vk::Format::B8G8R8A8_SRGB));
        let mut table = ImageTable::new();
        let name = AttachmentName::new("swapchain");
        table.insert(name, ImageEntry::Reference(shared.clone()));

        assert_eq!(Arc::strong_count(&shared), 2);
        assert!(!table.entry(name).unwrap().is_owned());
        assert_eq!(table.drain_owned().count(), 0);
        assert_eq!(Arc::strong_count(&shared), 1);
    }
}
