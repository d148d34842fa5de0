//! Atlas page textures on the GPU.

use std::any::Any;
use std::sync::Arc;

use lowram_text::{
    FilterMode, GlyphPixels, GlyphVertex, TextureAllocator, TextureError, TextureFormat,
    TextureResource, validate_dimensions,
};
use tracing::trace;

use crate::context::GpuContext;

const GLYPH_ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x2, // position
    1 => Float32x2, // tex_coords
];

/// Vertex buffer layout matching [`GlyphVertex`].
pub fn glyph_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GlyphVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &GLYPH_ATTRIBS,
    }
}

/// The wgpu format backing a page format.
pub fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        // Luminance in red, coverage in green.
        TextureFormat::LuminanceAlpha8 => wgpu::TextureFormat::Rg8Unorm,
    }
}

fn to_wgpu_filter(filter: FilterMode) -> wgpu::FilterMode {
    match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    }
}

fn create_sampler(device: &wgpu::Device, filter: FilterMode) -> wgpu::Sampler {
    let mode = to_wgpu_filter(filter);
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("glyph_page_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: mode,
        min_filter: mode,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("glyph_page_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

/// Allocates atlas pages as wgpu textures.
pub struct WgpuTextures {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    layout: Arc<wgpu::BindGroupLayout>,
    nearest: Arc<wgpu::Sampler>,
    linear: Arc<wgpu::Sampler>,
}

impl WgpuTextures {
    pub fn new(gpu: &GpuContext) -> Self {
        let device = Arc::clone(gpu.device());
        let layout = Arc::new(Self::create_bind_group_layout(&device));
        let nearest = Arc::new(create_sampler(&device, FilterMode::Nearest));
        let linear = Arc::new(create_sampler(&device, FilterMode::Linear));
        Self {
            device,
            queue: Arc::clone(gpu.queue()),
            layout,
            nearest,
            linear,
        }
    }

    /// Layout every page bind group is created with: the texture at binding 0
    /// and its sampler at binding 1, both visible to the fragment stage.
    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    fn create_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glyph_page_bind_group_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
    }
}

impl TextureAllocator for WgpuTextures {
    fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn allocate(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> Result<Box<dyn TextureResource>, TextureError> {
        validate_dimensions(width, height, self.max_texture_dimension())?;

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph_page"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: texture_format(format),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        trace!(target: "lowram_text_wgpu::texture", width, height, "allocated page texture");

        let filter = FilterMode::default();
        let bind_group = create_bind_group(&self.device, &self.layout, &view, &self.nearest);
        Ok(Box::new(WgpuAtlasTexture {
            bind_group,
            texture,
            view,
            format,
            filter,
            device: Arc::clone(&self.device),
            queue: Arc::clone(&self.queue),
            layout: Arc::clone(&self.layout),
            nearest: Arc::clone(&self.nearest),
            linear: Arc::clone(&self.linear),
        }))
    }
}

/// One atlas page texture with its view and bind group.
pub struct WgpuAtlasTexture {
    bind_group: wgpu::BindGroup,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    format: TextureFormat,
    filter: FilterMode,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    layout: Arc<wgpu::BindGroupLayout>,
    nearest: Arc<wgpu::Sampler>,
    linear: Arc<wgpu::Sampler>,
}

impl WgpuAtlasTexture {
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn texture_view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Bind group sampling this page with its current filter.
    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    fn sampler(&self) -> &wgpu::Sampler {
        match self.filter {
            FilterMode::Nearest => &self.nearest,
            FilterMode::Linear => &self.linear,
        }
    }

    fn rebuild_bind_group(&mut self) {
        self.bind_group = create_bind_group(&self.device, &self.layout, &self.view, self.sampler());
    }
}

impl TextureResource for WgpuAtlasTexture {
    fn dimensions(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    fn format(&self) -> TextureFormat {
        self.format
    }

    fn filter(&self) -> FilterMode {
        self.filter
    }

    fn set_filter(&mut self, filter: FilterMode) {
        if self.filter != filter {
            self.filter = filter;
            self.rebuild_bind_group();
        }
    }

    fn upload(&mut self, pixels: &GlyphPixels) -> Result<(), TextureError> {
        let (width, height) = self.dimensions();
        if (pixels.width(), pixels.height()) != (width, height) {
            return Err(TextureError::SizeMismatch {
                expected: (width, height),
                actual: (pixels.width(), pixels.height()),
            });
        }

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(self.format.bytes_per_pixel() as u32 * width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl std::fmt::Debug for WgpuAtlasTexture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuAtlasTexture")
            .field("dimensions", &self.dimensions())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_format_is_two_channel() {
        let format = texture_format(TextureFormat::LuminanceAlpha8);
        assert_eq!(format, wgpu::TextureFormat::Rg8Unorm);
        assert_eq!(
            format.block_copy_size(None),
            Some(TextureFormat::LuminanceAlpha8.bytes_per_pixel() as u32)
        );
    }

    #[test]
    fn test_vertex_layout_matches_glyph_vertex() {
        let layout = glyph_vertex_layout();
        assert_eq!(layout.array_stride, 16);
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.attributes[1].offset, 8);
    }

    #[test]
    fn test_filter_mapping() {
        assert_eq!(to_wgpu_filter(FilterMode::Nearest), wgpu::FilterMode::Nearest);
        assert_eq!(to_wgpu_filter(FilterMode::Linear), wgpu::FilterMode::Linear);
    }
}
