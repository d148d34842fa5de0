//! GPU texture backend for `lowram-text` atlas pages, built on wgpu.
//!
//! [`WgpuTextures`] implements [`TextureAllocator`](lowram_text::TextureAllocator)
//! so a [`FontCache`](lowram_text::FontCache) keeps its pages on the GPU:
//!
//! ```no_run
//! use std::rc::Rc;
//! use lowram_text::{FontCache, SwashEngine};
//! use lowram_text_wgpu::{GpuContext, WgpuTextures};
//!
//! let gpu = GpuContext::headless()?;
//! let textures = Rc::new(WgpuTextures::new(&gpu));
//! let cache = FontCache::new(Rc::new(SwashEngine::new()), textures);
//! # Ok::<(), lowram_text_wgpu::GpuError>(())
//! ```
//!
//! Pages are `Rg8Unorm` textures: the red channel carries luminance and the
//! green channel carries coverage. A fragment shader reads them as
//!
//! ```wgsl
//! let texel = textureSample(glyph_texture, glyph_sampler, in.uv);
//! return vec4<f32>(in.color.rgb * texel.r, in.color.a * texel.g);
//! ```
//!
//! Bind each page with [`WgpuAtlasTexture::bind_group`] under the layout from
//! [`WgpuTextures::bind_group_layout`], and feed
//! [`GlyphMesh`](lowram_text::GlyphMesh) vertices through
//! [`glyph_vertex_layout`].

mod context;
mod texture;

pub use context::{GpuContext, GpuError};
pub use texture::{WgpuAtlasTexture, WgpuTextures, glyph_vertex_layout, texture_format};
