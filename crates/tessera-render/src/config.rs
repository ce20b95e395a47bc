/// Tunables for the batching core.
///
/// ```rust
/// use tessera_render::RenderConfig;
///
/// let config = RenderConfig::default()
///     .with_slot_extension(64)
///     .with_max_size_class(2);
/// assert_eq!(config.slot_extension, 64);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Slots added to a layer's slot array each time it fills up.
    pub slot_extension: usize,
    /// Vertex buffers grow in multiples of this many vertices.
    pub vertex_chunk: usize,
    /// Index buffers grow in multiples of this many indices.
    pub index_chunk: usize,
    /// Largest render target size class the pool will construct.
    pub max_size_class: u32,
    pub target_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            slot_extension: 256,
            vertex_chunk: 1024,
            index_chunk: 1536,
            max_size_class: 4,
            target_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            clear_color: wgpu::Color::BLACK,
        }
    }
}

impl RenderConfig {
    pub fn with_slot_extension(mut self, slots: usize) -> Self {
        self.slot_extension = slots.max(1);
        self
    }

    pub fn with_vertex_chunk(mut self, vertices: usize) -> Self {
        self.vertex_chunk = vertices.max(1);
        self
    }

    pub fn with_index_chunk(mut self, indices: usize) -> Self {
        self.index_chunk = indices.max(1);
        self
    }

    pub fn with_max_size_class(mut self, class: u32) -> Self {
        self.max_size_class = class;
        self
    }

    pub fn with_target_format(mut self, format: wgpu::TextureFormat) -> Self {
        self.target_format = format;
        self
    }

    pub fn with_clear_color(mut self, color: wgpu::Color) -> Self {
        self.clear_color = color;
        self
    }
}
