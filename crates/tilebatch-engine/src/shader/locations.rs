/// Vertex attribute location (`@location(n)` of a vertex-stage input).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AttributeLocation(pub u32);

/// Bind group slot of a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    pub group: u32,
    pub binding: u32,
}

/// Resolved location of a uniform.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformLocation {
    /// Member of the uniform block bound at `slot`, `offset` bytes in.
    Member { slot: BindingSlot, offset: u32 },
    /// Texture bound directly at `slot`.
    Texture { slot: BindingSlot },
}

impl UniformLocation {
    /// Bind slot holding the value.
    #[inline]
    pub fn slot(self) -> BindingSlot {
        match self {
            UniformLocation::Member { slot, .. } | UniformLocation::Texture { slot } => slot,
        }
    }
}

/// Uniforms the tile program exposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum UniformName {
    ImageSampler,
    SamplerResolution,
    Resolution,
    MatrixScale,
    MatrixPos,
    Alpha,
    /// Reserved; not read by the transform.
    CentreOffset,
    /// Reserved; not read by the transform.
    Scale,
    TransformMode,
}

impl UniformName {
    /// Every uniform the transform math reads.
    pub const REQUIRED: [UniformName; 7] = [
        UniformName::ImageSampler,
        UniformName::SamplerResolution,
        UniformName::Resolution,
        UniformName::MatrixScale,
        UniformName::MatrixPos,
        UniformName::Alpha,
        UniformName::TransformMode,
    ];

    /// The subset offered for generic enumeration by callers.
    pub const SELECT: [UniformName; 4] = [
        UniformName::CentreOffset,
        UniformName::Alpha,
        UniformName::Scale,
        UniformName::ImageSampler,
    ];

    /// Identifier in the WGSL sources.
    pub const fn wgsl_name(self) -> &'static str {
        match self {
            UniformName::ImageSampler => "atlas",
            UniformName::SamplerResolution => "sampler_resolution",
            UniformName::Resolution => "resolution",
            UniformName::MatrixScale => "matrix_scale",
            UniformName::MatrixPos => "matrix_pos",
            UniformName::Alpha => "alpha",
            UniformName::CentreOffset => "centre_offset",
            UniformName::Scale => "scale",
            UniformName::TransformMode => "transform_mode",
        }
    }
}

/// Locations resolved from a linked program.
///
/// Stable for the lifetime of the program they were resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramLocations {
    pub position: AttributeLocation,

    pub uniform_block: BindingSlot,
    pub uniform_block_size: u32,
    pub atlas_sampler: BindingSlot,

    pub image_sampler: UniformLocation,
    pub sampler_resolution: UniformLocation,
    pub resolution: UniformLocation,
    pub matrix_scale: UniformLocation,
    pub matrix_pos: UniformLocation,
    pub alpha: UniformLocation,
    pub transform_mode: UniformLocation,

    pub centre_offset: Option<UniformLocation>,
    pub scale: Option<UniformLocation>,
}

impl ProgramLocations {
    pub fn get(&self, name: UniformName) -> Option<UniformLocation> {
        match name {
            UniformName::ImageSampler => Some(self.image_sampler),
            UniformName::SamplerResolution => Some(self.sampler_resolution),
            UniformName::Resolution => Some(self.resolution),
            UniformName::MatrixScale => Some(self.matrix_scale),
            UniformName::MatrixPos => Some(self.matrix_pos),
            UniformName::Alpha => Some(self.alpha),
            UniformName::TransformMode => Some(self.transform_mode),
            UniformName::CentreOffset => self.centre_offset,
            UniformName::Scale => self.scale,
        }
    }

    /// All attribute locations of the program.
    pub fn attributes(&self) -> Vec<AttributeLocation> {
        vec![self.position]
    }

    /// Locations of [`UniformName::SELECT`], in that order.
    pub fn select_uniforms(&self) -> Vec<(UniformName, Option<UniformLocation>)> {
        UniformName::SELECT
            .iter()
            .map(|&name| (name, self.get(name)))
            .collect()
    }
}
