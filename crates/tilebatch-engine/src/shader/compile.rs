use std::fmt;

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::ShaderError;

/// Program stage.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    /// Entry point every stage source must define.
    #[inline]
    pub const fn entry_point(self) -> &'static str {
        match self {
            Stage::Vertex => "vs_main",
            Stage::Fragment => "fs_main",
        }
    }

    #[inline]
    fn naga_stage(self) -> naga::ShaderStage {
        match self {
            Stage::Vertex => naga::ShaderStage::Vertex,
            Stage::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Vertex => "vertex",
            Stage::Fragment => "fragment",
        })
    }
}

/// A single parsed and validated stage.
///
/// Holds the naga IR so the linker can reflect bindings without a device.
#[derive(Debug)]
pub struct CompiledStage {
    stage: Stage,
    source: &'static str,
    module: naga::Module,
    entry_index: usize,
}

impl CompiledStage {
    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[inline]
    pub fn source(&self) -> &'static str {
        self.source
    }

    #[inline]
    pub(crate) fn module(&self) -> &naga::Module {
        &self.module
    }

    #[inline]
    pub(crate) fn entry_point(&self) -> &naga::EntryPoint {
        &self.module.entry_points[self.entry_index]
    }
}

/// Parses and validates `source` as the given stage.
///
/// Fails with [`ShaderError::Compile`] on syntax or validation errors, and when
/// the source lacks the stage's entry point.
pub fn compile_stage(stage: Stage, source: &'static str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| ShaderError::Compile {
        stage,
        message: err.emit_to_string(source),
    })?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            stage,
            message: err.into_inner().to_string(),
        })?;

    let entry_index = module
        .entry_points
        .iter()
        .position(|ep| ep.stage == stage.naga_stage() && ep.name == stage.entry_point())
        .ok_or_else(|| ShaderError::Compile {
            stage,
            message: format!("missing {stage} entry point `{}`", stage.entry_point()),
        })?;

    log::debug!("compiled {stage} stage ({} bytes of WGSL)", source.len());

    Ok(CompiledStage {
        stage,
        source,
        module,
        entry_index,
    })
}
