//! Links a vertex and a fragment stage and reflects their bindings.
//!
//! Linking happens on the naga IR, so it needs no device:
//! - every fragment input location must be written by the vertex stage with
//!   the same type
//! - a bind slot declared by both stages must hold the same resource
//! - every required attribute and uniform name must resolve

use std::collections::BTreeMap;

use super::compile::{CompiledStage, Stage};
use super::locations::{AttributeLocation, BindingSlot, ProgramLocations, UniformLocation, UniformName};
use super::source::{ATLAS_SAMPLER, ATLAS_TEXTURE, ATTR_POSITION, UNIFORM_BLOCK};
use super::ShaderError;

/// Resource kind of a reflected binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    UniformBuffer {
        size: u32,
        /// `(member name, byte offset)` in declaration order.
        members: Vec<(String, u32)>,
    },
    Texture,
    Sampler,
}

/// A resource binding of the linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramBinding {
    pub name: String,
    pub slot: BindingSlot,
    pub kind: BindingKind,
    pub visibility: wgpu::ShaderStages,
}

/// Vertex + fragment stage pair with resolved locations.
#[derive(Debug)]
pub struct LinkedProgram {
    vertex: CompiledStage,
    fragment: CompiledStage,
    bindings: Vec<ProgramBinding>,
    locations: ProgramLocations,
}

impl LinkedProgram {
    #[inline]
    pub fn vertex(&self) -> &CompiledStage {
        &self.vertex
    }

    #[inline]
    pub fn fragment(&self) -> &CompiledStage {
        &self.fragment
    }

    /// Bindings ordered by `(group, binding)`.
    #[inline]
    pub fn bindings(&self) -> &[ProgramBinding] {
        &self.bindings
    }

    #[inline]
    pub fn locations(&self) -> &ProgramLocations {
        &self.locations
    }
}

pub fn link(vertex: CompiledStage, fragment: CompiledStage) -> Result<LinkedProgram, ShaderError> {
    if vertex.stage() != Stage::Vertex || fragment.stage() != Stage::Fragment {
        return Err(ShaderError::Link(format!(
            "expected vertex + fragment stages, got {} + {}",
            vertex.stage(),
            fragment.stage()
        )));
    }

    check_interface(&vertex, &fragment)?;

    let mut merged: BTreeMap<(u32, u32), ProgramBinding> = BTreeMap::new();
    for (stage, visibility) in [
        (&vertex, wgpu::ShaderStages::VERTEX),
        (&fragment, wgpu::ShaderStages::FRAGMENT),
    ] {
        for binding in reflect_bindings(stage, visibility)? {
            let key = (binding.slot.group, binding.slot.binding);
            match merged.get_mut(&key) {
                None => {
                    merged.insert(key, binding);
                }
                Some(existing) => {
                    if existing.name != binding.name || existing.kind != binding.kind {
                        return Err(ShaderError::Link(format!(
                            "stages disagree on @group({}) @binding({}): `{}` vs `{}`",
                            key.0, key.1, existing.name, binding.name
                        )));
                    }
                    existing.visibility |= binding.visibility;
                }
            }
        }
    }
    let bindings: Vec<ProgramBinding> = merged.into_values().collect();

    let locations = resolve_locations(&vertex, &bindings)?;

    log::debug!(
        "linked program: {} bindings, a_position @location({})",
        bindings.len(),
        locations.position.0
    );

    Ok(LinkedProgram {
        vertex,
        fragment,
        bindings,
        locations,
    })
}

// ── interface ─────────────────────────────────────────────────────────────

fn check_interface(vertex: &CompiledStage, fragment: &CompiledStage) -> Result<(), ShaderError> {
    let vs_module = vertex.module();
    let mut outputs: BTreeMap<u32, &naga::TypeInner> = BTreeMap::new();
    if let Some(result) = &vertex.entry_point().function.result {
        collect_locations(vs_module, result.ty, result.binding.as_ref(), &mut outputs);
    }

    let fs_module = fragment.module();
    let mut inputs: BTreeMap<u32, &naga::TypeInner> = BTreeMap::new();
    for arg in &fragment.entry_point().function.arguments {
        collect_locations(fs_module, arg.ty, arg.binding.as_ref(), &mut inputs);
    }

    for (location, input_ty) in inputs {
        match outputs.get(&location) {
            None => {
                return Err(ShaderError::Link(format!(
                    "fragment input @location({location}) is not written by the vertex stage"
                )));
            }
            Some(output_ty) if *output_ty != input_ty => {
                return Err(ShaderError::Link(format!(
                    "@location({location}) type differs between stages"
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// Gathers user locations of a value, descending into struct members.
fn collect_locations<'m>(
    module: &'m naga::Module,
    ty: naga::Handle<naga::Type>,
    binding: Option<&naga::Binding>,
    out: &mut BTreeMap<u32, &'m naga::TypeInner>,
) {
    match binding {
        Some(naga::Binding::Location { location, .. }) => {
            out.insert(*location, &module.types[ty].inner);
        }
        Some(naga::Binding::BuiltIn(_)) => {}
        None => {
            if let naga::TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_locations(module, member.ty, member.binding.as_ref(), out);
                }
            }
        }
    }
}

// ── bindings ──────────────────────────────────────────────────────────────

fn reflect_bindings(
    stage: &CompiledStage,
    visibility: wgpu::ShaderStages,
) -> Result<Vec<ProgramBinding>, ShaderError> {
    let module = stage.module();
    let mut bindings = Vec::new();

    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        let name = var.name.clone().unwrap_or_default();

        // The program is drawn with a single bind group.
        if rb.group != 0 {
            return Err(ShaderError::Link(format!(
                "`{name}` uses @group({}); only group 0 is supported",
                rb.group
            )));
        }

        let kind = match (&var.space, &module.types[var.ty].inner) {
            (naga::AddressSpace::Uniform, naga::TypeInner::Struct { members, span }) => {
                BindingKind::UniformBuffer {
                    size: *span,
                    members: members
                        .iter()
                        .map(|m| (m.name.clone().unwrap_or_default(), m.offset))
                        .collect(),
                }
            }
            (naga::AddressSpace::Handle, naga::TypeInner::Image { .. }) => BindingKind::Texture,
            (naga::AddressSpace::Handle, naga::TypeInner::Sampler { .. }) => BindingKind::Sampler,
            _ => {
                return Err(ShaderError::Link(format!(
                    "unsupported resource `{name}` in {} stage",
                    stage.stage()
                )));
            }
        };

        bindings.push(ProgramBinding {
            name,
            slot: BindingSlot {
                group: rb.group,
                binding: rb.binding,
            },
            kind,
            visibility,
        });
    }

    Ok(bindings)
}

// ── location resolution ───────────────────────────────────────────────────

fn resolve_locations(
    vertex: &CompiledStage,
    bindings: &[ProgramBinding],
) -> Result<ProgramLocations, ShaderError> {
    let position = vertex
        .entry_point()
        .function
        .arguments
        .iter()
        .find(|arg| arg.name.as_deref() == Some(ATTR_POSITION))
        .and_then(|arg| match arg.binding {
            Some(naga::Binding::Location { location, .. }) => Some(AttributeLocation(location)),
            _ => None,
        })
        .ok_or(ShaderError::MissingBinding {
            name: ATTR_POSITION,
        })?;

    let find = |name: &str| bindings.iter().find(|b| b.name == name);

    let block = find(UNIFORM_BLOCK).ok_or(ShaderError::MissingBinding {
        name: UNIFORM_BLOCK,
    })?;
    let BindingKind::UniformBuffer { size, members } = &block.kind else {
        return Err(ShaderError::MissingBinding {
            name: UNIFORM_BLOCK,
        });
    };

    let atlas = find(ATLAS_TEXTURE)
        .filter(|b| b.kind == BindingKind::Texture)
        .ok_or(ShaderError::MissingBinding {
            name: ATLAS_TEXTURE,
        })?;
    let sampler = find(ATLAS_SAMPLER)
        .filter(|b| b.kind == BindingKind::Sampler)
        .ok_or(ShaderError::MissingBinding {
            name: ATLAS_SAMPLER,
        })?;

    let member = |name: UniformName| -> Option<UniformLocation> {
        members
            .iter()
            .find(|(member, _)| member == name.wgsl_name())
            .map(|&(_, offset)| UniformLocation::Member {
                slot: block.slot,
                offset,
            })
    };
    let required = |name: UniformName| {
        member(name).ok_or(ShaderError::MissingBinding {
            name: name.wgsl_name(),
        })
    };

    Ok(ProgramLocations {
        position,
        uniform_block: block.slot,
        uniform_block_size: *size,
        atlas_sampler: sampler.slot,
        image_sampler: UniformLocation::Texture { slot: atlas.slot },
        sampler_resolution: required(UniformName::SamplerResolution)?,
        resolution: required(UniformName::Resolution)?,
        matrix_scale: required(UniformName::MatrixScale)?,
        matrix_pos: required(UniformName::MatrixPos)?,
        alpha: required(UniformName::Alpha)?,
        transform_mode: required(UniformName::TransformMode)?,
        centre_offset: member(UniformName::CentreOffset),
        scale: member(UniformName::Scale),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::shader::compile::compile_stage;
    use crate::shader::source::{FRAGMENT_SOURCE, VERTEX_SOURCE};

    fn fixed_program() -> LinkedProgram {
        let vs = compile_stage(Stage::Vertex, VERTEX_SOURCE).unwrap();
        let fs = compile_stage(Stage::Fragment, FRAGMENT_SOURCE).unwrap();
        link(vs, fs).unwrap()
    }

    #[test]
    fn resolves_position_attribute() {
        let program = fixed_program();
        assert_eq!(program.locations().position, AttributeLocation(0));
        assert_eq!(program.locations().attributes(), vec![AttributeLocation(0)]);
    }

    #[test]
    fn required_uniforms_are_distinct() {
        let program = fixed_program();
        let locs = program.locations();
        let resolved: HashSet<UniformLocation> = UniformName::REQUIRED
            .iter()
            .map(|&n| locs.get(n).unwrap())
            .collect();
        assert_eq!(resolved.len(), UniformName::REQUIRED.len());
    }

    #[test]
    fn reserved_uniforms_resolve_as_block_members() {
        let program = fixed_program();
        let locs = program.locations();
        assert!(matches!(locs.centre_offset, Some(UniformLocation::Member { .. })));
        assert!(matches!(locs.scale, Some(UniformLocation::Member { .. })));
    }

    #[test]
    fn select_list_order() {
        let program = fixed_program();
        let names: Vec<UniformName> = program
            .locations()
            .select_uniforms()
            .into_iter()
            .map(|(n, _)| n)
            .collect();
        assert_eq!(names, UniformName::SELECT.to_vec());
    }

    #[test]
    fn uniform_block_visible_to_both_stages() {
        let program = fixed_program();
        let block = program.bindings().iter().find(|b| b.name == "u").unwrap();
        assert_eq!(
            block.visibility,
            wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT
        );
        assert_eq!(program.locations().uniform_block_size, 64);

        let atlas = program.bindings().iter().find(|b| b.name == "atlas").unwrap();
        assert_eq!(atlas.visibility, wgpu::ShaderStages::FRAGMENT);
    }

    #[test]
    fn unmatched_fragment_input_fails() {
        let fs_src = "\
struct FsIn { @location(3) tint: vec4<f32> }
@fragment fn fs_main(frag: FsIn) -> @location(0) vec4<f32> { return frag.tint; }";
        let vs = compile_stage(Stage::Vertex, VERTEX_SOURCE).unwrap();
        let fs = compile_stage(Stage::Fragment, fs_src).unwrap();
        let err = link(vs, fs).unwrap_err();
        assert!(matches!(err, ShaderError::Link(msg) if msg.contains("@location(3)")));
    }

    #[test]
    fn mismatched_input_type_fails() {
        let fs_src = "\
@fragment fn fs_main(@location(0) uv: vec4<f32>) -> @location(0) vec4<f32> { return uv; }";
        let vs = compile_stage(Stage::Vertex, VERTEX_SOURCE).unwrap();
        let fs = compile_stage(Stage::Fragment, fs_src).unwrap();
        assert!(matches!(link(vs, fs), Err(ShaderError::Link(_))));
    }

    #[test]
    fn missing_atlas_is_reported() {
        let fs_src = "\
@fragment fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}";
        let vs = compile_stage(Stage::Vertex, VERTEX_SOURCE).unwrap();
        let fs = compile_stage(Stage::Fragment, fs_src).unwrap();
        assert_eq!(
            link(vs, fs).unwrap_err(),
            ShaderError::MissingBinding { name: "atlas" }
        );
    }

    #[test]
    fn conflicting_slot_fails() {
        let fs_src = "\
@group(0) @binding(0) var atlas: texture_2d<f32>;
@group(0) @binding(2) var atlas_sampler: sampler;
@fragment fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(atlas, atlas_sampler, uv);
}";
        let vs = compile_stage(Stage::Vertex, VERTEX_SOURCE).unwrap();
        let fs = compile_stage(Stage::Fragment, fs_src).unwrap();
        assert!(matches!(link(vs, fs), Err(ShaderError::Link(_))));
    }
}
