use std::collections::BTreeMap;
use std::fmt;

use wgpu::naga;

use crate::types::{AdjustmentParameters, Dimensions, TransformParameters};

/// Group/binding of the parameter block every stage reads from.
pub(crate) const PARAMS_GROUP: u32 = 0;
pub(crate) const PARAMS_BINDING: u32 = 0;

/// Host-side value for a single uniform update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    IVec2([i32; 2]),
    IVec3([i32; 3]),
    IVec4([i32; 4]),
}

impl UniformValue {
    fn bytes(&self) -> &[u8] {
        match self {
            UniformValue::Scalar(value) => bytemuck::bytes_of(value),
            UniformValue::Vec2(value) => bytemuck::bytes_of(value),
            UniformValue::Vec3(value) => bytemuck::bytes_of(value),
            UniformValue::Vec4(value) => bytemuck::bytes_of(value),
            UniformValue::Int(value) => bytemuck::bytes_of(value),
            UniformValue::IVec2(value) => bytemuck::bytes_of(value),
            UniformValue::IVec3(value) => bytemuck::bytes_of(value),
            UniformValue::IVec4(value) => bytemuck::bytes_of(value),
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            UniformValue::Scalar(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Int(_) => "int",
            UniformValue::IVec2(_) => "ivec2",
            UniformValue::IVec3(_) => "ivec3",
            UniformValue::IVec4(_) => "ivec4",
        }
    }
}

/// Declared GPU type of a uniform, as found in the linked program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    IVec2,
    IVec3,
    IVec4,
    Bool,
    BVec2,
    BVec3,
    BVec4,
}

impl UniformType {
    /// Booleans are fed through the integer path, as in GL.
    pub fn accepts(self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (UniformType::Float, UniformValue::Scalar(_))
                | (UniformType::Vec2, UniformValue::Vec2(_))
                | (UniformType::Vec3, UniformValue::Vec3(_))
                | (UniformType::Vec4, UniformValue::Vec4(_))
                | (UniformType::Int | UniformType::Bool, UniformValue::Int(_))
                | (UniformType::IVec2 | UniformType::BVec2, UniformValue::IVec2(_))
                | (UniformType::IVec3 | UniformType::BVec3, UniformValue::IVec3(_))
                | (UniformType::IVec4 | UniformType::BVec4, UniformValue::IVec4(_))
        )
    }

    fn from_naga(inner: &naga::TypeInner) -> Option<Self> {
        use naga::{ScalarKind, TypeInner, VectorSize};

        let (kind, size) = match inner {
            TypeInner::Scalar(scalar) if scalar.width == 4 => (scalar.kind, None),
            TypeInner::Vector { size, scalar } if scalar.width == 4 => (scalar.kind, Some(*size)),
            _ => return None,
        };
        let ty = match (kind, size) {
            (ScalarKind::Float, None) => UniformType::Float,
            (ScalarKind::Float, Some(VectorSize::Bi)) => UniformType::Vec2,
            (ScalarKind::Float, Some(VectorSize::Tri)) => UniformType::Vec3,
            (ScalarKind::Float, Some(VectorSize::Quad)) => UniformType::Vec4,
            (ScalarKind::Sint, None) => UniformType::Int,
            (ScalarKind::Sint, Some(VectorSize::Bi)) => UniformType::IVec2,
            (ScalarKind::Sint, Some(VectorSize::Tri)) => UniformType::IVec3,
            (ScalarKind::Sint, Some(VectorSize::Quad)) => UniformType::IVec4,
            (ScalarKind::Bool, None) => UniformType::Bool,
            (ScalarKind::Bool, Some(VectorSize::Bi)) => UniformType::BVec2,
            (ScalarKind::Bool, Some(VectorSize::Tri)) => UniformType::BVec3,
            (ScalarKind::Bool, Some(VectorSize::Quad)) => UniformType::BVec4,
            _ => return None,
        };
        Some(ty)
    }

    fn byte_len(self) -> usize {
        match self {
            UniformType::Float | UniformType::Int | UniformType::Bool => 4,
            UniformType::Vec2 | UniformType::IVec2 | UniformType::BVec2 => 8,
            UniformType::Vec3 | UniformType::IVec3 | UniformType::BVec3 => 12,
            UniformType::Vec4 | UniformType::IVec4 | UniformType::BVec4 => 16,
        }
    }
}

impl fmt::Display for UniformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformType::Float => "float",
            UniformType::Vec2 => "vec2",
            UniformType::Vec3 => "vec3",
            UniformType::Vec4 => "vec4",
            UniformType::Int => "int",
            UniformType::IVec2 => "ivec2",
            UniformType::IVec3 => "ivec3",
            UniformType::IVec4 => "ivec4",
            UniformType::Bool => "bool",
            UniformType::BVec2 => "bvec2",
            UniformType::BVec3 => "bvec3",
            UniformType::BVec4 => "bvec4",
        };
        f.write_str(name)
    }
}

/// Location of a uniform inside the parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformHandle {
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDescriptor {
    pub name: String,
    pub ty: UniformType,
    pub handle: UniformHandle,
}

/// Every uniform of the linked program, discovered once by reflection.
#[derive(Debug, Clone, Default)]
pub struct UniformTable {
    entries: BTreeMap<String, UniformDescriptor>,
    block_size: u32,
}

impl UniformTable {
    /// Collects the members of the parameter block across all stages.
    ///
    /// Stages may each declare the block; a member that appears twice must
    /// agree on type and offset.
    pub fn reflect(modules: &[&naga::Module]) -> Result<Self, String> {
        let mut table = UniformTable::default();
        for module in modules {
            for (_, global) in module.global_variables.iter() {
                if global.space != naga::AddressSpace::Uniform {
                    continue;
                }
                let Some(binding) = global.binding.as_ref() else {
                    continue;
                };
                let naga::TypeInner::Struct { members, span } = &module.types[global.ty].inner
                else {
                    continue;
                };
                if binding.group != PARAMS_GROUP || binding.binding != PARAMS_BINDING {
                    return Err(format!(
                        "uniform block {} is bound at ({}, {}); only ({PARAMS_GROUP}, {PARAMS_BINDING}) is supported",
                        global.name.as_deref().unwrap_or("<anonymous>"),
                        binding.group,
                        binding.binding
                    ));
                }
                table.block_size = table.block_size.max(*span);
                for member in members {
                    let Some(name) = member.name.as_deref() else {
                        continue;
                    };
                    let Some(ty) = UniformType::from_naga(&module.types[member.ty].inner) else {
                        tracing::debug!(uniform = name, "skipping uniform of unsupported type");
                        continue;
                    };
                    table.insert(UniformDescriptor {
                        name: name.to_string(),
                        ty,
                        handle: UniformHandle {
                            offset: member.offset,
                        },
                    })?;
                }
            }
        }
        Ok(table)
    }

    fn insert(&mut self, descriptor: UniformDescriptor) -> Result<(), String> {
        if let Some(existing) = self.entries.get(&descriptor.name) {
            if *existing != descriptor {
                return Err(format!(
                    "uniform {} declared as {} at offset {} and {} at offset {}",
                    descriptor.name,
                    existing.ty,
                    existing.handle.offset,
                    descriptor.ty,
                    descriptor.handle.offset
                ));
            }
            return Ok(());
        }
        self.entries.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&UniformDescriptor> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UniformDescriptor> {
        self.entries.values()
    }

    /// Size of the uniform buffer backing the block, padded to 16 bytes.
    pub fn block_size(&self) -> u32 {
        self.block_size.max(16).next_multiple_of(16)
    }
}

/// Outcome of staging a single uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformUpdate {
    Applied,
    Unknown,
    Mismatch,
}

/// Host mirror of the parameter block, uploaded once per draw.
pub(crate) struct UniformBlock {
    table: UniformTable,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(table: UniformTable) -> Self {
        let bytes = vec![0; table.block_size() as usize];
        Self { table, bytes }
    }

    pub fn table(&self) -> &UniformTable {
        &self.table
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Unknown names and shape mismatches are logged and skipped so one bad
    /// uniform never aborts a frame.
    pub fn set(&mut self, name: &str, value: UniformValue) -> UniformUpdate {
        let Some(descriptor) = self.table.get(name) else {
            tracing::warn!(uniform = name, "unknown uniform name");
            return UniformUpdate::Unknown;
        };
        if !descriptor.ty.accepts(&value) {
            tracing::warn!(
                uniform = name,
                declared = %descriptor.ty,
                provided = value.shape(),
                "uniform value does not match declared type"
            );
            return UniformUpdate::Mismatch;
        }
        let start = descriptor.handle.offset as usize;
        let payload = value.bytes();
        debug_assert_eq!(payload.len(), descriptor.ty.byte_len());
        match self.bytes.get_mut(start..start + payload.len()) {
            Some(slot) => {
                slot.copy_from_slice(payload);
                UniformUpdate::Applied
            }
            None => {
                tracing::warn!(uniform = name, offset = start, "uniform lies outside its block");
                UniformUpdate::Mismatch
            }
        }
    }
}

/// The uniforms pushed for every draw, in push order.
///
/// `sharpness`, `grain` and `vignette` have no shader counterpart.
pub fn uniform_plan(
    source: Dimensions,
    transform: &TransformParameters,
    adjustments: &AdjustmentParameters,
) -> [(&'static str, UniformValue); 12] {
    [
        (
            "sourceAspectRatio",
            UniformValue::Scalar(source.aspect_ratio()),
        ),
        ("desqueezeAspect", UniformValue::Vec2(transform.desqueeze())),
        ("translation", UniformValue::Vec2(transform.translation())),
        ("rotation", UniformValue::Scalar(transform.adjust)),
        ("brightness", UniformValue::Scalar(adjustments.brightness)),
        ("exposure", UniformValue::Scalar(adjustments.exposure)),
        ("contrast", UniformValue::Scalar(adjustments.contrast)),
        ("highlights", UniformValue::Scalar(adjustments.highlights)),
        ("shadows", UniformValue::Scalar(adjustments.shadows)),
        ("saturation", UniformValue::Scalar(adjustments.saturation)),
        ("warmth", UniformValue::Scalar(adjustments.warmth)),
        ("tint", UniformValue::Scalar(adjustments.tint)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::reflect_program;

    fn block() -> UniformBlock {
        UniformBlock::new(reflect_program().unwrap())
    }

    fn read_f32(block: &UniformBlock, name: &str) -> f32 {
        let offset = block.table().get(name).unwrap().handle.offset as usize;
        bytemuck::pod_read_unaligned(&block.bytes()[offset..offset + 4])
    }

    #[test]
    fn scalar_updates_land_at_reflected_offsets() {
        let mut block = block();
        assert_eq!(
            block.set("exposure", UniformValue::Scalar(0.75)),
            UniformUpdate::Applied
        );
        assert_eq!(read_f32(&block, "exposure"), 0.75);
        assert_eq!(read_f32(&block, "brightness"), 0.0);
    }

    #[test]
    fn vector_updates_write_every_component() {
        let mut block = block();
        block.set("translation", UniformValue::Vec2([0.25, -0.125]));
        let offset = block.table().get("translation").unwrap().handle.offset as usize;
        let written: [f32; 2] = bytemuck::pod_read_unaligned(&block.bytes()[offset..offset + 8]);
        assert_eq!(written, [0.25, -0.125]);
    }

    #[test]
    fn unknown_uniform_is_skipped() {
        let mut block = block();
        let before = block.bytes().to_vec();
        assert_eq!(
            block.set("vignette", UniformValue::Scalar(1.0)),
            UniformUpdate::Unknown
        );
        assert_eq!(block.bytes(), before.as_slice());
    }

    #[test]
    fn mismatched_shape_is_skipped() {
        let mut block = block();
        block.set("rotation", UniformValue::Scalar(0.5));
        assert_eq!(
            block.set("rotation", UniformValue::Vec2([1.0, 2.0])),
            UniformUpdate::Mismatch
        );
        assert_eq!(
            block.set("contrast", UniformValue::Int(1)),
            UniformUpdate::Mismatch
        );
        assert_eq!(read_f32(&block, "rotation"), 0.5);
    }

    #[test]
    fn bool_types_take_integer_values() {
        assert!(UniformType::Bool.accepts(&UniformValue::Int(1)));
        assert!(UniformType::BVec3.accepts(&UniformValue::IVec3([1, 0, 1])));
        assert!(!UniformType::Bool.accepts(&UniformValue::Scalar(1.0)));
        assert!(!UniformType::Vec3.accepts(&UniformValue::Vec4([0.0; 4])));
    }

    #[test]
    fn plan_covers_the_table_exactly() {
        let table = reflect_program().unwrap();
        let plan = uniform_plan(
            Dimensions::new(4000, 3000),
            &TransformParameters::identity(),
            &AdjustmentParameters::identity(),
        );
        assert_eq!(plan.len(), table.len());
        for (name, value) in plan {
            let descriptor = table.get(name).unwrap();
            assert!(descriptor.ty.accepts(&value), "{name} shape");
        }
    }

    #[test]
    fn plan_passes_values_through_unclamped() {
        let adjustments = AdjustmentParameters {
            saturation: 5.0,
            exposure: -3.5,
            ..AdjustmentParameters::identity()
        };
        let transform = TransformParameters {
            cx: 0.75,
            cy: 0.25,
            adjust: 0.1,
            ..TransformParameters::identity()
        };
        let plan = uniform_plan(Dimensions::new(200, 100), &transform, &adjustments);
        let lookup = |name: &str| plan.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);

        assert_eq!(lookup("saturation"), Some(UniformValue::Scalar(5.0)));
        assert_eq!(lookup("exposure"), Some(UniformValue::Scalar(-3.5)));
        assert_eq!(lookup("translation"), Some(UniformValue::Vec2([0.25, -0.25])));
        assert_eq!(lookup("rotation"), Some(UniformValue::Scalar(0.1)));
        assert_eq!(lookup("sourceAspectRatio"), Some(UniformValue::Scalar(0.5)));
        assert_eq!(lookup("sharpness"), None);
    }
}
