//! Named parameter slots of the shading-stage programs.
//!
//! Uploads address shader parameters by name (`u_modelViewMatrix`,
//! `u_light_position[3]`, ...). A [`UniformLayout`] maps each name to a byte
//! offset and type inside one of the WGSL uniform structs, and a
//! [`UniformBlock`] is the CPU-side byte image that gets written to the GPU.
//!
//! A program may legitimately lack a slot (e.g. `u_shadingMode` only exists
//! in a combined program). Setting a missing slot is skipped, not an error.

use std::collections::HashMap;

use glam::{Mat3, Mat4};

use crate::light::MAX_LIGHTS;

/// Byte offset of `lights` inside `FrameUniforms`.
pub const LIGHTS_OFFSET: usize = 80;

/// Size of one `LightUniform` array element.
pub const LIGHT_STRIDE: usize = 96;

/// Size of `FrameUniforms`.
pub const FRAME_UNIFORMS_SIZE: usize = LIGHTS_OFFSET + LIGHT_STRIDE * MAX_LIGHTS;

/// Size of `DrawUniforms`.
pub const DRAW_UNIFORMS_SIZE: usize = 160;

/// WGSL type of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotType {
    Int,
    Float,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

/// Value written into a slot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamValue {
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl ParamValue {
    pub fn slot_type(&self) -> SlotType {
        match self {
            ParamValue::Int(_) => SlotType::Int,
            ParamValue::Float(_) => SlotType::Float,
            ParamValue::Vec3(_) => SlotType::Vec3,
            ParamValue::Vec4(_) => SlotType::Vec4,
            ParamValue::Mat3(_) => SlotType::Mat3,
            ParamValue::Mat4(_) => SlotType::Mat4,
        }
    }

    /// Bytes as laid out in a uniform buffer. `mat3x3` columns are padded
    /// to 16 bytes each.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            ParamValue::Int(v) => bytemuck::bytes_of(v).to_vec(),
            ParamValue::Float(v) => bytemuck::bytes_of(v).to_vec(),
            ParamValue::Vec3(v) => bytemuck::cast_slice(v).to_vec(),
            ParamValue::Vec4(v) => bytemuck::cast_slice(v).to_vec(),
            ParamValue::Mat3(m) => {
                let cols = m.to_cols_array_2d();
                let padded: [[f32; 4]; 3] = [
                    [cols[0][0], cols[0][1], cols[0][2], 0.0],
                    [cols[1][0], cols[1][1], cols[1][2], 0.0],
                    [cols[2][0], cols[2][1], cols[2][2], 0.0],
                ];
                bytemuck::cast_slice(&padded).to_vec()
            }
            ParamValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
        }
    }
}

/// Location of one named slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub offset: usize,
    pub ty: SlotType,
}

/// Name to slot map for one uniform struct.
#[derive(Clone, Debug)]
pub struct UniformLayout {
    label: &'static str,
    slots: HashMap<String, Slot>,
    size: usize,
}

impl UniformLayout {
    pub fn new(label: &'static str, size: usize) -> Self {
        Self {
            label,
            slots: HashMap::new(),
            size,
        }
    }

    /// Builder: declare a slot.
    pub fn slot(mut self, name: impl Into<String>, offset: usize, ty: SlotType) -> Self {
        self.slots.insert(name.into(), Slot { offset, ty });
        self
    }

    pub fn get(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Name of an indexed light slot, e.g. `u_light_axis[2]`.
pub fn light_slot(field: &str, index: usize) -> String {
    format!("u_light_{}[{}]", field, index)
}

/// Layout of `FrameUniforms` in the WGSL programs.
pub fn frame_layout() -> UniformLayout {
    let mut layout = UniformLayout::new("frame", FRAME_UNIFORMS_SIZE)
        .slot("u_projectionMatrix", 0, SlotType::Mat4)
        .slot("u_n_lights", 64, SlotType::Int);

    const FIELDS: [(&str, usize, SlotType); 9] = [
        ("ambient", 0, SlotType::Vec3),
        ("diffuse", 16, SlotType::Vec3),
        ("specular", 32, SlotType::Vec3),
        ("position", 48, SlotType::Vec4),
        ("axis", 64, SlotType::Vec3),
        ("aperture", 76, SlotType::Float),
        ("cutoff", 80, SlotType::Float),
        ("type", 84, SlotType::Int),
        ("enabled", 88, SlotType::Int),
    ];

    for i in 0..MAX_LIGHTS {
        let base = LIGHTS_OFFSET + i * LIGHT_STRIDE;
        for (field, offset, ty) in FIELDS {
            layout = layout.slot(light_slot(field, i), base + offset, ty);
        }
    }
    layout
}

/// Layout of `DrawUniforms` in the WGSL programs.
pub fn draw_layout() -> UniformLayout {
    UniformLayout::new("draw", DRAW_UNIFORMS_SIZE)
        .slot("u_modelViewMatrix", 0, SlotType::Mat4)
        .slot("u_normalMatrix", 64, SlotType::Mat3)
        .slot("u_material.Ka", 112, SlotType::Vec3)
        .slot("u_material.Kd", 128, SlotType::Vec3)
        .slot("u_material.Ks", 144, SlotType::Vec3)
        .slot("u_material.shininess", 156, SlotType::Float)
}

/// CPU-side image of one uniform struct.
#[derive(Clone, Debug)]
pub struct UniformBlock {
    layout: UniformLayout,
    bytes: Vec<u8>,
}

impl UniformBlock {
    pub fn new(layout: UniformLayout) -> Self {
        let bytes = vec![0; layout.size()];
        Self { layout, bytes }
    }

    pub fn frame() -> Self {
        Self::new(frame_layout())
    }

    pub fn draw() -> Self {
        Self::new(draw_layout())
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Write a value into a named slot.
    ///
    /// Returns false when the slot does not exist in this layout (skipped)
    /// or the value has the wrong type (rejected).
    pub fn set(&mut self, name: &str, value: ParamValue) -> bool {
        let Some(slot) = self.layout.get(name) else {
            log::trace!("No slot '{}' in {} uniforms, skipping", name, self.layout.label);
            return false;
        };
        if slot.ty != value.slot_type() {
            log::warn!(
                "Slot '{}' expects {:?}, got {:?}",
                name,
                slot.ty,
                value.slot_type()
            );
            return false;
        }

        let data = value.to_bytes();
        self.bytes[slot.offset..slot.offset + data.len()].copy_from_slice(&data);
        true
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Read a slot back (tests and debug dumps).
    pub fn read_f32(&self, name: &str, component: usize) -> Option<f32> {
        let slot = self.layout.get(name)?;
        let start = slot.offset + component * 4;
        let raw: [u8; 4] = self.bytes.get(start..start + 4)?.try_into().ok()?;
        Some(f32::from_ne_bytes(raw))
    }

    pub fn read_i32(&self, name: &str) -> Option<i32> {
        let slot = self.layout.get(name)?;
        let raw: [u8; 4] = self.bytes.get(slot.offset..slot.offset + 4)?.try_into().ok()?;
        Some(i32::from_ne_bytes(raw))
    }
}
