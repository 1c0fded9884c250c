//! Name-addressed uniform blocks reflected from WGSL.
//!
//! Every program declares one `var<uniform>` struct. [`UniformLayout`] reads
//! the struct's fields out of the shader source and computes their offsets
//! with the WGSL uniform address-space layout rules, so the renderer can set
//! values by field name the same way a GL program looks up uniform locations.

use std::collections::HashSet;

use glam::Mat4;

/// Types accepted in a uniform struct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    F32,
    I32,
    U32,
    Vec2,
    Vec3,
    Vec4,
    Mat4,
}

impl UniformType {
    /// Parse a WGSL type name, accepting both `vec3<f32>` and `vec3f` spellings.
    pub fn parse(ty: &str) -> Option<Self> {
        let compact: String = ty.chars().filter(|c| !c.is_whitespace()).collect();
        Some(match compact.as_str() {
            "f32" => Self::F32,
            "i32" => Self::I32,
            "u32" => Self::U32,
            "vec2<f32>" | "vec2f" => Self::Vec2,
            "vec3<f32>" | "vec3f" => Self::Vec3,
            "vec4<f32>" | "vec4f" => Self::Vec4,
            "mat4x4<f32>" | "mat4x4f" => Self::Mat4,
            _ => return None,
        })
    }

    /// Byte size in the uniform address space.
    pub fn size(self) -> usize {
        match self {
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 => 16,
            Self::Mat4 => 64,
        }
    }

    /// Required alignment in the uniform address space.
    pub fn align(self) -> usize {
        match self {
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::Vec2 => 8,
            Self::Vec3 | Self::Vec4 | Self::Mat4 => 16,
        }
    }
}

/// A value written to a uniform field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    F32(f32),
    I32(i32),
    U32(u32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn ty(&self) -> UniformType {
        match self {
            Self::F32(_) => UniformType::F32,
            Self::I32(_) => UniformType::I32,
            Self::U32(_) => UniformType::U32,
            Self::Vec2(_) => UniformType::Vec2,
            Self::Vec3(_) => UniformType::Vec3,
            Self::Vec4(_) => UniformType::Vec4,
            Self::Mat4(_) => UniformType::Mat4,
        }
    }

    fn write_to(&self, dst: &mut [u8]) {
        match self {
            Self::F32(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::I32(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::U32(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Vec2(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Vec3(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Vec4(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Mat4(m) => dst.copy_from_slice(bytemuck::bytes_of(&m.to_cols_array())),
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        Self::F32(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        Self::I32(v)
    }
}

impl From<u32> for UniformValue {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        Self::Vec3(v)
    }
}

impl From<Mat4> for UniformValue {
    fn from(m: Mat4) -> Self {
        Self::Mat4(m)
    }
}

/// Reflection failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniformLayoutError {
    #[error("struct `{0}` not found in shader source")]
    StructNotFound(String),

    #[error("struct `{0}` is not terminated")]
    Unterminated(String),

    #[error("malformed field declaration `{0}`")]
    MalformedField(String),

    #[error("field `{field}` has unsupported uniform type `{ty}`")]
    UnsupportedType { field: String, ty: String },

    #[error("struct `{0}` has no fields")]
    Empty(String),
}

/// One field of a reflected uniform struct.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformField {
    pub name: String,
    pub ty: UniformType,
    pub offset: usize,
}

/// Field offsets of a uniform struct.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformLayout {
    fields: Vec<UniformField>,
    size: usize,
}

fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

fn strip_line_comments(source: &str) -> String {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

impl UniformLayout {
    /// Reflect `struct <struct_name> { ... }` out of WGSL `source`.
    pub fn from_wgsl(source: &str, struct_name: &str) -> Result<Self, UniformLayoutError> {
        let source = strip_line_comments(source);
        let body = find_struct_body(&source, struct_name)?;

        let mut fields = Vec::new();
        let mut offset = 0;
        let mut max_align = 16;
        for decl in body.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let (name, ty_str) = decl
                .split_once(':')
                .map(|(n, t)| (n.trim(), t.trim()))
                .ok_or_else(|| UniformLayoutError::MalformedField(decl.to_string()))?;
            if name.is_empty() || name.starts_with('@') {
                return Err(UniformLayoutError::MalformedField(decl.to_string()));
            }
            let ty = UniformType::parse(ty_str).ok_or_else(|| UniformLayoutError::UnsupportedType {
                field: name.to_string(),
                ty: ty_str.to_string(),
            })?;

            offset = round_up(offset, ty.align());
            fields.push(UniformField {
                name: name.to_string(),
                ty,
                offset,
            });
            offset += ty.size();
            max_align = max_align.max(ty.align());
        }

        if fields.is_empty() {
            return Err(UniformLayoutError::Empty(struct_name.to_string()));
        }

        Ok(Self {
            fields,
            size: round_up(offset, max_align),
        })
    }

    /// Total buffer size in bytes, padded to 16.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fields(&self) -> &[UniformField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&UniformField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Locate the brace-delimited body of `struct <name>`, matching whole words only.
fn find_struct_body<'a>(source: &'a str, name: &str) -> Result<&'a str, UniformLayoutError> {
    let mut search = source;
    while let Some(pos) = search.find("struct") {
        let rest = &search[pos + "struct".len()..];
        let trimmed = rest.trim_start();
        let ident_len = trimmed
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len());
        if &trimmed[..ident_len] == name {
            let after = trimmed[ident_len..].trim_start();
            let Some(body) = after.strip_prefix('{') else {
                return Err(UniformLayoutError::StructNotFound(name.to_string()));
            };
            let end = body
                .find('}')
                .ok_or_else(|| UniformLayoutError::Unterminated(name.to_string()))?;
            return Ok(&body[..end]);
        }
        search = rest;
    }
    Err(UniformLayoutError::StructNotFound(name.to_string()))
}

/// CPU staging copy of one program's uniform buffer.
///
/// Writes to names the layout lacks are rejected and reported once per name.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    label: String,
    layout: UniformLayout,
    data: Vec<u8>,
    dirty: bool,
    warn_missing: bool,
    warned: HashSet<String>,
}

impl UniformBlock {
    pub fn new(label: impl Into<String>, layout: UniformLayout, warn_missing: bool) -> Self {
        let data = vec![0; layout.size()];
        Self {
            label: label.into(),
            layout,
            data,
            dirty: true,
            warn_missing,
            warned: HashSet::new(),
        }
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Write `value` into field `name`. Returns `false` when the struct has no
    /// such field or the field's type differs.
    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) -> bool {
        let value = value.into();
        let Some(field) = self.layout.field(name) else {
            self.report(name, "no such uniform");
            return false;
        };
        if field.ty != value.ty() {
            let ty = field.ty;
            self.report(name, &format!("expected {:?}, got {:?}", ty, value.ty()));
            return false;
        }

        let range = field.offset..field.offset + field.ty.size();
        value.write_to(&mut self.data[range]);
        self.dirty = true;
        true
    }

    fn report(&mut self, name: &str, reason: &str) {
        if self.warn_missing && self.warned.insert(name.to_string()) {
            log::warn!("{}: uniform `{}` ignored ({})", self.label, name, reason);
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Return the bytes if they changed since the last call.
    pub fn take_dirty(&mut self) -> Option<&[u8]> {
        if self.dirty {
            self.dirty = false;
            Some(&self.data)
        } else {
            None
        }
    }

    /// Names already reported as missing.
    pub fn warned_names(&self) -> impl Iterator<Item = &str> {
        self.warned.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
        // not this one
        struct Other { x: f32 }

        struct Uniforms {
            P: mat4x4<f32>,
            V: mat4x4<f32>,
            color: vec3<f32>,   // packs with the next scalar
            octaves: i32,
            uv_scale: vec2f,
            algorithm: u32,
            tint: vec4<f32>,
        };

        @group(0) @binding(0) var<uniform> u: Uniforms;
    "#;

    #[test]
    fn test_offsets_follow_uniform_alignment() {
        let layout = UniformLayout::from_wgsl(SOURCE, "Uniforms").unwrap();
        let offsets: Vec<(&str, usize)> = layout
            .fields()
            .iter()
            .map(|f| (f.name.as_str(), f.offset))
            .collect();
        assert_eq!(
            offsets,
            vec![
                ("P", 0),
                ("V", 64),
                ("color", 128),
                ("octaves", 140),
                ("uv_scale", 144),
                ("algorithm", 152),
                ("tint", 160),
            ]
        );
        assert_eq!(layout.size(), 176);
    }

    #[test]
    fn test_size_rounds_to_sixteen() {
        let layout = UniformLayout::from_wgsl("struct U { a: f32, b: f32, c: f32 }", "U").unwrap();
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn test_struct_name_matches_whole_word() {
        let source = "struct UniformsExtra { a: f32 } struct Uniforms { b: vec3f }";
        let layout = UniformLayout::from_wgsl(source, "Uniforms").unwrap();
        assert_eq!(layout.fields()[0].name, "b");
    }

    #[test]
    fn test_missing_struct_is_error() {
        assert_eq!(
            UniformLayout::from_wgsl(SOURCE, "Missing"),
            Err(UniformLayoutError::StructNotFound("Missing".to_string()))
        );
    }

    #[test]
    fn test_unsupported_type_is_error() {
        let err = UniformLayout::from_wgsl("struct U { m: mat3x3<f32> }", "U").unwrap_err();
        assert!(matches!(err, UniformLayoutError::UnsupportedType { .. }));
    }

    #[test]
    fn test_set_writes_bytes_at_offset() {
        let layout = UniformLayout::from_wgsl(SOURCE, "Uniforms").unwrap();
        let mut block = UniformBlock::new("test", layout, false);

        assert!(block.set("octaves", 7_i32));
        assert!(block.set("color", [0.25_f32, 0.5, 0.75]));

        let bytes = block.bytes();
        assert_eq!(bytemuck::pod_read_unaligned::<i32>(&bytes[140..144]), 7);
        assert_eq!(
            bytemuck::pod_read_unaligned::<[f32; 3]>(&bytes[128..140]),
            [0.25, 0.5, 0.75]
        );
    }

    #[test]
    fn test_matrix_is_column_major() {
        let layout = UniformLayout::from_wgsl(SOURCE, "Uniforms").unwrap();
        let mut block = UniformBlock::new("test", layout, false);
        let m = Mat4::from_translation(glam::Vec3::new(1.0, 2.0, 3.0));
        assert!(block.set("V", m));
        let cols = bytemuck::pod_read_unaligned::<[f32; 16]>(&block.bytes()[64..128]);
        assert_eq!(&cols[12..15], &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_name_is_rejected_and_reported_once() {
        let layout = UniformLayout::from_wgsl(SOURCE, "Uniforms").unwrap();
        let mut block = UniformBlock::new("test", layout, true);
        let before = block.bytes().to_vec();

        assert!(!block.set("nope", 1.0_f32));
        assert!(!block.set("nope", 2.0_f32));
        assert_eq!(block.bytes(), before.as_slice());
        assert_eq!(block.warned_names().collect::<Vec<_>>(), vec!["nope"]);
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let layout = UniformLayout::from_wgsl(SOURCE, "Uniforms").unwrap();
        let mut block = UniformBlock::new("test", layout, false);
        assert!(!block.set("octaves", 3.0_f32));
        assert_eq!(block.warned_names().count(), 0);
    }

    #[test]
    fn test_dirty_tracking() {
        let layout = UniformLayout::from_wgsl(SOURCE, "Uniforms").unwrap();
        let mut block = UniformBlock::new("test", layout, false);
        assert!(block.take_dirty().is_some());
        assert!(block.take_dirty().is_none());
        block.set("algorithm", 2_u32);
        assert!(block.is_dirty());
    }
}
