//! Planet preset files: encoding, decoding and slot listing.
//!
//! Two on-disk layouts are understood:
//!
//! - [`PresetFormat::Positional`]: the v1 save format. One value per
//!   line, colors split across three lines, no keys, no header. Order and
//!   count are the whole schema, so it only stores the fields listed in
//!   [`POSITIONAL_FIELDS`]; rotation, cloud speed and the light are left
//!   untouched on load.
//! - [`PresetFormat::Keyed`]: starts with [`KEYED_HEADER`] and writes one
//!   `key value...` line per field, covering every parameter.
//!
//! [`load`] detects the layout from the first line. Decoding works on a copy
//! and only replaces the caller's store once every field has parsed, so a
//! failed load never leaves a half-written store behind.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, FormatError};
use crate::params::{NoiseAlgorithm, PlanetParams, Rgb};

/// First line of a keyed preset.
pub const KEYED_HEADER: &str = "# planet-maker v2";

/// Number of whitespace-separated values in a positional preset.
pub const POSITIONAL_VALUE_COUNT: usize = 41;

/// On-disk layout of a preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresetFormat {
    /// Header-less ordered values, readable by v1 builds.
    #[default]
    Positional,
    /// Versioned `key value` lines.
    Keyed,
}

/// Typed getter/setter pair for one field of [`PlanetParams`].
#[derive(Clone, Copy)]
enum Access {
    Float(fn(&PlanetParams) -> f32, fn(&mut PlanetParams, f32)),
    Int(fn(&PlanetParams) -> i32, fn(&mut PlanetParams, i32)),
    Uint(fn(&PlanetParams) -> u32, fn(&mut PlanetParams, u32)),
    Flag(fn(&PlanetParams) -> bool, fn(&mut PlanetParams, bool)),
    Algorithm(
        fn(&PlanetParams) -> NoiseAlgorithm,
        fn(&mut PlanetParams, NoiseAlgorithm),
    ),
    Triple(fn(&PlanetParams) -> Rgb, fn(&mut PlanetParams, Rgb)),
}

impl Access {
    fn arity(self) -> usize {
        match self {
            Access::Triple(..) => 3,
            _ => 1,
        }
    }
}

/// One persisted field.
#[derive(Clone, Copy)]
pub struct Field {
    /// Stable key used by the keyed format and in error messages.
    pub key: &'static str,
    access: Access,
}

impl Field {
    /// Number of scalar values this field occupies.
    pub fn arity(&self) -> usize {
        self.access.arity()
    }
}

macro_rules! field {
    ($key:literal, $kind:ident, $($path:ident).+) => {
        Field {
            key: $key,
            access: Access::$kind(|p| p.$($path).+, |p, v| p.$($path).+ = v),
        }
    };
}

/// Fields of the positional format, in file order.
pub static POSITIONAL_FIELDS: &[Field] = &[
    field!("global.algorithm", Algorithm, global.algorithm),
    field!("sky.color", Triple, sky.color),
    field!("sky.enabled", Flag, sky.enabled),
    field!("sky.frequency", Float, sky.frequency),
    field!("sky.octaves", Int, sky.octaves),
    field!("sky.opacity", Float, sky.opacity),
    field!("sky.seed", Int, sky.seed),
    field!("terrain.color_beach", Triple, terrain.color_beach),
    field!("terrain.color_deep", Triple, terrain.color_deep),
    field!("terrain.color_grass", Triple, terrain.color_grass),
    field!("terrain.color_rock", Triple, terrain.color_rock),
    field!("terrain.color_snow", Triple, terrain.color_snow),
    field!("terrain.elevation", Float, terrain.elevation),
    field!("terrain.frag_frequency", Float, terrain.frag_frequency),
    field!("terrain.octaves", Int, terrain.octaves),
    field!("terrain.radius", Float, terrain.radius),
    field!("terrain.seed", Int, terrain.seed),
    field!("terrain.segments", Uint, terrain.segments),
    field!("terrain.vert_frequency", Float, terrain.vert_frequency),
    field!("ocean.color_1", Triple, ocean.color_1),
    field!("ocean.color_2", Triple, ocean.color_2),
    field!("ocean.enabled", Flag, ocean.enabled),
    field!("ocean.frequency", Float, ocean.frequency),
    field!("ocean.octaves", Int, ocean.octaves),
    field!("ocean.seed", Int, ocean.seed),
];

/// Fields only the keyed format carries.
static KEYED_EXTRA_FIELDS: &[Field] = &[
    field!("global.azimuth_deg", Float, global.azimuth_deg),
    field!("global.inclination_deg", Float, global.inclination_deg),
    field!("sky.speed", Float, sky.speed),
    field!("light.position", Triple, light.position),
    field!("light.intensity", Float, light.intensity),
    field!("light.shininess", Float, light.shininess),
];

fn keyed_fields() -> impl Iterator<Item = &'static Field> {
    POSITIONAL_FIELDS.iter().chain(KEYED_EXTRA_FIELDS)
}

// --- Encoding ---

fn push_values(out: &mut Vec<String>, params: &PlanetParams, access: Access) {
    match access {
        Access::Float(get, _) => out.push(get(params).to_string()),
        Access::Int(get, _) => out.push(get(params).to_string()),
        Access::Uint(get, _) => out.push(get(params).to_string()),
        Access::Flag(get, _) => out.push(u8::from(get(params)).to_string()),
        Access::Algorithm(get, _) => out.push(get(params).index().to_string()),
        Access::Triple(get, _) => out.extend(get(params).iter().map(f32::to_string)),
    }
}

/// Render `params` in the given layout.
pub fn encode(params: &PlanetParams, format: PresetFormat) -> String {
    let mut text = String::new();
    match format {
        PresetFormat::Positional => {
            let mut values = Vec::with_capacity(POSITIONAL_VALUE_COUNT);
            for field in POSITIONAL_FIELDS {
                push_values(&mut values, params, field.access);
            }
            for value in values {
                text.push_str(&value);
                text.push('\n');
            }
        }
        PresetFormat::Keyed => {
            text.push_str(KEYED_HEADER);
            text.push('\n');
            for field in keyed_fields() {
                let mut values = Vec::with_capacity(3);
                push_values(&mut values, params, field.access);
                // Writing to a String cannot fail.
                let _ = writeln!(text, "{} {}", field.key, values.join(" "));
            }
        }
    }
    text
}

// --- Decoding ---

fn parse_number<T: std::str::FromStr>(
    field: &'static str,
    token: &str,
    position: usize,
) -> Result<T, FormatError> {
    token.parse().map_err(|_| FormatError::InvalidNumber {
        field,
        token: token.to_string(),
        position,
    })
}

fn parse_float(field: &'static str, token: &str, position: usize) -> Result<f32, FormatError> {
    let value: f32 = parse_number(field, token, position)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormatError::InvalidNumber {
            field,
            token: token.to_string(),
            position,
        })
    }
}

/// Parse `tokens` (exactly `field.arity()` of them) into `params`.
fn assign(
    params: &mut PlanetParams,
    field: &Field,
    tokens: &[&str],
    position: usize,
) -> Result<(), FormatError> {
    let key = field.key;
    match field.access {
        Access::Float(_, set) => set(params, parse_float(key, tokens[0], position)?),
        Access::Int(_, set) => set(params, parse_number(key, tokens[0], position)?),
        Access::Uint(_, set) => set(params, parse_number(key, tokens[0], position)?),
        Access::Flag(_, set) => {
            let flag = match tokens[0] {
                "0" => false,
                "1" => true,
                other => {
                    return Err(FormatError::InvalidFlag {
                        field: key,
                        token: other.to_string(),
                        position,
                    });
                }
            };
            set(params, flag);
        }
        Access::Algorithm(_, set) => {
            let index: u32 = parse_number(key, tokens[0], position)?;
            let algorithm = NoiseAlgorithm::from_index(index)
                .ok_or(FormatError::InvalidAlgorithm { index, position })?;
            set(params, algorithm);
        }
        Access::Triple(_, set) => {
            let mut rgb = [0.0; 3];
            for (i, (slot, token)) in rgb.iter_mut().zip(tokens).enumerate() {
                *slot = parse_float(key, token, position + i)?;
            }
            set(params, rgb);
        }
    }
    Ok(())
}

fn decode_positional(text: &str, base: &PlanetParams) -> Result<PlanetParams, FormatError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() < POSITIONAL_VALUE_COUNT {
        return Err(FormatError::Truncated {
            expected: POSITIONAL_VALUE_COUNT,
            found: tokens.len(),
        });
    }
    if tokens.len() > POSITIONAL_VALUE_COUNT {
        log::debug!(
            "Ignoring {} trailing values in positional preset",
            tokens.len() - POSITIONAL_VALUE_COUNT
        );
    }

    let mut params = base.clone();
    let mut cursor = 0;
    for field in POSITIONAL_FIELDS {
        let arity = field.arity();
        assign(
            &mut params,
            field,
            &tokens[cursor..cursor + arity],
            cursor + 1,
        )?;
        cursor += arity;
    }
    Ok(params)
}

fn decode_keyed(text: &str, base: &PlanetParams) -> Result<PlanetParams, FormatError> {
    let mut params = base.clone();
    let mut seen: HashMap<&'static str, usize> = HashMap::new();

    for (index, line) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(key) = parts.next() else {
            continue;
        };
        let values: Vec<&str> = parts.collect();

        let field = keyed_fields()
            .find(|f| f.key == key)
            .ok_or_else(|| FormatError::UnknownKey {
                key: key.to_string(),
                line: line_no,
            })?;
        if values.len() != field.arity() {
            return Err(FormatError::Arity {
                key: field.key,
                line: line_no,
                expected: field.arity(),
                found: values.len(),
            });
        }
        if let Some(&first) = seen.get(field.key) {
            return Err(FormatError::DuplicateKey {
                key: field.key,
                line: line_no,
                first,
            });
        }
        assign(&mut params, field, &values, line_no)?;
        seen.insert(field.key, line_no);
    }

    if let Some(missing) = keyed_fields().find(|f| !seen.contains_key(f.key)) {
        return Err(FormatError::MissingKey { key: missing.key });
    }
    Ok(params)
}

/// Detect the layout of preset `text`.
pub fn detect_format(text: &str) -> PresetFormat {
    let first = text.lines().map(str::trim).find(|l| !l.is_empty());
    if first == Some(KEYED_HEADER) {
        PresetFormat::Keyed
    } else {
        PresetFormat::Positional
    }
}

/// Decode preset `text` on top of `base`.
///
/// Fields the detected layout does not carry keep their value from `base`.
pub fn decode(text: &str, base: &PlanetParams) -> Result<(PlanetParams, PresetFormat), FormatError> {
    let format = detect_format(text);
    let params = match format {
        PresetFormat::Positional => decode_positional(text, base)?,
        PresetFormat::Keyed => decode_keyed(text, base)?,
    };
    Ok((params, format))
}

// --- File operations ---

/// Write `store` to `path` in the positional layout.
pub fn save(path: &Path, store: &PlanetParams) -> Result<(), CodecError> {
    save_with(path, store, PresetFormat::Positional)
}

/// Write `store` to `path` in the given layout, creating or truncating the file.
pub fn save_with(path: &Path, store: &PlanetParams, format: PresetFormat) -> Result<(), CodecError> {
    std::fs::write(path, encode(store, format)).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("Wrote {:?} preset to {}", format, path.display());
    Ok(())
}

/// Read the preset at `path` into `store`.
///
/// On error `store` is left exactly as it was. Returns the layout that was read.
pub fn load(path: &Path, store: &mut PlanetParams) -> Result<PresetFormat, CodecError> {
    let text = std::fs::read_to_string(path).map_err(|source| CodecError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (decoded, format) = decode(&text, store)?;
    *store = decoded;
    log::debug!("Read {:?} preset from {}", format, path.display());
    Ok(format)
}

/// Names of the regular files in `dir` whose extension is `extension`
/// (with or without the leading dot), sorted lexicographically.
///
/// A missing or unreadable directory yields an empty list.
pub fn list_matching_files(dir: &Path, extension: &str) -> Vec<String> {
    let wanted = extension.trim_start_matches('.');
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("Cannot scan preset directory {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == wanted))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// Path of the preset slot `name` inside `dir`, appending `extension` unless
/// `name` already ends with it.
pub fn preset_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    let wanted = extension.trim_start_matches('.');
    let has_extension = Path::new(name)
        .extension()
        .is_some_and(|ext| ext == wanted);
    if has_extension {
        dir.join(name)
    } else {
        dir.join(format!("{name}.{wanted}"))
    }
}
