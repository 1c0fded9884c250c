//! Shader module loading, caching, and hot-reload.
//!
//! Program sources are stored without the noise prelude; the library
//! prepends `noise.wgsl` before compiling so every program shares it.

use log::{debug, info};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use thiserror::Error;
use wgpu::{ShaderModuleDescriptor, ShaderSource};

/// Shared noise functions and the vertex input struct.
pub const NOISE_PRELUDE: &str = include_str!("shaders/noise.wgsl");
pub const BACKGROUND_SOURCE: &str = include_str!("shaders/background.wgsl");
pub const TERRAIN_SOURCE: &str = include_str!("shaders/terrain.wgsl");
pub const OCEAN_SOURCE: &str = include_str!("shaders/ocean.wgsl");
pub const SKY_SOURCE: &str = include_str!("shaders/sky.wgsl");

const PRELUDE_FILE: &str = "noise.wgsl";
const REQUIRED_ENTRY_POINTS: [(&str, naga::ShaderStage); 2] = [
    ("vs_main", naga::ShaderStage::Vertex),
    ("fs_main", naga::ShaderStage::Fragment),
];
const UNIFORM_BINDING: naga::ResourceBinding = naga::ResourceBinding {
    group: 0,
    binding: 0,
};
/// Vertex attribute locations and widths of `PlanetVertex`.
const VERTEX_ATTRIBUTES: [(u32, naga::VectorSize); 3] = [
    (0, naga::VectorSize::Tri),
    (1, naga::VectorSize::Tri),
    (2, naga::VectorSize::Bi),
];

/// Shader loading failures.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("shader '{name}' failed to compile: {message}")]
    CompilationFailed { name: String, message: String },

    #[error("shader file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read shader file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("shader '{name}' not found in library")]
    NotLoaded { name: String },

    #[error("no shader directory configured for file-based loading")]
    NoShaderDir,
}

struct LoadedShader {
    module: Arc<wgpu::ShaderModule>,
    source: String,
}

/// Registry of compiled shader modules and their composed sources.
pub struct ShaderLibrary {
    shaders: HashMap<String, LoadedShader>,
    shader_dir: Option<PathBuf>,
}

/// Prepend the noise prelude to a program source.
pub fn compose(prelude: &str, program: &str) -> String {
    format!("{prelude}\n{program}")
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self {
            shaders: HashMap::new(),
            shader_dir: None,
        }
    }

    /// Directory to load `.wgsl` files from during development.
    pub fn with_shader_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    pub fn shader_dir(&self) -> Option<&PathBuf> {
        self.shader_dir.as_ref()
    }

    /// Compile `program` with the embedded prelude and cache it under `name`.
    pub fn load_from_source(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        program: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        self.load_composed(device, name, compose(NOISE_PRELUDE, program))
    }

    /// Compile `<shader_dir>/<name>.wgsl` with `<shader_dir>/noise.wgsl` prepended.
    pub fn load_from_file(
        &mut self,
        device: &wgpu::Device,
        name: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        let source = self.read_composed(name)?;
        self.load_composed(device, name, source)
    }

    /// Read and validate `<shader_dir>/<name>.wgsl` without compiling it.
    pub fn check_file(&self, name: &str) -> Result<(), ShaderError> {
        validate_program(name, &self.read_composed(name)?)
    }

    fn read_composed(&self, name: &str) -> Result<String, ShaderError> {
        let shader_dir = self.shader_dir.as_ref().ok_or(ShaderError::NoShaderDir)?;
        let prelude = read_shader_file(shader_dir.join(PRELUDE_FILE))?;
        let program = read_shader_file(shader_dir.join(format!("{name}.wgsl")))?;
        Ok(compose(&prelude, &program))
    }

    /// Reload a shader from the shader directory.
    pub fn reload(
        &mut self,
        device: &wgpu::Device,
        name: &str,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        info!("Reloading shader '{}'", name);
        self.load_from_file(device, name)
    }

    fn load_composed(
        &mut self,
        device: &wgpu::Device,
        name: &str,
        source: String,
    ) -> Result<Arc<wgpu::ShaderModule>, ShaderError> {
        validate_program(name, &source)?;
        debug!("Compiling shader '{}' ({} bytes)", name, source.len());

        let module = Arc::new(device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: ShaderSource::Wgsl(source.as_str().into()),
        }));

        let replaced = self
            .shaders
            .insert(
                name.to_string(),
                LoadedShader {
                    module: module.clone(),
                    source,
                },
            )
            .is_some();
        if replaced {
            info!("Replaced shader '{}'", name);
        } else {
            info!("Loaded shader '{}'", name);
        }
        Ok(module)
    }

    /// Get a previously loaded shader by name.
    pub fn get(&self, name: &str) -> Option<Arc<wgpu::ShaderModule>> {
        self.shaders.get(name).map(|s| s.module.clone())
    }

    /// Composed WGSL source of a loaded shader.
    pub fn source(&self, name: &str) -> Option<&str> {
        self.shaders.get(name).map(|s| s.source.as_str())
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

impl Default for ShaderLibrary {
    fn default() -> Self {
        Self::new()
    }
}

fn read_shader_file(path: PathBuf) -> Result<String, ShaderError> {
    if !path.exists() {
        return Err(ShaderError::FileNotFound { path });
    }
    Ok(std::fs::read_to_string(&path)?)
}

/// Parse and validate a composed program with naga before it reaches the
/// device, so a broken file is reported instead of tripping wgpu's
/// uncaptured-error handler. Also checks the interface the pipelines assume:
/// `vs_main`/`fs_main`, a single uniform at `@group(0) @binding(0)` and the
/// [`PlanetVertex`](crate::buffer::PlanetVertex) attribute locations.
pub fn validate_program(name: &str, source: &str) -> Result<(), ShaderError> {
    let failed = |message: String| ShaderError::CompilationFailed {
        name: name.to_string(),
        message,
    };

    let module =
        naga::front::wgsl::parse_str(source).map_err(|e| failed(e.emit_to_string(source)))?;
    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| failed(e.emit_to_string(source)))?;

    for (entry, stage) in REQUIRED_ENTRY_POINTS {
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == entry && ep.stage == stage)
        {
            return Err(failed(format!("missing {stage:?} entry point `{entry}`")));
        }
    }

    for (_, global) in module.global_variables.iter() {
        let Some(binding) = &global.binding else {
            continue;
        };
        if *binding != UNIFORM_BINDING || global.space != naga::AddressSpace::Uniform {
            return Err(failed(format!(
                "unexpected resource `{}` at group {} binding {}",
                global.name.as_deref().unwrap_or("?"),
                binding.group,
                binding.binding
            )));
        }
    }

    if let Some(vertex) = module
        .entry_points
        .iter()
        .find(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == "vs_main")
    {
        for (location, ty) in vertex_inputs(&module, &vertex.function) {
            let expected = VERTEX_ATTRIBUTES
                .iter()
                .find(|(l, _)| *l == location)
                .map(|(_, size)| naga::TypeInner::Vector {
                    size: *size,
                    scalar: naga::Scalar::F32,
                });
            if expected.as_ref() != Some(&module.types[ty].inner) {
                return Err(failed(format!(
                    "vertex input @location({location}) does not match the planet vertex layout"
                )));
            }
        }
    }

    Ok(())
}

/// Byte size naga computes for the uniform at `@group(0) @binding(0)`.
pub fn uniform_block_size(source: &str) -> Option<usize> {
    let module = naga::front::wgsl::parse_str(source).ok()?;
    module.global_variables.iter().find_map(|(_, global)| {
        (global.space == naga::AddressSpace::Uniform && global.binding == Some(UNIFORM_BINDING))
            .then(|| module.types[global.ty].inner.size(module.to_ctx()) as usize)
    })
}

/// `(location, type)` of every located vertex-stage input, looking through
/// struct arguments.
fn vertex_inputs(
    module: &naga::Module,
    function: &naga::Function,
) -> Vec<(u32, naga::Handle<naga::Type>)> {
    let mut inputs = Vec::new();
    for arg in &function.arguments {
        match &arg.binding {
            Some(naga::Binding::Location { location, .. }) => inputs.push((*location, arg.ty)),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    for member in members {
                        if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                            inputs.push((*location, member.ty));
                        }
                    }
                }
            }
        }
    }
    inputs
}
