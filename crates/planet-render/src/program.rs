//! Render pipelines paired with their reflected uniform blocks.

use std::num::NonZeroU64;

use crate::buffer::PlanetVertex;
use crate::depth::DepthBuffer;
use crate::orchestrator::PassKind;
use crate::shader::{
    BACKGROUND_SOURCE, OCEAN_SOURCE, SKY_SOURCE, ShaderError, ShaderLibrary, TERRAIN_SOURCE,
    uniform_block_size,
};
use crate::uniform::{UniformBlock, UniformLayout, UniformLayoutError, UniformValue};

/// Name of the uniform struct every program declares.
pub const UNIFORM_STRUCT: &str = "Uniforms";

/// Program construction failures.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error("program '{pass}' uniform layout: {source}")]
    Layout {
        pass: &'static str,
        #[source]
        source: UniformLayoutError,
    },
}

/// Fixed-function state that differs between passes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassState {
    pub depth_write: bool,
    pub blend: Option<wgpu::BlendState>,
    pub cull_mode: Option<wgpu::Face>,
}

impl PassState {
    pub fn for_pass(pass: PassKind) -> Self {
        match pass {
            // Viewed from inside, behind everything.
            PassKind::Background => Self {
                depth_write: false,
                blend: None,
                cull_mode: None,
            },
            PassKind::Terrain => Self {
                depth_write: true,
                blend: None,
                cull_mode: Some(wgpu::Face::Back),
            },
            PassKind::Ocean => Self {
                depth_write: true,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                cull_mode: Some(wgpu::Face::Back),
            },
            PassKind::Sky => Self {
                depth_write: false,
                blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                cull_mode: Some(wgpu::Face::Back),
            },
        }
    }
}

/// Embedded WGSL for a pass.
pub fn embedded_source(pass: PassKind) -> &'static str {
    match pass {
        PassKind::Background => BACKGROUND_SOURCE,
        PassKind::Terrain => TERRAIN_SOURCE,
        PassKind::Ocean => OCEAN_SOURCE,
        PassKind::Sky => SKY_SOURCE,
    }
}

/// One pass's pipeline, uniform buffer and CPU-side uniform block.
pub struct ShaderProgram {
    pass: PassKind,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    block: UniformBlock,
}

impl ShaderProgram {
    /// Build the program for `pass` from a module and its composed source.
    pub fn new(
        device: &wgpu::Device,
        pass: PassKind,
        module: &wgpu::ShaderModule,
        source: &str,
        color_format: wgpu::TextureFormat,
        warn_missing: bool,
    ) -> Result<Self, ProgramError> {
        let layout = UniformLayout::from_wgsl(source, UNIFORM_STRUCT).map_err(|source| {
            ProgramError::Layout {
                pass: pass.name(),
                source,
            }
        })?;
        if let Some(size) = uniform_block_size(source)
            && size > layout.size()
        {
            return Err(ShaderError::CompilationFailed {
                name: pass.name().to_string(),
                message: format!(
                    "uniform struct needs {size} bytes but only {} were reflected",
                    layout.size()
                ),
            }
            .into());
        }
        let block_size = layout.size() as u64;
        let block = UniformBlock::new(pass.name(), layout, warn_missing);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{}-uniforms", pass.name())),
            size: block_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{}-bind-group-layout", pass.name())),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(block_size),
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{}-bind-group", pass.name())),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}-pipeline-layout", pass.name())),
            bind_group_layouts: &[&bind_group_layout],
            immediate_size: 0,
        });

        let state = PassState::for_pass(pass);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{}-pipeline", pass.name())),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module,
                entry_point: Some("vs_main"),
                buffers: &[PlanetVertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: state.cull_mode,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DepthBuffer::FORMAT,
                depth_write_enabled: state.depth_write,
                depth_compare: DepthBuffer::COMPARE_FUNCTION,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: state.blend,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        Ok(Self {
            pass,
            pipeline,
            uniform_buffer,
            bind_group,
            block,
        })
    }

    pub fn pass(&self) -> PassKind {
        self.pass
    }

    pub fn block(&self) -> &UniformBlock {
        &self.block
    }

    /// Stage a uniform write; see [`UniformBlock::set`].
    pub fn set_uniform(&mut self, name: &str, value: UniformValue) -> bool {
        self.block.set(name, value)
    }

    /// Copy staged uniforms to the GPU if they changed.
    pub fn flush(&mut self, queue: &wgpu::Queue) {
        if let Some(bytes) = self.block.take_dirty() {
            queue.write_buffer(&self.uniform_buffer, 0, bytes);
        }
    }

    /// Set pipeline and bind group on `render_pass`.
    pub fn bind(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
    }
}

/// The four planet programs, indexed by [`PassKind`].
pub struct ProgramSet {
    programs: [ShaderProgram; 4],
}

impl ProgramSet {
    /// Compile every program into `library` (from its shader directory when
    /// set, otherwise from the embedded sources) and build the pipelines.
    pub fn load(
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        color_format: wgpu::TextureFormat,
        warn_missing: bool,
    ) -> Result<Self, ProgramError> {
        for pass in PassKind::ORDER {
            if library.shader_dir().is_some() {
                library.load_from_file(device, pass.name())?;
            } else {
                library.load_from_source(device, pass.name(), embedded_source(pass))?;
            }
        }
        Self::build(device, library, color_format, warn_missing)
    }

    /// Build pipelines from shaders already in `library`.
    pub fn build(
        device: &wgpu::Device,
        library: &ShaderLibrary,
        color_format: wgpu::TextureFormat,
        warn_missing: bool,
    ) -> Result<Self, ProgramError> {
        let [background, terrain, ocean, sky] = PassKind::ORDER.map(
            |pass| -> Result<ShaderProgram, ProgramError> {
                let not_loaded = || ShaderError::NotLoaded {
                    name: pass.name().to_string(),
                };
                let module = library.get(pass.name()).ok_or_else(not_loaded)?;
                let source = library.source(pass.name()).ok_or_else(not_loaded)?;
                ShaderProgram::new(device, pass, &module, source, color_format, warn_missing)
            },
        );
        Ok(Self {
            programs: [background?, terrain?, ocean?, sky?],
        })
    }

    /// Re-read every program from the shader directory. Every file is
    /// validated before any is compiled; on failure the current programs and
    /// library entries stay in place.
    pub fn reload(
        &mut self,
        device: &wgpu::Device,
        library: &mut ShaderLibrary,
        color_format: wgpu::TextureFormat,
        warn_missing: bool,
    ) -> Result<(), ProgramError> {
        for pass in PassKind::ORDER {
            library.check_file(pass.name())?;
        }
        for pass in PassKind::ORDER {
            library.reload(device, pass.name())?;
        }
        *self = Self::build(device, library, color_format, warn_missing)?;
        log::info!("Reloaded {} shader programs", self.programs.len());
        Ok(())
    }

    pub fn get(&self, pass: PassKind) -> &ShaderProgram {
        &self.programs[pass.index()]
    }

    pub fn get_mut(&mut self, pass: PassKind) -> &mut ShaderProgram {
        &mut self.programs[pass.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translucent_passes_blend() {
        assert!(PassState::for_pass(PassKind::Ocean).blend.is_some());
        assert!(PassState::for_pass(PassKind::Sky).blend.is_some());
        assert!(PassState::for_pass(PassKind::Terrain).blend.is_none());
    }

    #[test]
    fn test_background_and_sky_skip_depth_writes() {
        assert!(!PassState::for_pass(PassKind::Background).depth_write);
        assert!(!PassState::for_pass(PassKind::Sky).depth_write);
        assert!(PassState::for_pass(PassKind::Terrain).depth_write);
        assert_eq!(PassState::for_pass(PassKind::Background).cull_mode, None);
    }

    #[test]
    fn test_embedded_program_set_builds() {
        let Some((device, queue)) = crate::test_device() else {
            return;
        };
        let mut library = ShaderLibrary::new();
        let mut programs = ProgramSet::load(
            &device,
            &mut library,
            wgpu::TextureFormat::Bgra8UnormSrgb,
            true,
        )
        .unwrap();

        assert_eq!(library.len(), 4);
        for pass in PassKind::ORDER {
            assert_eq!(programs.get(pass).pass(), pass);
        }

        let terrain = programs.get_mut(PassKind::Terrain);
        assert!(terrain.set_uniform("octaves", UniformValue::I32(3)));
        assert!(!terrain.set_uniform("opacity", UniformValue::F32(0.5)));
        terrain.flush(&queue);
        assert!(!terrain.block().is_dirty());
    }

    #[test]
    fn test_reload_with_broken_file_keeps_programs() {
        let Some((device, _queue)) = crate::test_device() else {
            return;
        };
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("noise.wgsl"), crate::shader::NOISE_PRELUDE).unwrap();
        for pass in PassKind::ORDER {
            std::fs::write(
                dir.path().join(format!("{}.wgsl", pass.name())),
                embedded_source(pass),
            )
            .unwrap();
        }

        let format = wgpu::TextureFormat::Bgra8UnormSrgb;
        let mut library = ShaderLibrary::new().with_shader_dir(dir.path());
        let mut programs = ProgramSet::load(&device, &mut library, format, false).unwrap();
        let background_before = library.source("background").unwrap().to_string();

        let edited = format!("// edited\n{BACKGROUND_SOURCE}");
        std::fs::write(dir.path().join("background.wgsl"), edited).unwrap();
        std::fs::write(dir.path().join("sky.wgsl"), "fn vs_main( { fn fs_main").unwrap();
        let err = programs.reload(&device, &mut library, format, false).unwrap_err();
        assert!(matches!(
            err,
            ProgramError::Shader(ShaderError::CompilationFailed { ref name, .. }) if name == "sky"
        ));

        assert_eq!(programs.get(PassKind::Sky).pass(), PassKind::Sky);
        assert_eq!(library.source("background"), Some(background_before.as_str()));

        std::fs::write(dir.path().join("sky.wgsl"), SKY_SOURCE).unwrap();
        programs.reload(&device, &mut library, format, false).unwrap();
        assert!(library.source("background").unwrap().contains("// edited"));
    }
}
