//! Keyboard bindings for the editor.
//!
//! | key | action |
//! |---|---|
//! | `1` `2` `3` | Perlin, Simplex, Worley |
//! | `O` / `K` | toggle ocean / sky |
//! | arrows | rotate |
//! | `PageUp` / `PageDown` | terrain resolution, applied on release |
//! | `[` / `]` | terrain seed |
//! | `F5` / `F9` | save / load the quicksave slot |
//! | `L` | list presets |
//! | `R` | reset |
//! | `F6` | reload shaders |
//! | `F7` | reload `config.ron` |
//! | left drag | orbit the camera |
//! | `Escape` | quit |

use planet_config::NoiseAlgorithm;
use tracing::info;
use winit::event::ElementState;
use winit::keyboard::KeyCode;

use crate::editor::PlanetEditor;

/// Slot written by `F5` and read by `F9`.
pub const QUICKSAVE_SLOT: &str = "quicksave";

/// Degrees per arrow press.
pub const ROTATE_STEP_DEG: f32 = 5.0;

/// Segments per resolution key press.
pub const SEGMENT_STEP: i32 = 8;

/// What a key event asks the editor to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    SelectAlgorithm(NoiseAlgorithm),
    ToggleOcean,
    ToggleSky,
    Rotate { azimuth_deg: f32, inclination_deg: f32 },
    PreviewSegments(i32),
    CommitSegments,
    StepSeed(i32),
    QuickSave,
    QuickLoad,
    ListPresets,
    Reset,
    ReloadShaders,
    ReloadConfig,
    Quit,
}

/// Map a key event to an action.
///
/// Held keys repeat rotation, seed and resolution steps. Everything else
/// fires once on the initial press.
pub fn action_for(key: KeyCode, state: ElementState, repeat: bool) -> Option<Action> {
    if state == ElementState::Released {
        return match key {
            KeyCode::PageUp | KeyCode::PageDown => Some(Action::CommitSegments),
            _ => None,
        };
    }

    let repeatable = match key {
        KeyCode::ArrowLeft => Some(Action::Rotate {
            azimuth_deg: -ROTATE_STEP_DEG,
            inclination_deg: 0.0,
        }),
        KeyCode::ArrowRight => Some(Action::Rotate {
            azimuth_deg: ROTATE_STEP_DEG,
            inclination_deg: 0.0,
        }),
        KeyCode::ArrowUp => Some(Action::Rotate {
            azimuth_deg: 0.0,
            inclination_deg: ROTATE_STEP_DEG,
        }),
        KeyCode::ArrowDown => Some(Action::Rotate {
            azimuth_deg: 0.0,
            inclination_deg: -ROTATE_STEP_DEG,
        }),
        KeyCode::PageUp => Some(Action::PreviewSegments(SEGMENT_STEP)),
        KeyCode::PageDown => Some(Action::PreviewSegments(-SEGMENT_STEP)),
        KeyCode::BracketLeft => Some(Action::StepSeed(-1)),
        KeyCode::BracketRight => Some(Action::StepSeed(1)),
        _ => None,
    };
    if repeatable.is_some() || repeat {
        return repeatable;
    }

    match key {
        KeyCode::Digit1 => Some(Action::SelectAlgorithm(NoiseAlgorithm::Perlin)),
        KeyCode::Digit2 => Some(Action::SelectAlgorithm(NoiseAlgorithm::Simplex)),
        KeyCode::Digit3 => Some(Action::SelectAlgorithm(NoiseAlgorithm::Worley)),
        KeyCode::KeyO => Some(Action::ToggleOcean),
        KeyCode::KeyK => Some(Action::ToggleSky),
        KeyCode::F5 => Some(Action::QuickSave),
        KeyCode::F9 => Some(Action::QuickLoad),
        KeyCode::F6 => Some(Action::ReloadShaders),
        KeyCode::F7 => Some(Action::ReloadConfig),
        KeyCode::KeyL => Some(Action::ListPresets),
        KeyCode::KeyR => Some(Action::Reset),
        KeyCode::Escape => Some(Action::Quit),
        _ => None,
    }
}

/// What the window loop should do after an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    ReloadShaders,
    ReloadConfig,
    Quit,
}

/// Apply `action` to the editor.
pub fn apply(editor: &mut PlanetEditor, action: Action) -> Outcome {
    match action {
        Action::SelectAlgorithm(algorithm) => editor.set_algorithm(algorithm),
        Action::ToggleOcean => {
            let enabled = editor.toggle_ocean();
            info!("Ocean {}", if enabled { "on" } else { "off" });
        }
        Action::ToggleSky => {
            let enabled = editor.toggle_sky();
            info!("Sky {}", if enabled { "on" } else { "off" });
        }
        Action::Rotate {
            azimuth_deg,
            inclination_deg,
        } => editor.rotate(azimuth_deg, inclination_deg),
        Action::PreviewSegments(delta) => {
            let pending = editor.step_segments(delta);
            info!("Terrain resolution {pending} (release to apply)");
        }
        Action::CommitSegments => {
            editor.commit_segments();
        }
        Action::StepSeed(delta) => {
            let seed = editor.step_seed(delta);
            info!("Terrain seed {seed}");
        }
        Action::QuickSave => {
            editor.save(QUICKSAVE_SLOT);
        }
        Action::QuickLoad => {
            editor.load(QUICKSAVE_SLOT);
        }
        Action::ListPresets => {
            let files = editor.list_files();
            if files.is_empty() {
                info!("No presets in {}", editor.preset_dir().display());
            } else {
                info!(
                    "Presets in {}: {}",
                    editor.preset_dir().display(),
                    files.join(", ")
                );
            }
        }
        Action::Reset => editor.reset(),
        Action::ReloadShaders => return Outcome::ReloadShaders,
        Action::ReloadConfig => return Outcome::ReloadConfig,
        Action::Quit => return Outcome::Quit,
    }
    Outcome::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use planet_config::EditorConfig;

    fn press(key: KeyCode) -> Option<Action> {
        action_for(key, ElementState::Pressed, false)
    }

    #[test]
    fn test_algorithm_keys() {
        assert_eq!(
            press(KeyCode::Digit3),
            Some(Action::SelectAlgorithm(NoiseAlgorithm::Worley))
        );
        assert_eq!(
            press(KeyCode::Digit1),
            Some(Action::SelectAlgorithm(NoiseAlgorithm::Perlin))
        );
    }

    #[test]
    fn test_toggles_do_not_repeat() {
        assert_eq!(press(KeyCode::KeyO), Some(Action::ToggleOcean));
        assert_eq!(action_for(KeyCode::KeyO, ElementState::Pressed, true), None);
        assert_eq!(action_for(KeyCode::KeyO, ElementState::Released, false), None);
    }

    #[test]
    fn test_rotation_repeats() {
        assert!(matches!(
            action_for(KeyCode::ArrowRight, ElementState::Pressed, true),
            Some(Action::Rotate { .. })
        ));
    }

    #[test]
    fn test_resolution_previews_on_press_and_commits_on_release() {
        assert_eq!(
            press(KeyCode::PageUp),
            Some(Action::PreviewSegments(SEGMENT_STEP))
        );
        assert_eq!(
            action_for(KeyCode::PageDown, ElementState::Pressed, true),
            Some(Action::PreviewSegments(-SEGMENT_STEP))
        );
        assert_eq!(
            action_for(KeyCode::PageUp, ElementState::Released, false),
            Some(Action::CommitSegments)
        );
    }

    #[test]
    fn test_unbound_key_is_ignored() {
        assert_eq!(press(KeyCode::KeyZ), None);
    }

    #[test]
    fn test_drag_sequence_applies_once() {
        let tmp = tempfile::tempdir().unwrap();
        let mut editor = PlanetEditor::new(tmp.path(), &EditorConfig::default());
        let start = editor.params().terrain.segments;

        for repeat in [false, true, true] {
            let action = action_for(KeyCode::PageUp, ElementState::Pressed, repeat).unwrap();
            assert_eq!(apply(&mut editor, action), Outcome::Continue);
            assert_eq!(editor.params().terrain.segments, start);
        }
        let release = action_for(KeyCode::PageUp, ElementState::Released, false).unwrap();
        apply(&mut editor, release);
        assert_eq!(
            editor.params().terrain.segments,
            start + 3 * SEGMENT_STEP as u32
        );
    }

    #[test]
    fn test_quicksave_then_quickload() {
        let tmp = tempfile::tempdir().unwrap();
        let mut editor = PlanetEditor::new(tmp.path(), &EditorConfig::default());
        apply(&mut editor, Action::StepSeed(7));
        apply(&mut editor, Action::QuickSave);
        apply(&mut editor, Action::Reset);
        assert_eq!(editor.params().terrain.seed, 0);

        apply(&mut editor, Action::QuickLoad);
        assert_eq!(editor.params().terrain.seed, 7);
        assert_eq!(editor.list_files(), vec!["quicksave.planet".to_string()]);
    }

    #[test]
    fn test_window_outcomes() {
        let tmp = tempfile::tempdir().unwrap();
        let mut editor = PlanetEditor::new(tmp.path(), &EditorConfig::default());
        assert_eq!(apply(&mut editor, Action::Quit), Outcome::Quit);
        assert_eq!(
            apply(&mut editor, Action::ReloadShaders),
            Outcome::ReloadShaders
        );
        assert_eq!(
            apply(&mut editor, press(KeyCode::F7).unwrap()),
            Outcome::ReloadConfig
        );
        assert_eq!(apply(&mut editor, Action::ToggleSky), Outcome::Continue);
    }
}
