use std::collections::BTreeMap;
use std::fmt::Write as _;

use testbed_common::{ColliderHandle, Rotation, Vector};
use testbed_protocol::{BackendKind, ColliderPosition, ColliderRecord, DebugInfo, ShapeType, Token};

use crate::CameraHint;

/// Everything a presenter needs to set up a fresh scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneSetup {
    pub token: Token,
    pub demo: String,
    pub backend: BackendKind,
    pub camera: CameraHint,
    pub colliders: Vec<ColliderRecord>,
}

/// Timing shown after each accepted result.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimingReport {
    pub step_time_ms: f64,
    pub average_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub samples: usize,
    pub debug_info: Option<DebugInfo>,
}

/// Consumer of accepted step results.
///
/// Presenters only ever see results for the active token.
pub trait Presenter {
    /// Called on every world build, before any result of the new world.
    fn reset(&mut self, scene: &SceneSetup);

    fn apply_positions(&mut self, positions: &[ColliderPosition]);

    fn show_timing(&mut self, timing: &TimingReport);
}

#[derive(Debug, Clone, Copy)]
struct Shown {
    shape: ShapeType,
    translation: Vector,
    rotation: Rotation,
}

/// Text presenter for the CLI, logs and tests.
///
/// Colliders without drawable geometry are left out of the scene.
#[derive(Debug, Default)]
pub struct DebugTextPresenter {
    scene: Option<(Token, String, BackendKind, CameraHint)>,
    shown: BTreeMap<ColliderHandle, Shown>,
    skipped: usize,
    timing: Option<TimingReport>,
    frames: u64,
}

impl DebugTextPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of position batches applied since the last reset.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn token(&self) -> Option<Token> {
        self.scene.as_ref().map(|(token, ..)| *token)
    }

    pub fn translation(&self, handle: ColliderHandle) -> Option<Vector> {
        self.shown.get(&handle).map(|s| s.translation)
    }

    pub fn collider_count(&self) -> usize {
        self.shown.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped
    }

    pub fn timing(&self) -> Option<&TimingReport> {
        self.timing.as_ref()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let Some((token, demo, backend, camera)) = &self.scene else {
            out.push_str("=== No scene ===\n");
            return out;
        };
        let _ = writeln!(
            out,
            "=== {demo} on {backend} (token={}, frames={}) ===",
            token.0, self.frames
        );
        let _ = writeln!(
            out,
            "Camera: eye=({:.1}, {:.1}, {:.1}) target=({:.1}, {:.1}, {:.1})",
            camera.eye.x, camera.eye.y, camera.eye.z, camera.target.x, camera.target.y, camera.target.z
        );
        let _ = writeln!(
            out,
            "Colliders: {} shown, {} skipped",
            self.shown.len(),
            self.skipped
        );
        if let Some(t) = &self.timing {
            let _ = writeln!(
                out,
                "Step: {:.3} ms (avg {:.3}, min {:.3}, max {:.3} over {})",
                t.step_time_ms, t.average_ms, t.min_ms, t.max_ms, t.samples
            );
            if let Some(d) = &t.debug_info {
                let _ = writeln!(
                    out,
                    "Debug: tick={} contacts={} joints={} active={}",
                    d.tick, d.contact_pairs, d.joints, d.active_bodies
                );
            }
        }
        for (handle, s) in &self.shown {
            let p = s.translation;
            let r = s.rotation;
            let _ = writeln!(
                out,
                "  [{:>4}] {:<8} pos=({:.2}, {:.2}, {:.2}) rot=({:.2}, {:.2}, {:.2}, {:.2})",
                handle.0,
                s.shape.name(),
                p.x,
                p.y,
                p.z,
                r.x,
                r.y,
                r.z,
                r.w
            );
        }
        out
    }
}

impl Presenter for DebugTextPresenter {
    fn reset(&mut self, scene: &SceneSetup) {
        self.scene = Some((scene.token, scene.demo.clone(), scene.backend, scene.camera));
        self.shown.clear();
        self.skipped = 0;
        self.timing = None;
        self.frames = 0;
        for record in &scene.colliders {
            if !record.shape_type.has_wire_geometry() {
                tracing::warn!(
                    collider = record.handle.0,
                    shape = record.shape_type.name(),
                    "not presenting collider without geometry"
                );
                self.skipped += 1;
                continue;
            }
            self.shown.insert(
                record.handle,
                Shown {
                    shape: record.shape_type,
                    translation: Vector::ZERO,
                    rotation: Rotation::IDENTITY,
                },
            );
        }
    }

    fn apply_positions(&mut self, positions: &[ColliderPosition]) {
        for position in positions {
            if let Some(shown) = self.shown.get_mut(&position.handle) {
                shown.translation = position.translation;
                shown.rotation = position.rotation;
            }
        }
        self.frames += 1;
    }

    fn show_timing(&mut self, timing: &TimingReport) {
        self.timing = Some(*timing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testbed_common::BodyHandle;

    fn record(handle: u32, shape_type: ShapeType) -> ColliderRecord {
        ColliderRecord {
            handle: ColliderHandle(handle),
            parent_handle: BodyHandle(0),
            shape_type,
            radius: Some(0.5),
            half_extents: None,
            half_height: None,
            density: 1.0,
            friction: 0.5,
            restitution: 0.0,
            is_sensor: false,
        }
    }

    fn scene(colliders: Vec<ColliderRecord>) -> SceneSetup {
        SceneSetup {
            token: Token(1),
            demo: "test".into(),
            backend: BackendKind::SequentialImpulse,
            camera: CameraHint::default(),
            colliders,
        }
    }

    #[test]
    fn empty_presenter_renders_placeholder() {
        assert!(DebugTextPresenter::new().render().contains("No scene"));
    }

    #[test]
    fn unknown_shapes_are_skipped() {
        let mut presenter = DebugTextPresenter::new();
        presenter.reset(&scene(vec![
            record(0, ShapeType::Ball),
            record(1, ShapeType::Trimesh),
            record(2, ShapeType::Unknown),
        ]));
        assert_eq!(presenter.collider_count(), 1);
        assert_eq!(presenter.skipped_count(), 2);

        presenter.apply_positions(&[ColliderPosition {
            handle: ColliderHandle(1),
            translation: Vector::new(1.0, 1.0, 1.0),
            rotation: Rotation::IDENTITY,
        }]);
        assert!(presenter.translation(ColliderHandle(1)).is_none());
        assert!(presenter.render().contains("1 shown, 2 skipped"));
    }

    #[test]
    fn positions_and_timing_show_up() {
        let mut presenter = DebugTextPresenter::new();
        presenter.reset(&scene(vec![record(0, ShapeType::Ball)]));
        presenter.apply_positions(&[ColliderPosition {
            handle: ColliderHandle(0),
            translation: Vector::new(0.0, 4.5, 0.0),
            rotation: Rotation::IDENTITY,
        }]);
        presenter.show_timing(&TimingReport {
            step_time_ms: 0.5,
            samples: 1,
            ..TimingReport::default()
        });

        assert_eq!(presenter.frames(), 1);
        assert_eq!(
            presenter.translation(ColliderHandle(0)),
            Some(Vector::new(0.0, 4.5, 0.0))
        );
        let text = presenter.render();
        assert!(text.contains("pos=(0.00, 4.50, 0.00)"));
        assert!(text.contains("Step: 0.500 ms"));
    }

    #[test]
    fn reset_clears_previous_scene() {
        let mut presenter = DebugTextPresenter::new();
        presenter.reset(&scene(vec![record(0, ShapeType::Ball)]));
        presenter.apply_positions(&[]);
        presenter.reset(&scene(Vec::new()));
        assert_eq!(presenter.frames(), 0);
        assert_eq!(presenter.collider_count(), 0);
        assert!(presenter.timing().is_none());
    }
}
