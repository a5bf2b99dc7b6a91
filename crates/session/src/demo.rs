use serde::{Deserialize, Serialize};
use testbed_common::Vector;
use testbed_kernel::{World, WorldError};

/// Where a demo would like the camera placed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraHint {
    pub eye: Vector,
    pub target: Vector,
}

impl CameraHint {
    /// A view from above and in front of `target`.
    pub fn looking_at(target: Vector) -> Self {
        Self {
            eye: Vector::new(target.x, target.y + 10.0, target.z + 20.0),
            target,
        }
    }
}

impl Default for CameraHint {
    fn default() -> Self {
        Self::looking_at(Vector::ZERO)
    }
}

/// What a demo builder hands back: a fresh live world and an optional
/// camera framing.
#[derive(Debug, Clone)]
pub struct DemoWorld {
    pub world: World,
    pub camera: Option<CameraHint>,
}

impl From<World> for DemoWorld {
    fn from(world: World) -> Self {
        Self {
            world,
            camera: None,
        }
    }
}

/// A scene builder. Invoked once per world build.
pub trait Demo: Send {
    fn name(&self) -> &str;

    fn build(&self) -> Result<DemoWorld, WorldError>;
}

/// Ordered list of available demos.
#[derive(Default)]
pub struct DemoRegistry {
    demos: Vec<Box<dyn Demo>>,
}

impl DemoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, demo: impl Demo + 'static) -> &mut Self {
        self.demos.push(Box::new(demo));
        self
    }

    pub fn len(&self) -> usize {
        self.demos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demos.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&dyn Demo> {
        self.demos.get(index).map(|d| d.as_ref())
    }

    /// Index of the demo with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.demos.iter().position(|d| d.name() == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.demos.iter().map(|d| d.name())
    }
}

impl std::fmt::Debug for DemoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Empty(&'static str);

    impl Demo for Empty {
        fn name(&self) -> &str {
            self.0
        }

        fn build(&self) -> Result<DemoWorld, WorldError> {
            Ok(World::new().into())
        }
    }

    #[test]
    fn registry_keeps_registration_order() {
        let mut registry = DemoRegistry::new();
        registry.register(Empty("a")).register(Empty("b"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(registry.find("b"), Some(1));
        assert_eq!(registry.find("c"), None);
        assert!(registry.get(2).is_none());
    }

    #[test]
    fn camera_looks_at_target() {
        let hint = CameraHint::looking_at(Vector::new(1.0, 2.0, 3.0));
        assert_eq!(hint.target, Vector::new(1.0, 2.0, 3.0));
        assert!(hint.eye.y > hint.target.y);
    }
}
