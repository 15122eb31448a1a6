//! Environment probe collaborator contract

use crate::event::Platform;

/// Supplies the platform tag stamped on every event
pub trait EnvironmentProbe: Send + Sync {
    fn platform(&self) -> Option<Platform>;
}

/// Probe returning a fixed value
#[derive(Debug, Clone)]
pub struct StaticProbe(pub Option<Platform>);

impl EnvironmentProbe for StaticProbe {
    fn platform(&self) -> Option<Platform> {
        self.0.clone()
    }
}

/// Probe that never tags events with a platform
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlatform;

impl EnvironmentProbe for NoPlatform {
    fn platform(&self) -> Option<Platform> {
        None
    }
}
