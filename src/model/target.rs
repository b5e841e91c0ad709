//! Release targets (distributions) processed independently in one run

use crate::config::Projection;

use super::event::ExecutionEvent;

/// A named distribution with an optional platform tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub platform: Option<String>,
}

impl Target {
    /// Copy of `event` scoped to this target
    pub fn scope(&self, event: &ExecutionEvent) -> ExecutionEvent {
        let mut scoped = event.clone().with_target(self.name.clone());
        if let Some(platform) = &self.platform {
            scoped.platform = Some(platform.clone());
        }
        scoped
    }
}

/// Targets declared under `distributions`, in declaration order
pub fn targets(projection: &Projection) -> Vec<Target> {
    projection
        .view()
        .entries("distributions")
        .into_iter()
        .map(|(name, view)| Target {
            name: name.to_string(),
            platform: view.get_str("platform").map(str::to_string),
        })
        .collect()
}
