use std::collections::HashMap;
use std::sync::Arc;

use crate::podcast::PodcastContentPipeline;
use crate::video_ads::VideoAdsPipeline;
use crate::SystemPipeline;

/// Slug → pipeline lookup table.
///
/// A system must appear both here and in the `systems` table before it can
/// accept jobs: the table carries the credential, the registry carries the
/// code.
#[derive(Default)]
pub struct PipelineRegistry {
    pipelines: HashMap<&'static str, Arc<dyn SystemPipeline>>,
}

impl PipelineRegistry {
    /// An empty registry (tests register their own pipelines).
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing all production pipelines.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PodcastContentPipeline));
        registry.register(Arc::new(VideoAdsPipeline));
        registry
    }

    /// Register a pipeline under its own slug, replacing any previous one.
    pub fn register(&mut self, pipeline: Arc<dyn SystemPipeline>) {
        self.pipelines.insert(pipeline.slug(), pipeline);
    }

    /// Look up the pipeline for a slug.
    pub fn get(&self, slug: &str) -> Option<Arc<dyn SystemPipeline>> {
        self.pipelines.get(slug).cloned()
    }

    /// Registered slugs, for startup logging.
    pub fn slugs(&self) -> Vec<&'static str> {
        let mut slugs: Vec<_> = self.pipelines.keys().copied().collect();
        slugs.sort_unstable();
        slugs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contains_both_systems() {
        let registry = PipelineRegistry::builtin();
        assert_eq!(
            registry.slugs(),
            vec![
                "generate-ai-video-ads",
                "transform-podcast-audio-into-content-for-platforms",
            ]
        );
        assert!(registry.get("generate-ai-video-ads").is_some());
        assert!(registry.get("unknown-system").is_none());
    }
}
