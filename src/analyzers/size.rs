//! Size analyzer - LLOC, CLOC, CD, DLOC, NA and NM
//!
//! Line and comment counts come pre-attributed per entity, with nested local
//! entities already cut out. CD is `CLOC / (CLOC + LLOC)` and is reported as
//! 0 when both are 0. A class's DLOC is its own documentation plus that of
//! the methods and attributes it declares directly; classes nested inside it
//! keep their documentation to themselves.

use crate::analyzers::base::{AnalysisContext, Analyzer, AnalyzerConfig};
use crate::error::MetricsResult;
use crate::metrics::Metric;
use crate::model::{Entity, EntityKind, SemanticModel};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Comment density, with an empty entity reported as 0
pub fn comment_density(cloc: u32, lloc: u32) -> f64 {
    let total = f64::from(cloc) + f64::from(lloc);
    if total == 0.0 {
        return 0.0;
    }
    f64::from(cloc) / total
}

/// Documentation lines of an entity; classes include their direct members
pub fn documentation_lines(model: &SemanticModel, entity: &Entity) -> u32 {
    let own = entity.size.documentation_lines();
    if entity.kind.is_class_like() {
        model
            .members(entity.id)
            .map(|m| m.size.documentation_lines())
            .fold(own, u32::saturating_add)
    } else {
        own
    }
}

pub struct SizeAnalyzer {
    config: AnalyzerConfig,
}

impl SizeAnalyzer {
    pub fn new() -> Self {
        Self::with_config(AnalyzerConfig::new())
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    fn analyze_entity(&self, ctx: &AnalysisContext<'_>, entity: &Entity) -> MetricsResult<usize> {
        let id = entity.id;
        let lloc = entity.size.logical_lines;
        let cloc = entity.size.comment_lines();

        ctx.record(id, Metric::Lloc, f64::from(lloc))?;
        ctx.record(id, Metric::Cloc, f64::from(cloc))?;
        ctx.record(id, Metric::Cd, comment_density(cloc, lloc))?;
        let mut recorded = 3;

        match entity.kind {
            EntityKind::Class | EntityKind::TemplateClass | EntityKind::TemplateSpecialization => {
                ctx.record(
                    id,
                    Metric::Dloc,
                    f64::from(documentation_lines(ctx.model, entity)),
                )?;
                ctx.record_count(id, Metric::Na, ctx.model.attributes(id).count())?;
                ctx.record_count(id, Metric::Nm, ctx.model.methods(id).count())?;
                recorded += 3;
            }
            EntityKind::Method
            | EntityKind::Attribute
            | EntityKind::GlobalFunction
            | EntityKind::GlobalVariable => {
                ctx.record(id, Metric::Dloc, f64::from(entity.size.documentation_lines()))?;
                recorded += 1;
            }
            EntityKind::Program | EntityKind::Namespace => {}
        }
        Ok(recorded)
    }
}

impl Default for SizeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer for SizeAnalyzer {
    fn name(&self) -> &'static str {
        "SizeAnalyzer"
    }

    fn description(&self) -> &'static str {
        "Measures logical and comment lines, comment density and documentation per entity"
    }

    fn metrics(&self) -> &'static [Metric] {
        &[
            Metric::Lloc,
            Metric::Cloc,
            Metric::Cd,
            Metric::Dloc,
            Metric::Na,
            Metric::Nm,
        ]
    }

    fn category(&self) -> &'static str {
        "size"
    }

    fn config(&self) -> Option<&AnalyzerConfig> {
        Some(&self.config)
    }

    fn analyze(&self, ctx: &AnalysisContext<'_>) -> MetricsResult<usize> {
        let entities: Vec<&Entity> = ctx
            .model
            .entities()
            .filter(|e| e.kind != EntityKind::Program)
            .collect();
        let recorded = AtomicUsize::new(0);

        entities.par_iter().try_for_each(|entity| -> MetricsResult<()> {
            let n = self.analyze_entity(ctx, entity)?;
            recorded.fetch_add(n, Ordering::Relaxed);
            Ok(())
        })?;

        debug!("Size metrics for {} entities", entities.len());
        Ok(recorded.into_inner())
    }
}
