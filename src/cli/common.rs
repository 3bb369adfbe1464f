//! Pipeline steps shared across commands.

use anyhow::Result;

use crate::config::SiteConfig;
use crate::debug;
use crate::layout::BuildMetadata;
use crate::plan::{Plan, PlanBuilder};

/// Build output plus the unvalidated plan compiled from it.
pub struct Compiled {
    pub metadata: BuildMetadata,
    pub plan: Plan,
}

/// Read the build output and compile it into a plan.
pub fn compile(config: &SiteConfig) -> Result<Compiled> {
    let metadata = config.load_metadata()?;
    let options = config.build_options();
    let plan = PlanBuilder::new(&metadata, &options).build();
    debug!(
        "plan";
        "{} origins, {} functions, {} behaviors",
        plan.origins.len(),
        plan.functions.len(),
        plan.behaviors.len()
    );
    Ok(Compiled { metadata, plan })
}
