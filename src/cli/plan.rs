//! `edgeship plan`: compile, validate and print the deployment plan.

use anyhow::{Context, Result};

use super::common::{Compiled, compile};
use crate::config::SiteConfig;
use crate::error::DeployError;
use crate::log;
use crate::plan::{OriginKind, Plan, validate};
use crate::utils::plural_count;

pub fn print_plan(config: &SiteConfig, json: bool) -> Result<()> {
    let Compiled { plan, .. } = compile(config)?;
    let plan = validate(plan).map_err(DeployError::from)?;

    if json {
        let out = plan.plan().to_json().context("failed to serialize plan")?;
        println!("{out}");
        return Ok(());
    }

    log!(
        "plan";
        "{} site, {}",
        config.framework().as_str(),
        describe_mode(plan.plan(), config.site.region.as_deref())
    );
    for line in summary(plan.plan()) {
        println!("{line}");
    }
    Ok(())
}

fn describe_mode(plan: &Plan, region: Option<&str>) -> String {
    let rendering = match (plan.edge_mode, region) {
        (true, _) => "edge rendering".to_string(),
        (false, Some(region)) => format!("regional rendering in {region}"),
        (false, None) => "regional rendering".to_string(),
    };
    format!("{}, {}", rendering, plan.mode.as_str())
}

/// One line per origin, function and behavior, behaviors in CDN order.
fn summary(plan: &Plan) -> Vec<String> {
    let mut lines = Vec::with_capacity(plan.origins.len() + plan.behaviors.len() + 3);

    lines.push(format!("origins ({}):", plan.origins.len()));
    for origin in &plan.origins {
        let kind = match &origin.kind {
            OriginKind::Storage { .. } => "storage".to_string(),
            OriginKind::Function { function } => format!("function `{function}`"),
        };
        lines.push(format!("  {:<12} {}", origin.name, kind));
    }

    lines.push(format!("functions ({}):", plan.functions.len()));
    for function in &plan.functions {
        lines.push(format!(
            "  {:<12} {} via {}",
            function.name,
            if function.is_edge() { "edge" } else { "regional" },
            function.wrapper.file_name()
        ));
    }

    lines.push(format!("behaviors ({}):", plan.behaviors.len()));
    let width = plan
        .behaviors
        .iter()
        .map(|b| b.pattern.to_cdn().len())
        .max()
        .unwrap_or(0);
    for (i, behavior) in plan.behaviors.iter().enumerate() {
        let mut line = format!(
            "  {:>2}. {:<width$}  {:<6} -> {}",
            i + 1,
            behavior.pattern.to_cdn(),
            behavior.kind,
            behavior.origin,
        );
        if let Some(function) = behavior.edge_function() {
            line.push_str(&format!(" (edge function `{function}`)"));
        }
        lines.push(line);
    }

    let note = plural_count(plan.behaviors.len(), "behavior");
    lines.push(format!("{note}, catch-all last"));
    lines
}
