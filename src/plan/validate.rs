//! Structural checks run before a plan reaches provisioning.
//!
//! Validation never mutates the plan and never stops at the first problem:
//! every check runs and every violation is collected into
//! [`PlanDiagnostics`]. Checks run in a fixed order so the report is
//! deterministic.
//!
//! | Order | Check                                              |
//! |-------|----------------------------------------------------|
//! | 1     | origin / function references resolve               |
//! | 2     | exactly one catch-all, positioned last             |
//! | 3     | no duplicate static patterns                       |
//! | 4     | edge and regional server are mutually exclusive    |
//! | 5     | no static pattern shadowed by an earlier one       |
//! | 6     | static pattern syntax                              |
//! | 7     | edge association cardinality                       |
//! | 8     | required fields per cache type                     |

use std::fmt;
use std::sync::OnceLock;

use owo_colors::OwoColorize;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet};

use super::{
    AllowedMethods, AssociationTarget, Behavior, BehaviorKind, EdgeEvent, OriginKind, Plan,
    Runtime,
};
use crate::utils::plural_count;

/// Longest pattern the CDN accepts.
const MAX_PATTERN_LEN: usize = 255;

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    UnresolvedReference,
    CatchAll,
    DuplicatePattern,
    ModeConflict,
    ShadowedPattern,
    PatternSyntax,
    Association,
    ServerFunction,
    MissingField,
}

impl IssueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnresolvedReference => "unresolved-reference",
            Self::CatchAll => "catch-all",
            Self::DuplicatePattern => "duplicate-pattern",
            Self::ModeConflict => "mode-conflict",
            Self::ShadowedPattern => "shadowed-pattern",
            Self::PatternSyntax => "pattern-syntax",
            Self::Association => "association",
            Self::ServerFunction => "server-function",
            Self::MissingField => "missing-field",
        }
    }
}

/// Where in the plan an issue was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Plan,
    Origin(String),
    Function(String),
    Behavior { index: usize, pattern: String },
}

impl Location {
    fn behavior(index: usize, behavior: &Behavior) -> Self {
        Self::Behavior {
            index,
            pattern: behavior.pattern.to_string(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => f.write_str("plan"),
            Self::Origin(name) => write!(f, "origins.{name}"),
            Self::Function(name) => write!(f, "functions.{name}"),
            Self::Behavior { index, pattern } => write!(f, "behaviors[{index}] {pattern}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanIssue {
    pub kind: IssueKind,
    pub location: Location,
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for PlanIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{}{} {}",
            "[".dimmed(),
            self.location.to_string().cyan(),
            "]".dimmed(),
            self.kind.as_str().dimmed()
        )?;
        write!(f, "{} {}", "→".red(), self.message)?;
        if let Some(hint) = &self.hint {
            write!(f, "\n  {} {}", "hint:".yellow(), hint)?;
        }
        Ok(())
    }
}

/// Every violation found in one plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanDiagnostics {
    issues: Vec<PlanIssue>,
}

impl PlanDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, kind: IssueKind, location: Location, message: impl Into<String>) {
        self.issues.push(PlanIssue {
            kind,
            location,
            message: message.into(),
            hint: None,
        });
    }

    pub fn error_with_hint(
        &mut self,
        kind: IssueKind,
        location: Location,
        message: impl Into<String>,
        hint: impl Into<String>,
    ) {
        self.issues.push(PlanIssue {
            kind,
            location,
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    #[cfg(test)]
    pub fn issues(&self) -> &[PlanIssue] {
        &self.issues
    }

    #[cfg(test)]
    pub fn has(&self, kind: IssueKind) -> bool {
        self.issues.iter().any(|issue| issue.kind == kind)
    }
}

impl fmt::Display for PlanDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}\n", "plan validation failed:".red().bold())?;
        for (i, issue) in self.issues.iter().enumerate() {
            write!(f, "{issue}")?;
            if i + 1 < self.issues.len() {
                writeln!(f, "\n")?;
            }
        }
        if self.issues.len() > 1 {
            write!(
                f,
                "\n\n{} {}",
                "found".dimmed(),
                plural_count(self.issues.len(), "error").red().bold()
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for PlanDiagnostics {}

// ============================================================================
// ValidatedPlan
// ============================================================================

/// A plan that passed every check. Only [`validate`] constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan(Plan);

impl ValidatedPlan {
    pub fn plan(&self) -> &Plan {
        &self.0
    }

    pub fn into_inner(self) -> Plan {
        self.0
    }
}

/// Validate a plan, returning it unchanged on success.
pub fn validate(plan: Plan) -> Result<ValidatedPlan, PlanDiagnostics> {
    let diag = check(&plan);
    if diag.is_empty() {
        Ok(ValidatedPlan(plan))
    } else {
        Err(diag)
    }
}

/// Run every check and collect the findings.
pub fn check(plan: &Plan) -> PlanDiagnostics {
    let mut diag = PlanDiagnostics::new();

    check_references(plan, &mut diag);
    check_catch_all(plan, &mut diag);
    check_duplicates(plan, &mut diag);
    check_mode(plan, &mut diag);
    check_shadowing(plan, &mut diag);
    check_pattern_syntax(plan, &mut diag);
    check_associations(plan, &mut diag);
    check_required_fields(plan, &mut diag);

    diag
}

// ============================================================================
// Checks
// ============================================================================

fn check_references(plan: &Plan, diag: &mut PlanDiagnostics) {
    for origin in &plan.origins {
        if let Some(function) = origin.backing_function()
            && plan.function(function).is_none()
        {
            diag.error(
                IssueKind::UnresolvedReference,
                Location::Origin(origin.name.clone()),
                format!("origin is backed by unknown function `{function}`"),
            );
        }
    }

    for (index, behavior) in plan.behaviors.iter().enumerate() {
        if plan.origin(&behavior.origin).is_none() {
            diag.error(
                IssueKind::UnresolvedReference,
                Location::behavior(index, behavior),
                format!("unknown origin `{}`", behavior.origin),
            );
        }
        if let Some(function) = behavior.edge_function()
            && plan.function(function).is_none()
        {
            diag.error(
                IssueKind::UnresolvedReference,
                Location::behavior(index, behavior),
                format!("unknown edge function `{function}`"),
            );
        }
    }
}

fn check_catch_all(plan: &Plan, diag: &mut PlanDiagnostics) {
    let catch_alls: Vec<usize> = plan
        .behaviors
        .iter()
        .enumerate()
        .filter(|(_, b)| b.pattern.is_catch_all())
        .map(|(i, _)| i)
        .collect();

    match catch_alls.as_slice() {
        [] => diag.error(
            IssueKind::CatchAll,
            Location::Plan,
            "no catch-all behavior; requests outside the static routes have nowhere to go",
        ),
        [only] if *only + 1 != plan.behaviors.len() => diag.error_with_hint(
            IssueKind::CatchAll,
            Location::behavior(*only, &plan.behaviors[*only]),
            "catch-all is not the last behavior",
            "every behavior after it is unreachable",
        ),
        [_] => {}
        [_, extra @ ..] => {
            for &index in extra {
                diag.error(
                    IssueKind::CatchAll,
                    Location::behavior(index, &plan.behaviors[index]),
                    "more than one catch-all behavior",
                );
            }
        }
    }

    for (index, behavior) in plan.behaviors.iter().enumerate() {
        match (behavior.kind, behavior.pattern.is_catch_all()) {
            (BehaviorKind::Server, false) => diag.error(
                IssueKind::CatchAll,
                Location::behavior(index, behavior),
                "server behavior must use the catch-all pattern",
            ),
            (BehaviorKind::Static, true) => diag.error(
                IssueKind::CatchAll,
                Location::behavior(index, behavior),
                "catch-all behavior must be a server behavior",
            ),
            _ => {}
        }
    }
}

fn check_duplicates(plan: &Plan, diag: &mut PlanDiagnostics) {
    let mut seen = FxHashSet::default();
    for (index, behavior) in plan.behaviors.iter().enumerate() {
        if behavior.kind == BehaviorKind::Static && !seen.insert(&behavior.pattern) {
            diag.error(
                IssueKind::DuplicatePattern,
                Location::behavior(index, behavior),
                format!("duplicate static pattern `{}`", behavior.pattern),
            );
        }
    }
}

fn check_mode(plan: &Plan, diag: &mut PlanDiagnostics) {
    let function_origins: Vec<_> = plan.origins.iter().filter(|o| !o.is_storage()).collect();
    let has_edge_function = plan.edge_functions().next().is_some();

    if plan.edge_mode || has_edge_function {
        for origin in &function_origins {
            diag.error_with_hint(
                IssueKind::ModeConflict,
                Location::Origin(origin.name.clone()),
                "function-backed server origin in a plan with an edge server",
                "edge and regional server rendering are mutually exclusive",
            );
        }
    }

    if !plan.edge_mode {
        for function in plan.edge_functions() {
            diag.error(
                IssueKind::ModeConflict,
                Location::Function(function.name.clone()),
                "edge function in a regional plan",
            );
        }
    }

    if plan.edge_mode {
        for function in plan.regional_functions() {
            diag.error(
                IssueKind::ModeConflict,
                Location::Function(function.name.clone()),
                "regional function in an edge plan",
            );
        }
    }

    for function in &plan.functions {
        if function.wrapper.runtime() != function.runtime {
            diag.error(
                IssueKind::ModeConflict,
                Location::Function(function.name.clone()),
                format!(
                    "`{}` wrapper cannot run on the {:?} runtime",
                    function.wrapper.file_name(),
                    function.runtime
                ),
            );
        }
    }

    match plan.functions.len() {
        1 => {}
        0 => diag.error(
            IssueKind::ServerFunction,
            Location::Plan,
            "no server function",
        ),
        n => diag.error(
            IssueKind::ServerFunction,
            Location::Plan,
            format!("expected exactly one server function, found {n}"),
        ),
    }

    let referenced: FxHashSet<&str> = plan
        .origins
        .iter()
        .filter_map(|o| o.backing_function())
        .chain(plan.behaviors.iter().filter_map(Behavior::edge_function))
        .map(|f| f.as_str())
        .collect();
    for function in &plan.functions {
        if !referenced.contains(function.name.as_str()) {
            diag.error(
                IssueKind::ServerFunction,
                Location::Function(function.name.clone()),
                "function is not reachable from any origin or behavior",
            );
        }
    }
}

fn check_shadowing(plan: &Plan, diag: &mut PlanDiagnostics) {
    let statics: Vec<(usize, &Behavior)> = plan
        .behaviors
        .iter()
        .enumerate()
        .filter(|(_, b)| b.kind == BehaviorKind::Static && !b.pattern.is_catch_all())
        .collect();

    for (pos, &(index, later)) in statics.iter().enumerate() {
        // identical patterns are reported as duplicates
        let shadowed_by = statics[..pos]
            .iter()
            .find(|(_, earlier)| {
                earlier.pattern != later.pattern && earlier.pattern.shadows(&later.pattern)
            });
        if let Some((earlier_index, earlier)) = shadowed_by {
            diag.error_with_hint(
                IssueKind::ShadowedPattern,
                Location::behavior(index, later),
                format!(
                    "unreachable: `{}` at behaviors[{earlier_index}] matches every path first",
                    earlier.pattern
                ),
                "order the more specific pattern first",
            );
        }
    }
}

fn cdn_pattern_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^[A-Za-z0-9_\-.$/~"'@:+&%*]+$"#).unwrap())
}

fn check_pattern_syntax(plan: &Plan, diag: &mut PlanDiagnostics) {
    for (index, behavior) in plan.behaviors.iter().enumerate() {
        if behavior.pattern.is_catch_all() {
            continue;
        }
        let name = behavior.pattern.name();
        let cdn = behavior.pattern.to_cdn();
        let mut problem = |message: String| {
            diag.error(
                IssueKind::PatternSyntax,
                Location::behavior(index, behavior),
                message,
            );
        };

        if name.is_empty() {
            problem("empty pattern".to_string());
            continue;
        }
        if name.starts_with('/') {
            problem("pattern must not start with `/`".to_string());
        }
        if name.split('/').any(str::is_empty) {
            problem(format!("empty path segment in `{name}`"));
        }
        if name.contains('*') {
            problem(format!("wildcard inside `{name}`; only a trailing `/*` is allowed"));
        }
        if cdn.len() > MAX_PATTERN_LEN {
            problem(format!(
                "encoded pattern is {} characters, the limit is {MAX_PATTERN_LEN}",
                cdn.len()
            ));
        }
        if !cdn_pattern_re().is_match(&cdn) {
            problem(format!("`{cdn}` contains characters the CDN rejects"));
        }
    }
}

fn check_associations(plan: &Plan, diag: &mut PlanDiagnostics) {
    for (index, behavior) in plan.behaviors.iter().enumerate() {
        let mut per_event: FxHashMap<EdgeEvent, usize> = FxHashMap::default();
        let mut transforms = 0;
        let mut edge_functions = 0;

        for association in &behavior.associations {
            *per_event.entry(association.event).or_default() += 1;
            match &association.target {
                AssociationTarget::Transform(_) => {
                    transforms += 1;
                    if association.event != EdgeEvent::ViewerRequest {
                        diag.error(
                            IssueKind::Association,
                            Location::behavior(index, behavior),
                            "request transform must attach at viewer-request",
                        );
                    }
                }
                AssociationTarget::EdgeFunction { function } => {
                    edge_functions += 1;
                    if association.event != EdgeEvent::OriginRequest {
                        diag.error(
                            IssueKind::Association,
                            Location::behavior(index, behavior),
                            "edge function must attach at origin-request",
                        );
                    }
                    if let Some(f) = plan.function(function)
                        && f.runtime != Runtime::Edge
                    {
                        diag.error(
                            IssueKind::Association,
                            Location::behavior(index, behavior),
                            format!("`{function}` is a regional function and cannot run at the edge"),
                        );
                    }
                }
            }
        }

        if transforms > 1 {
            diag.error(
                IssueKind::Association,
                Location::behavior(index, behavior),
                format!("{transforms} request transforms, at most one is allowed"),
            );
        }
        if edge_functions > 1 {
            diag.error(
                IssueKind::Association,
                Location::behavior(index, behavior),
                format!("{edge_functions} edge functions, at most one is allowed"),
            );
        }
        // a single kind repeated is already reported above
        if transforms <= 1 && edge_functions <= 1 {
            let mut events: Vec<_> = per_event.into_iter().filter(|(_, n)| *n > 1).collect();
            events.sort_by_key(|(event, _)| *event as u8);
            for (event, n) in events {
                diag.error(
                    IssueKind::Association,
                    Location::behavior(index, behavior),
                    format!("{n} functions on {event:?}, at most one is allowed"),
                );
            }
        }
    }
}

fn check_required_fields(plan: &Plan, diag: &mut PlanDiagnostics) {
    for (index, behavior) in plan.behaviors.iter().enumerate() {
        // unresolved origins are reported by the reference check
        let Some(origin) = plan.origin(&behavior.origin) else {
            continue;
        };

        match behavior.kind {
            BehaviorKind::Static => {
                if !origin.is_storage() {
                    diag.error(
                        IssueKind::MissingField,
                        Location::behavior(index, behavior),
                        format!("static behavior targets non-storage origin `{}`", origin.name),
                    );
                }
                if behavior.methods != AllowedMethods::ReadOnly {
                    diag.error(
                        IssueKind::MissingField,
                        Location::behavior(index, behavior),
                        "static behavior must allow read-only methods",
                    );
                }
            }
            BehaviorKind::Server => {
                let function_origin = matches!(origin.kind, OriginKind::Function { .. });
                if !function_origin && behavior.edge_function().is_none() {
                    diag.error_with_hint(
                        IssueKind::MissingField,
                        Location::behavior(index, behavior),
                        "server behavior has neither a function origin nor an edge function",
                        "regional plans route to the `server` origin, edge plans attach the `server` edge function",
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{BuildMetadata, ServerEntry, SiteMode};
    use crate::plan::behavior::Association;
    use crate::plan::{
        BuildOptions, Function, FunctionRef, FunctionSettings, Origin, OriginRef,
        PathPattern, PlanBuilder, SERVER, STORAGE_ORIGIN, ServerWrapper,
    };
    use std::path::PathBuf;

    fn built(routes: Vec<PathPattern>, edge_mode: bool) -> Plan {
        let meta = BuildMetadata {
            mode: SiteMode::Deployed,
            assets_path: PathBuf::from("/app/public"),
            assets_versioned_sub_dir: None,
            static_routes: routes,
            server: ServerEntry {
                dir: PathBuf::from("/app/build"),
                module: "index.js".to_string(),
            },
        };
        let options = BuildOptions {
            edge_mode,
            ..BuildOptions::default()
        };
        PlanBuilder::new(&meta, &options).build()
    }

    fn kinds(diag: &PlanDiagnostics) -> Vec<IssueKind> {
        diag.issues().iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_built_plans_are_valid() {
        for edge in [false, true] {
            let plan = built(
                vec![PathPattern::file("favicon.ico"), PathPattern::dir("assets")],
                edge,
            );
            assert!(check(&plan).is_empty(), "{}", check(&plan));
        }
    }

    #[test]
    fn test_validate_is_idempotent() {
        let plan = built(vec![PathPattern::dir("assets")], false);
        let once = validate(plan).unwrap();
        let twice = validate(once.plan().clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_duplicate_pattern_rejected() {
        let plan = built(vec![PathPattern::dir("assets"), PathPattern::dir("assets")], false);
        let diag = validate(plan).unwrap_err();
        assert_eq!(kinds(&diag), [IssueKind::DuplicatePattern]);
    }

    #[test]
    fn test_edge_function_with_server_origin_rejected() {
        let mut plan = built(vec![], true);
        plan.origins
            .push(Origin::function(SERVER, FunctionRef::new(SERVER)));

        let diag = validate(plan).unwrap_err();
        assert!(diag.has(IssueKind::ModeConflict));
    }

    #[test]
    fn test_edge_function_in_regional_plan_rejected() {
        let mut plan = built(vec![], true);
        plan.edge_mode = false;
        let diag = check(&plan);
        assert!(diag.has(IssueKind::ModeConflict));
    }

    #[test]
    fn test_catch_all_must_be_last() {
        let mut plan = built(vec![PathPattern::dir("assets")], false);
        plan.behaviors.rotate_right(1);

        let diag = check(&plan);
        assert_eq!(kinds(&diag), [IssueKind::CatchAll]);
    }

    #[test]
    fn test_missing_catch_all() {
        let mut plan = built(vec![PathPattern::dir("assets")], true);
        plan.behaviors.pop();

        let diag = check(&plan);
        assert!(diag.has(IssueKind::CatchAll));
        // the edge function is no longer referenced by anything
        assert!(diag.has(IssueKind::ServerFunction));
    }

    #[test]
    fn test_unresolved_references_all_reported() {
        let mut plan = built(vec![PathPattern::file("a.txt"), PathPattern::file("b.txt")], false);
        plan.behaviors[0].origin = OriginRef::new("nope");
        plan.behaviors[1].origin = OriginRef::new("missing");

        let diag = check(&plan);
        assert_eq!(
            kinds(&diag),
            [IssueKind::UnresolvedReference, IssueKind::UnresolvedReference]
        );
    }

    #[test]
    fn test_shadowed_pattern() {
        let broad_first = built(vec![PathPattern::dir("assets"), PathPattern::dir("assets/img")], false);
        assert_eq!(kinds(&check(&broad_first)), [IssueKind::ShadowedPattern]);

        let specific_first =
            built(vec![PathPattern::dir("assets/img"), PathPattern::dir("assets")], false);
        assert!(check(&specific_first).is_empty());
    }

    #[test]
    fn test_pattern_syntax() {
        let plan = built(vec![PathPattern::file(""), PathPattern::file("a//b.txt")], false);
        let diag = check(&plan);
        assert_eq!(
            kinds(&diag),
            [IssueKind::PatternSyntax, IssueKind::PatternSyntax]
        );

        let long = built(vec![PathPattern::file("x".repeat(300))], false);
        assert!(check(&long).has(IssueKind::PatternSyntax));

        // reserved characters are encoded, not rejected
        let spaced = built(vec![PathPattern::file("a b [1].txt")], false);
        assert!(check(&spaced).is_empty());
    }

    #[test]
    fn test_regional_function_as_edge_association() {
        let mut plan = built(vec![], false);
        let catch_all = plan.behaviors.last_mut().unwrap();
        catch_all
            .associations
            .push(Association::edge_function(FunctionRef::new(SERVER)));

        assert!(check(&plan).has(IssueKind::Association));
    }

    #[test]
    fn test_static_behavior_on_function_origin() {
        let mut plan = built(vec![PathPattern::dir("assets")], false);
        plan.behaviors[0].origin = OriginRef::new(SERVER);

        assert_eq!(kinds(&check(&plan)), [IssueKind::MissingField]);
    }

    #[test]
    fn test_wrapper_runtime_mismatch() {
        let mut plan = built(vec![], false);
        plan.functions[0] = Function {
            runtime: Runtime::Regional,
            ..Function::server(
                SERVER,
                ServerWrapper::Edge,
                plan.functions[0].entry.clone(),
                None,
                FunctionSettings::default(),
            )
        };
        assert!(check(&plan).has(IssueKind::ModeConflict));
    }

    #[test]
    fn test_diagnostics_display_counts_errors() {
        let mut plan = built(vec![PathPattern::file("a.txt")], false);
        plan.behaviors[0].origin = OriginRef::new("x");
        plan.origins.retain(|o| o.name != STORAGE_ORIGIN);

        let diag = check(&plan);
        let shown = diag.to_string();
        assert!(shown.contains("plan validation failed"));
        assert!(shown.contains("behaviors[0] a.txt"));
    }
}
