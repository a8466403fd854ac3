//! # Check Engine
//!
//! Runs validation rules over resources and aggregates their findings into
//! [`CheckResult`]s.
//!
//! ## Rules and suites
//!
//! A rule is a plain function taking one resource and a [`Findings`] sink.
//! It reports problems through the sink, and returns `Err` (or panics) only
//! when it cannot run at all. Rules are registered explicitly as [`Check`]s
//! and grouped by the resource kind they apply to into a [`Suite`]. Only
//! checks whose name starts with `check_` are kept.
//!
//! ## Failure isolation
//!
//! [`run_check`] always produces at least one result per (rule, resource)
//! pair:
//!
//! - findings become one result each;
//! - no findings becomes a single `success` result;
//! - an `Err` or a panic becomes an `error` result carrying the diagnostic,
//!   after any findings recorded before the failure.
//!
//! A run over many resources therefore always completes. Panic messages from
//! rules go to the debug log instead of stderr; panics elsewhere still reach
//! the previously installed hook.

pub mod bundle;
pub mod catalog;
pub mod operator;

use std::cell::Cell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use log::{debug, error};
use serde::{Serialize, Serializer};

use crate::model::{Bundle, Operator, OperatorCatalogList};

/// Name of the built-in suite
pub const DEFAULT_SUITE: &str = "operator-repo.checks";

/// Prefix every registered check name must carry
pub const CHECK_PREFIX: &str = "check_";

/// Severity tier of a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Numeric tier: success 0, warning 40, error 90
    pub fn level(self) -> u8 {
        match self {
            Severity::Success => 0,
            Severity::Warning => 40,
            Severity::Error => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem reported by a rule, before it is stamped with its origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub severity: Severity,
    pub reason: String,
}

/// Sink rules report their findings into
#[derive(Debug, Default)]
pub struct Findings {
    items: Vec<Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a non-fatal problem
    pub fn warn(&mut self, reason: impl Into<String>) {
        self.push(Severity::Warning, reason.into());
    }

    /// Report a critical problem
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.push(Severity::Error, reason.into());
    }

    fn push(&mut self, severity: Severity, reason: String) {
        self.items.push(Finding { severity, reason });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.items
    }
}

/// Kinds of resources rules can apply to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Operator,
    Bundle,
    OperatorCatalogs,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::Operator,
        ResourceKind::Bundle,
        ResourceKind::OperatorCatalogs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Operator => "operator",
            ResourceKind::Bundle => "bundle",
            ResourceKind::OperatorCatalogs => "operator_catalogs",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resource a check can run on
#[derive(Debug, Clone)]
pub enum Resource {
    Operator(Operator),
    Bundle(Bundle),
    OperatorCatalogs(OperatorCatalogList),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Operator(_) => ResourceKind::Operator,
            Resource::Bundle(_) => ResourceKind::Bundle,
            Resource::OperatorCatalogs(_) => ResourceKind::OperatorCatalogs,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Operator(operator) => fmt::Display::fmt(operator, f),
            Resource::Bundle(bundle) => fmt::Display::fmt(bundle, f),
            Resource::OperatorCatalogs(catalogs) => fmt::Display::fmt(catalogs, f),
        }
    }
}

// Resources compare by their displayed identity, which is stable and
// consistent with hashing for every kind.
impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.to_string() == other.to_string()
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        self.to_string().hash(state);
    }
}

impl From<Operator> for Resource {
    fn from(operator: Operator) -> Self {
        Resource::Operator(operator)
    }
}

impl From<Bundle> for Resource {
    fn from(bundle: Bundle) -> Self {
        Resource::Bundle(bundle)
    }
}

impl From<OperatorCatalogList> for Resource {
    fn from(catalogs: OperatorCatalogList) -> Self {
        Resource::OperatorCatalogs(catalogs)
    }
}

/// Signature of a rule applying to resources of type `T`
pub type RuleFn<T> = fn(&T, &mut Findings) -> anyhow::Result<()>;

/// A rule function, tagged with the resource kind it applies to
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    Operator(RuleFn<Operator>),
    Bundle(RuleFn<Bundle>),
    OperatorCatalogs(RuleFn<OperatorCatalogList>),
}

impl Rule {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Rule::Operator(_) => ResourceKind::Operator,
            Rule::Bundle(_) => ResourceKind::Bundle,
            Rule::OperatorCatalogs(_) => ResourceKind::OperatorCatalogs,
        }
    }
}

/// A named, registered rule
#[derive(Debug, Clone, Copy)]
pub struct Check {
    pub name: &'static str,
    pub description: &'static str,
    pub rule: Rule,
}

impl Check {
    pub const fn operator(
        name: &'static str,
        description: &'static str,
        rule: RuleFn<Operator>,
    ) -> Self {
        Self {
            name,
            description,
            rule: Rule::Operator(rule),
        }
    }

    pub const fn bundle(name: &'static str, description: &'static str, rule: RuleFn<Bundle>) -> Self {
        Self {
            name,
            description,
            rule: Rule::Bundle(rule),
        }
    }

    pub const fn operator_catalogs(
        name: &'static str,
        description: &'static str,
        rule: RuleFn<OperatorCatalogList>,
    ) -> Self {
        Self {
            name,
            description,
            rule: Rule::OperatorCatalogs(rule),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.rule.kind()
    }
}

/// Outcome of running one check on one resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CheckResult {
    pub severity: Severity,
    pub reason: String,
    pub check: String,
    #[serde(serialize_with = "serialize_display")]
    pub origin: Resource,
    pub suite: String,
}

fn serialize_display<S: Serializer>(origin: &Resource, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(origin)
}

impl CheckResult {
    fn new(severity: Severity, reason: String, check: &Check, origin: &Resource, suite: &str) -> Self {
        Self {
            severity,
            reason,
            check: check.name.to_string(),
            origin: origin.clone(),
            suite: suite.to_string(),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}({}): {}",
            self.severity, self.check, self.origin, self.reason
        )
    }
}

/// Results are ordered by severity tier only; equal tiers with different
/// content are unordered.
impl PartialOrd for CheckResult {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.severity.cmp(&other.severity) {
            Ordering::Equal if self != other => None,
            ordering => Some(ordering),
        }
    }
}

/// A named collection of checks, grouped by resource kind
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    modules: BTreeMap<ResourceKind, Vec<Check>>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: BTreeMap::new(),
        }
    }

    /// Register the checks of one rule module
    ///
    /// Checks without the `check_` prefix, or whose rule applies to another
    /// kind, are ignored.
    pub fn with_module(mut self, kind: ResourceKind, checks: Vec<Check>) -> Self {
        let module = self.modules.entry(kind).or_default();
        for check in checks {
            if !check.name.starts_with(CHECK_PREFIX) {
                debug!("Ignoring {} in {}: not a check", check.name, self.name);
                continue;
            }
            if check.kind() != kind {
                debug!(
                    "Ignoring {} in {}: applies to {} resources, not {}",
                    check.name,
                    self.name,
                    check.kind(),
                    kind
                );
                continue;
            }
            debug!(
                "Detected {} check with name {} in {}",
                kind, check.name, self.name
            );
            module.push(check);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Names of the built-in suites
pub fn builtin_suites() -> &'static [&'static str] {
    &[DEFAULT_SUITE]
}

/// Look up a built-in suite by name
pub fn builtin_suite(name: &str) -> Option<Suite> {
    match name {
        DEFAULT_SUITE => Some(
            Suite::new(DEFAULT_SUITE)
                .with_module(ResourceKind::Operator, operator::checks())
                .with_module(ResourceKind::Bundle, bundle::checks())
                .with_module(ResourceKind::OperatorCatalogs, catalog::checks()),
        ),
        _ => None,
    }
}

/// Checks of `suite` grouped by kind, without the `skip`ped ones
///
/// Every kind has an entry, empty when the suite has no module for it.
pub fn get_checks(suite: &Suite, skip: &[String]) -> BTreeMap<ResourceKind, Vec<Check>> {
    ResourceKind::ALL
        .iter()
        .map(|kind| {
            let checks = suite
                .modules
                .get(kind)
                .into_iter()
                .flatten()
                .filter(|check| {
                    let skipped = skip.iter().any(|name| name == check.name);
                    if skipped {
                        debug!("Skipping {} check", check.name);
                    }
                    !skipped
                })
                .copied()
                .collect();
            (*kind, checks)
        })
        .collect()
}

fn panic_payload_to_string(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

thread_local! {
    static RULE_RUNNING: Cell<bool> = const { Cell::new(false) };
}

static QUIET_RULE_PANICS: Once = Once::new();

/// Wrap the process panic hook so that panics raised while a rule runs on
/// this thread are logged rather than printed
fn install_panic_hook() {
    QUIET_RULE_PANICS.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if RULE_RUNNING.with(Cell::get) {
                debug!("Check panicked: {}", info);
            } else {
                previous(info);
            }
        }));
    });
}

/// Run one check against one resource
pub fn run_check(check: &Check, resource: &Resource, suite_name: &str) -> Vec<CheckResult> {
    debug!("Running {} check on {}", check.name, resource);
    let mut findings = Findings::new();

    install_panic_hook();
    RULE_RUNNING.with(|running| running.set(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| match (check.rule, resource) {
        (Rule::Operator(rule), Resource::Operator(operator)) => Some(rule(operator, &mut findings)),
        (Rule::Bundle(rule), Resource::Bundle(bundle)) => Some(rule(bundle, &mut findings)),
        (Rule::OperatorCatalogs(rule), Resource::OperatorCatalogs(catalogs)) => {
            Some(rule(catalogs, &mut findings))
        }
        _ => None,
    }));
    RULE_RUNNING.with(|running| running.set(false));

    let failure = match outcome {
        Ok(Some(Ok(()))) => None,
        Ok(Some(Err(err))) => {
            error!("Error running {} check on {}: {:#}", check.name, resource, err);
            Some(format!("{:?}", err))
        }
        Ok(None) => Some(format!(
            "{} applies to {} resources, not {}",
            check.name,
            check.kind(),
            resource.kind()
        )),
        Err(payload) => {
            let message = panic_payload_to_string(payload.as_ref());
            error!("{} check panicked on {}: {}", check.name, resource, message);
            Some(format!("check panicked: {}", message))
        }
    };

    let mut results: Vec<CheckResult> = findings
        .into_vec()
        .into_iter()
        .map(|finding| CheckResult::new(finding.severity, finding.reason, check, resource, suite_name))
        .collect();
    match failure {
        Some(reason) => results.push(CheckResult::new(
            Severity::Error,
            reason,
            check,
            resource,
            suite_name,
        )),
        None if results.is_empty() => results.push(CheckResult::new(
            Severity::Success,
            "Success".to_string(),
            check,
            resource,
            suite_name,
        )),
        None => {}
    }
    results
}

/// Run every applicable check of `suite` on each target, lazily
///
/// `tests`, when given, restricts the run to the named checks.
pub fn run_suite<'a, I>(
    targets: I,
    suite: &'a Suite,
    tests: Option<&'a [String]>,
    skip: &[String],
) -> impl Iterator<Item = CheckResult> + 'a
where
    I: IntoIterator<Item = Resource>,
    I::IntoIter: 'a,
{
    let checks = get_checks(suite, skip);
    targets.into_iter().flat_map(move |resource| {
        let selected: Vec<Check> = checks
            .get(&resource.kind())
            .into_iter()
            .flatten()
            .filter(|check| tests.map_or(true, |names| names.iter().any(|name| name == check.name)))
            .copied()
            .collect();
        selected
            .into_iter()
            .flat_map(move |check| run_check(&check, &resource, suite.name()))
    })
}
