//! The fixture registry: typed definitions in, immutable descriptors out.
//!
//! Discovery expands every registered fixture into [`FixtureDescriptor`]s:
//! fixture argument sets become sibling fixtures, parameterized methods
//! become one [`TestDescriptor`] per case, sibling name collisions are
//! numbered, and malformed declarations are reported as
//! [`DiscoveryError`]s instead of being deferred to execution.

pub mod builder;
mod expand;

pub use builder::{
    CaseDef, FixtureDef, FixtureTemplate, ParamSpec, Strategy, TestDef, TestTemplate,
};

use crate::descriptor::{
    FixtureDescriptor, FixtureId, RunState, TestDescriptor, TestId, TestKind,
};
use crate::errors::DiscoveryError;
use crate::value::{Arg, Args};
use builder::Attributes;
use expand::{case_name, combine, disambiguate, param_values, rng_for, ParamIssue};

/// Registered fixture definitions.
#[derive(Default)]
pub struct Registry {
    namespace: Option<String>,
    fixtures: Vec<FixtureTemplate>,
}

/// The result of discovery: the descriptor forest plus every error found.
#[derive(Debug, Clone)]
pub struct Discovery {
    pub fixtures: Vec<FixtureDescriptor>,
    pub errors: Vec<DiscoveryError>,
    pub seed: u64,
}

impl Discovery {
    /// Every test, depth first in declaration order.
    pub fn all_tests(&self) -> Vec<&TestDescriptor> {
        self.fixtures.iter().flat_map(|f| f.all_tests()).collect()
    }

    pub fn test_count(&self) -> usize {
        self.fixtures.iter().map(|f| f.all_tests().len()).sum()
    }

    pub fn find_test(&self, full_name: &str) -> Option<&TestDescriptor> {
        self.all_tests().into_iter().find(|t| t.full_name == full_name)
    }

    pub fn find_fixture(&self, full_name: &str) -> Option<&FixtureDescriptor> {
        fn walk<'a>(
            fixtures: &'a [FixtureDescriptor],
            full_name: &str,
        ) -> Option<&'a FixtureDescriptor> {
            fixtures.iter().find_map(|f| {
                if f.full_name == full_name {
                    Some(f)
                } else {
                    walk(&f.children, full_name)
                }
            })
        }
        walk(&self.fixtures, full_name)
    }
}

/// Where a fixture sits: the dotted prefix of its full name, its parent and
/// the categories it inherits.
struct Placement<'a> {
    prefix: Option<&'a str>,
    parent: Option<&'a FixtureId>,
    categories: &'a [String],
}

fn join(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}.{name}"),
        _ => name.to_string(),
    }
}

fn merge_categories(into: &mut Vec<String>, more: &[String]) {
    for category in more {
        if !into.contains(category) {
            into.push(category.clone());
        }
    }
}

/// Checks the ignore/explicit directives of one declaration level.
fn check_directives(attrs: &Attributes, target: &str, found: &mut Vec<DiscoveryError>) {
    if attrs.ignore.is_some() && attrs.explicit {
        found.push(DiscoveryError::IgnoreAndExplicit {
            target: target.to_string(),
        });
    }
    if attrs.ignore.as_deref().is_some_and(|r| r.trim().is_empty()) {
        found.push(DiscoveryError::EmptyIgnoreReason {
            target: target.to_string(),
        });
    }
}

fn not_runnable(found: &[DiscoveryError]) -> RunState {
    let message = found
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    RunState::NotRunnable(message)
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every top-level fixture's full name.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn register(mut self, fixture: impl Into<FixtureTemplate>) -> Self {
        self.add(fixture);
        self
    }

    pub fn add(&mut self, fixture: impl Into<FixtureTemplate>) {
        self.fixtures.push(fixture.into());
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Expands every registered fixture. `seed` drives random parameters.
    pub fn discover(&self, seed: u64) -> Discovery {
        let mut errors = Vec::new();
        let placement = Placement {
            prefix: self.namespace.as_deref(),
            parent: None,
            categories: &[],
        };
        let fixtures = expand_siblings(&self.fixtures, &placement, seed, &mut errors);
        tracing::debug!(
            fixtures = fixtures.len(),
            errors = errors.len(),
            seed,
            "discovery finished"
        );
        Discovery {
            fixtures,
            errors,
            seed,
        }
    }
}

// =====================
// Fixture expansion
// =====================

fn expand_siblings(
    templates: &[FixtureTemplate],
    placement: &Placement<'_>,
    seed: u64,
    errors: &mut Vec<DiscoveryError>,
) -> Vec<FixtureDescriptor> {
    let mut instances: Vec<(&FixtureTemplate, Args, String)> = Vec::new();
    for template in templates {
        if template.arg_sets.is_empty() {
            instances.push((template, Args::empty(), template.name.clone()));
        } else {
            for args in &template.arg_sets {
                let name = case_name(&template.name, args);
                instances.push((template, args.clone(), name));
            }
        }
    }

    let mut names: Vec<String> = instances.iter().map(|(_, _, n)| n.clone()).collect();
    disambiguate(&mut names);

    instances
        .into_iter()
        .zip(names)
        .map(|((template, args, _), name)| {
            build_fixture(template, args, name, placement, seed, errors)
        })
        .collect()
}

fn build_fixture(
    template: &FixtureTemplate,
    args: Args,
    name: String,
    placement: &Placement<'_>,
    seed: u64,
    errors: &mut Vec<DiscoveryError>,
) -> FixtureDescriptor {
    let full_name = join(placement.prefix, &name);
    let id = FixtureId(full_name.clone());

    let mut found = Vec::new();
    if template.name.trim().is_empty() {
        found.push(DiscoveryError::EmptyName {
            parent: placement.prefix.unwrap_or("<root>").to_string(),
        });
    }
    check_directives(&template.attrs, &full_name, &mut found);

    let run_state = if !found.is_empty() {
        not_runnable(&found)
    } else if let Some(reason) = &template.attrs.ignore {
        RunState::Ignored(reason.clone())
    } else if template.attrs.explicit {
        RunState::Explicit
    } else {
        RunState::Runnable
    };
    if !found.is_empty() {
        tracing::warn!(fixture = %full_name, errors = found.len(), "fixture is not runnable");
    }
    errors.extend(found);

    let mut categories = placement.categories.to_vec();
    merge_categories(&mut categories, &template.attrs.categories);

    let mut tests: Vec<TestDescriptor> = Vec::new();
    for test in &template.tests {
        tests.extend(expand_test(
            test,
            &full_name,
            &template.datapoints,
            &categories,
            seed,
            errors,
        ));
    }
    let mut test_names: Vec<String> = tests.iter().map(|t| t.name.clone()).collect();
    disambiguate(&mut test_names);
    for (test, name) in tests.iter_mut().zip(test_names) {
        if test.name != name {
            test.full_name = join(Some(&full_name), &name);
            test.id = TestId(test.full_name.clone());
            test.name = name;
        }
    }

    let child_placement = Placement {
        prefix: Some(&full_name),
        parent: Some(&id),
        categories: &categories,
    };
    let children = expand_siblings(&template.children, &child_placement, seed, errors);

    FixtureDescriptor {
        id: id.clone(),
        name,
        full_name: full_name.clone(),
        parent: placement.parent.cloned(),
        args,
        tests,
        children,
        hooks: template.hooks.clone(),
        categories,
        properties: template.attrs.properties.clone(),
        expect: template.attrs.expect,
        run_state,
        conditions: template.attrs.conditions.clone(),
        apartment: template.apartment,
        parallelizable: template.parallelizable,
        lifecycle: template.lifecycle,
        description: template.attrs.description.clone(),
        factory: template.factory.clone(),
    }
}

// =====================
// Test expansion
// =====================

/// One case awaiting a descriptor: its arguments, the case-level
/// declaration (if any) and the errors found for it.
struct Pending<'a> {
    args: Args,
    case: Option<&'a CaseDef>,
    errors: Vec<DiscoveryError>,
}

fn expand_test(
    template: &TestTemplate,
    fixture_full_name: &str,
    datapoints: &[Arg],
    inherited: &[String],
    seed: u64,
    errors: &mut Vec<DiscoveryError>,
) -> Vec<TestDescriptor> {
    let method_full_name = join(Some(fixture_full_name), &template.method);

    let mut method_errors = Vec::new();
    if template.method.trim().is_empty() {
        method_errors.push(DiscoveryError::EmptyName {
            parent: fixture_full_name.to_string(),
        });
    }
    check_directives(&template.attrs, &method_full_name, &mut method_errors);

    let mut pending: Vec<Pending<'_>> = Vec::new();
    let parameterized = template.kind != TestKind::Simple || !template.cases.is_empty();

    if !template.params.is_empty() {
        let mut rng = rng_for(seed, &method_full_name);
        let mut lists = Vec::with_capacity(template.params.len());
        for (index, spec) in template.params.iter().enumerate() {
            match param_values(spec, datapoints, &mut rng) {
                Ok(values) => lists.push(values),
                Err(ParamIssue::NoValues) => {
                    method_errors.push(DiscoveryError::NoParameterValues {
                        target: method_full_name.clone(),
                        index,
                    })
                }
                Err(ParamIssue::InvalidRange(detail)) => {
                    method_errors.push(DiscoveryError::InvalidRange {
                        target: method_full_name.clone(),
                        index,
                        detail,
                    })
                }
            }
        }
        if lists.len() == template.params.len() {
            for args in combine(template.strategy, &lists) {
                pending.push(Pending {
                    args,
                    case: None,
                    errors: Vec::new(),
                });
            }
        }
    }

    for case in &template.cases {
        let target = case_name(&method_full_name, &case.args);
        let mut case_errors = Vec::new();
        if case.args.len() != template.arity {
            case_errors.push(DiscoveryError::ArityMismatch {
                target: target.clone(),
                expected: template.arity,
                actual: case.args.len(),
            });
        }
        match (template.returns_value, case.returns.is_some()) {
            (true, false) => case_errors.push(DiscoveryError::MissingExpectedResult {
                target: target.clone(),
            }),
            (false, true) => case_errors.push(DiscoveryError::UnexpectedExpectedResult {
                target: target.clone(),
            }),
            _ => {}
        }
        if case.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            case_errors.push(DiscoveryError::EmptyName {
                parent: method_full_name.clone(),
            });
        }
        check_directives(&case.attrs, &target, &mut case_errors);
        pending.push(Pending {
            args: case.args.clone(),
            case: Some(case),
            errors: case_errors,
        });
    }

    if parameterized && pending.is_empty() && method_errors.is_empty() {
        method_errors.push(DiscoveryError::NoCases {
            target: method_full_name.clone(),
        });
    }

    let mut descriptors = Vec::new();
    if !parameterized || pending.is_empty() {
        // A simple test, or a parameterized method with nothing to expand:
        // one descriptor named after the method carries any errors.
        descriptors.push(describe(
            template,
            fixture_full_name,
            &method_full_name,
            inherited,
            Pending {
                args: Args::empty(),
                case: None,
                errors: Vec::new(),
            },
            parameterized,
            &method_errors,
        ));
    } else {
        for case in pending {
            descriptors.push(describe(
                template,
                fixture_full_name,
                &method_full_name,
                inherited,
                case,
                true,
                &method_errors,
            ));
        }
    }

    errors.extend(method_errors);
    for descriptor in &descriptors {
        if let RunState::NotRunnable(message) = &descriptor.run_state {
            tracing::warn!(test = %descriptor.full_name, %message, "test is not runnable");
        }
    }
    descriptors
}

fn describe(
    template: &TestTemplate,
    fixture_full_name: &str,
    method_full_name: &str,
    inherited: &[String],
    pending: Pending<'_>,
    parameterized: bool,
    method_errors: &[DiscoveryError],
) -> TestDescriptor {
    let Pending {
        args,
        case,
        errors: case_errors,
    } = pending;

    let name = match case.and_then(|c| c.name.as_deref()) {
        Some(explicit) if !explicit.trim().is_empty() => explicit.to_string(),
        _ if parameterized && (case.is_some() || !args.is_empty()) => {
            case_name(&template.method, &args)
        }
        _ => template.method.clone(),
    };
    let full_name = join(Some(fixture_full_name), &name);

    let all_errors: Vec<DiscoveryError> = method_errors
        .iter()
        .cloned()
        .chain(case_errors.iter().cloned())
        .collect();
    let case_ignore = case.and_then(|c| c.attrs.ignore.clone());
    let case_explicit = case.is_some_and(|c| c.attrs.explicit);
    let run_state = if !all_errors.is_empty() {
        not_runnable(&all_errors)
    } else if let Some(reason) = case_ignore.or_else(|| template.attrs.ignore.clone()) {
        RunState::Ignored(reason)
    } else if case_explicit || template.attrs.explicit {
        RunState::Explicit
    } else {
        RunState::Runnable
    };

    let method_expect = template.attrs.expect;
    let expect = case.and_then(|c| c.attrs.expect).or(method_expect);

    let mut properties = template.attrs.properties.clone();
    let mut categories = inherited.to_vec();
    merge_categories(&mut categories, &template.attrs.categories);
    let mut conditions = template.attrs.conditions.clone();
    let mut description = template.attrs.description.clone();
    if let Some(case) = case {
        for (key, values) in case.attrs.properties.iter() {
            for value in values {
                properties.add(key, value.clone());
            }
        }
        merge_categories(&mut categories, &case.attrs.categories);
        conditions.extend(case.attrs.conditions.iter().cloned());
        if case.attrs.description.is_some() {
            description = case.attrs.description.clone();
        }
    }
    if let Some(tag) = expect {
        if !properties.contains("Expect", tag.as_str()) {
            properties.add("Expect", tag.as_str());
        }
    }

    TestDescriptor {
        id: TestId(full_name.clone()),
        name,
        full_name,
        method: template.method.clone(),
        method_full_name: method_full_name.to_string(),
        kind: template.kind,
        args,
        expected_result: case.and_then(|c| c.returns.clone()),
        expect,
        method_expect,
        properties,
        categories,
        run_state,
        conditions,
        apartment: template.apartment,
        description,
        body: template.body.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::descriptor::ExpectedOutcome;
    use crate::value::ArgKind;

    struct Unit;

    fn unit(_: &Args) -> Unit {
        Unit
    }

    #[test]
    fn explicit_names_override_and_collisions_are_numbered() {
        let fixture = FixtureDef::new("F", unit).test(
            TestDef::cases("M", 1, |_, _, _| Ok(()))
                .case(CaseDef::new(args![1]))
                .case(CaseDef::new(args![1]))
                .case(CaseDef::new(args![42]).named("AlternateTestName")),
        );
        let discovery = Registry::new().namespace("Demo").register(fixture).discover(0);
        let names: Vec<_> = discovery.all_tests().iter().map(|t| t.full_name.clone()).collect();
        assert_eq!(
            names,
            ["Demo.F.M(1)", "Demo.F.M(1)#2", "Demo.F.AlternateTestName"]
        );
    }

    #[test]
    fn arity_mismatch_marks_only_that_case() {
        let fixture = FixtureDef::new("F", unit).test(
            TestDef::cases("Sum", 3, |_, _, _| Ok(()))
                .case(CaseDef::new(args![1, 2, 3]))
                .case(CaseDef::new(args![1, 2])),
        );
        let discovery = Registry::new().register(fixture).discover(0);
        assert_eq!(discovery.errors.len(), 1);
        let tests = discovery.all_tests();
        assert_eq!(tests[0].run_state, RunState::Runnable);
        assert!(matches!(tests[1].run_state, RunState::NotRunnable(_)));
    }

    #[test]
    fn conflicting_fixture_directives_disable_the_fixture() {
        let fixture = FixtureDef::new("F", unit)
            .ignore("later")
            .explicit()
            .test(TestDef::new("T", |_, _| Ok(())));
        let discovery = Registry::new().register(fixture).discover(0);
        assert!(matches!(
            discovery.errors[0],
            DiscoveryError::IgnoreAndExplicit { .. }
        ));
        assert!(matches!(
            discovery.fixtures[0].run_state,
            RunState::NotRunnable(_)
        ));
    }

    #[test]
    fn parameterized_method_without_cases_is_an_error() {
        let fixture = FixtureDef::new("F", unit).test(TestDef::cases("M", 2, |_, _, _| Ok(())));
        let discovery = Registry::new().register(fixture).discover(0);
        assert!(matches!(discovery.errors[0], DiscoveryError::NoCases { .. }));
        assert_eq!(discovery.all_tests()[0].name, "M");
    }

    #[test]
    fn returning_cases_require_expected_results() {
        let fixture = FixtureDef::new("F", unit).test(
            TestDef::returning("Add", 2, |_, _, a| Ok(a.int(0)? + a.int(1)?))
                .case(CaseDef::new(args![2, 2]).returns(4))
                .case(CaseDef::new(args![0, 5])),
        );
        let discovery = Registry::new().register(fixture).discover(0);
        assert!(matches!(
            discovery.errors[0],
            DiscoveryError::MissingExpectedResult { .. }
        ));
        assert_eq!(discovery.all_tests()[0].expected_result, Some(Arg::Int(4)));
    }

    #[test]
    fn theories_draw_from_datapoints_and_inherit_categories() {
        let fixture = FixtureDef::new("F", unit)
            .category("Outer")
            .datapoints([0, 1, 42])
            .test(
                TestDef::theory("Commutes", &[ArgKind::Int, ArgKind::Int], |_, _, _| Ok(()))
                    .category("Math")
                    .expect(ExpectedOutcome::Pass),
            );
        let discovery = Registry::new().register(fixture).discover(0);
        let tests = discovery.all_tests();
        assert_eq!(tests.len(), 9);
        assert_eq!(tests[0].categories, ["Outer", "Math"]);
        assert!(tests[0].properties.contains("Expect", "Pass"));
        assert_eq!(tests[5].name, "Commutes(1,42)");
    }

    #[test]
    fn missing_datapoints_are_reported() {
        let fixture = FixtureDef::new("F", unit).test(TestDef::theory(
            "Strings",
            &[ArgKind::Str],
            |_, _, _| Ok(()),
        ));
        let discovery = Registry::new().register(fixture).discover(0);
        assert!(matches!(
            discovery.errors[0],
            DiscoveryError::NoParameterValues { index: 0, .. }
        ));
    }

    #[test]
    fn fixture_instances_expand_with_arguments() {
        let fixture = FixtureDef::new("Generic", unit)
            .instances(vec![args!["vec"], args!["deque"]])
            .test(TestDef::new("CanAdd", |_, _| Ok(())));
        let discovery = Registry::new().register(fixture).discover(0);
        assert_eq!(discovery.fixtures.len(), 2);
        assert_eq!(discovery.fixtures[1].full_name, "Generic(\"deque\")");
        assert!(discovery
            .find_test("Generic(\"vec\").CanAdd")
            .is_some());
    }

    #[test]
    fn nested_fixtures_know_their_parent() {
        let inner = FixtureDef::new("Inner", unit).test(TestDef::new("T", |_, _| Ok(())));
        let outer = FixtureDef::new("Outer", unit).nest(inner);
        let discovery = Registry::new().namespace("NS").register(outer).discover(0);
        let inner = discovery.find_fixture("NS.Outer.Inner").unwrap();
        assert_eq!(inner.parent, Some(FixtureId("NS.Outer".into())));
        assert_eq!(inner.tests[0].full_name, "NS.Outer.Inner.T");
    }
}
