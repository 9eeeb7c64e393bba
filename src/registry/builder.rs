//! Typed fixture and test definitions.
//!
//! A `FixtureDef<S>` declares a fixture whose state is an `S` built by a
//! factory. Hooks and bodies receive `&mut S`. Converting a definition into a
//! [`FixtureTemplate`] erases `S`; the registry expands templates into
//! descriptors.
//!
//! ```rust
//! use verdict::args;
//! use verdict::registry::{CaseDef, FixtureDef, Registry, TestDef};
//!
//! #[derive(Default)]
//! struct Counter {
//!     setups: u32,
//! }
//!
//! let fixture = FixtureDef::new("Counting", |_| Counter::default())
//!     .one_time_setup(|s: &mut Counter, _| {
//!         s.setups += 1;
//!         Ok(())
//!     })
//!     .test(TestDef::new("SetUpRanOnce", |s: &mut Counter, ctx| {
//!         ctx.assert_eq(s.setups, 1, "setups")
//!     }))
//!     .test(
//!         TestDef::cases("Sum", 3, |_, ctx, a| {
//!             ctx.assert_eq(a.int(0)? + a.int(1)?, a.int(2)?, "")
//!         })
//!         .case(CaseDef::new(args![2, 2, 4]))
//!         .case(CaseDef::new(args![0, 5, 5])),
//!     );
//!
//! let discovery = Registry::new().register(fixture).discover(7);
//! assert!(discovery.errors.is_empty());
//! let names: Vec<_> = discovery.all_tests().iter().map(|t| t.name.clone()).collect();
//! assert_eq!(names, ["SetUpRanOnce", "Sum(2,2,4)", "Sum(0,5,5)"]);
//! ```

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::TestContext;
use crate::descriptor::{
    Apartment, Condition, ExpectedOutcome, Factory, Hook, Hooks, LifeCycle, Properties, TestBody,
    TestKind,
};
use crate::signal::{Abort, Outcome};
use crate::value::{Arg, ArgKind, Args};

// =====================
// Shared attributes
// =====================

/// Declarative attributes shared by fixtures, methods and cases.
#[derive(Debug, Clone, Default)]
pub(crate) struct Attributes {
    pub(crate) categories: Vec<String>,
    pub(crate) properties: Properties,
    pub(crate) expect: Option<ExpectedOutcome>,
    pub(crate) ignore: Option<String>,
    pub(crate) explicit: bool,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) description: Option<String>,
}

/// Builder methods for the attributes every definition level carries.
macro_rules! attribute_methods {
    ($($attrs:ident).+) => {
        pub fn category(mut self, category: impl Into<String>) -> Self {
            self.$($attrs).+.categories.push(category.into());
            self
        }

        pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
            self.$($attrs).+.properties.add(key, value);
            self
        }

        /// Tags the expected outcome checked by the acceptance run.
        pub fn expect(mut self, outcome: ExpectedOutcome) -> Self {
            self.$($attrs).+.expect = Some(outcome);
            self
        }

        pub fn ignore(mut self, reason: impl Into<String>) -> Self {
            self.$($attrs).+.ignore = Some(reason.into());
            self
        }

        /// Runs only when a filter selects it.
        pub fn explicit(mut self) -> Self {
            self.$($attrs).+.explicit = true;
            self
        }

        pub fn include_platforms<I, P>(mut self, platforms: I) -> Self
        where
            I: IntoIterator<Item = P>,
            P: Into<String>,
        {
            self.$($attrs).+.conditions.push(Condition {
                include: platforms.into_iter().map(Into::into).collect(),
                exclude: Vec::new(),
            });
            self
        }

        pub fn exclude_platforms<I, P>(mut self, platforms: I) -> Self
        where
            I: IntoIterator<Item = P>,
            P: Into<String>,
        {
            self.$($attrs).+.conditions.push(Condition {
                include: Vec::new(),
                exclude: platforms.into_iter().map(Into::into).collect(),
            });
            self
        }

        pub fn description(mut self, text: impl Into<String>) -> Self {
            self.$($attrs).+.description = Some(text.into());
            self
        }
    };
}

// =====================
// Parameter sources
// =====================

/// Where one parameter of a combinatorial method or theory gets its values.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamSpec {
    /// Explicit values.
    Values(Vec<Arg>),
    /// Integers from `from` to `to` inclusive.
    Range { from: i64, to: i64, step: i64 },
    /// `count` integers drawn from `min..max`.
    RandomInt { count: usize, min: i64, max: i64 },
    /// `count` floats drawn from `min..max`.
    RandomFloat { count: usize, min: f64, max: f64 },
    /// The fixture's datapoints of this kind.
    Datapoints(ArgKind),
}

impl ParamSpec {
    pub fn values<I, A>(values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        ParamSpec::Values(values.into_iter().map(Into::into).collect())
    }

    pub fn range(from: i64, to: i64) -> Self {
        ParamSpec::Range { from, to, step: 1 }
    }

    pub fn stepped(from: i64, to: i64, step: i64) -> Self {
        ParamSpec::Range { from, to, step }
    }

    pub fn random_int(count: usize, min: i64, max: i64) -> Self {
        ParamSpec::RandomInt { count, min, max }
    }

    pub fn random_float(count: usize, min: f64, max: f64) -> Self {
        ParamSpec::RandomFloat { count, min, max }
    }
}

/// How the values of several parameters combine into cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Every combination.
    #[default]
    Combinatorial,
    /// The n-th value of each parameter together; short lists pad with `Null`.
    Sequential,
}

// =====================
// Cases
// =====================

/// One explicit argument tuple of a parameterized method.
#[derive(Debug, Clone)]
pub struct CaseDef {
    pub(crate) args: Args,
    pub(crate) returns: Option<Arg>,
    pub(crate) name: Option<String>,
    pub(crate) attrs: Attributes,
}

impl CaseDef {
    pub fn new(args: Vec<Arg>) -> Self {
        Self {
            args: Args::new(args),
            returns: None,
            name: None,
            attrs: Attributes::default(),
        }
    }

    /// The value the method must return for this case.
    pub fn returns(mut self, value: impl Into<Arg>) -> Self {
        self.returns = Some(value.into());
        self
    }

    /// Replaces the derived `Method(args)` display name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    attribute_methods!(attrs);
}

// =====================
// Tests
// =====================

/// A type-erased test method, ready for expansion.
#[derive(Clone)]
pub struct TestTemplate {
    pub(crate) method: String,
    pub(crate) kind: TestKind,
    pub(crate) arity: usize,
    pub(crate) returns_value: bool,
    pub(crate) body: TestBody,
    pub(crate) cases: Vec<CaseDef>,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) strategy: Strategy,
    pub(crate) apartment: Apartment,
    pub(crate) attrs: Attributes,
}

/// A test method of a fixture with state `S`.
pub struct TestDef<S> {
    template: TestTemplate,
    _state: PhantomData<fn(&mut S)>,
}

fn downcast<S: Any>(state: &mut (dyn Any + Send + Sync)) -> Result<&mut S, Abort> {
    state.downcast_mut::<S>().ok_or_else(|| {
        Abort::fault(format!(
            "fixture instance is not a {}",
            std::any::type_name::<S>()
        ))
    })
}

fn erase_body<S, F>(body: F) -> TestBody
where
    S: Send + Sync + 'static,
    F: Fn(&mut S, &mut TestContext<'_>, &Args) -> Result<Option<Arg>, Abort> + Send + Sync + 'static,
{
    Arc::new(
        move |state: &mut (dyn Any + Send + Sync), ctx: &mut TestContext<'_>, args: &Args| {
            body(downcast::<S>(state)?, ctx, args)
        },
    )
}

impl<S: Send + Sync + 'static> TestDef<S> {
    fn from_parts(method: impl Into<String>, kind: TestKind, arity: usize, body: TestBody) -> Self {
        Self {
            template: TestTemplate {
                method: method.into(),
                kind,
                arity,
                returns_value: false,
                body,
                cases: Vec::new(),
                params: Vec::new(),
                strategy: Strategy::Combinatorial,
                apartment: Apartment::Any,
                attrs: Attributes::default(),
            },
            _state: PhantomData,
        }
    }

    /// A test without parameters.
    pub fn new<F>(method: impl Into<String>, body: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        let body = erase_body::<S, _>(move |state, ctx, _| {
            body(state, ctx)?;
            Ok(None)
        });
        Self::from_parts(method, TestKind::Simple, 0, body)
    }

    /// A method taking `arity` arguments, expanded once per [`CaseDef`].
    pub fn cases<F>(method: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>, &Args) -> Outcome + Send + Sync + 'static,
    {
        let body = erase_body::<S, _>(move |state, ctx, args| {
            body(state, ctx, args)?;
            Ok(None)
        });
        Self::from_parts(method, TestKind::Case, arity, body)
    }

    /// Like [`TestDef::cases`], but the method returns a value each case
    /// compares against its expected result.
    pub fn returning<F, R>(method: impl Into<String>, arity: usize, body: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>, &Args) -> Result<R, Abort> + Send + Sync + 'static,
        R: Into<Arg>,
    {
        let body = erase_body::<S, _>(move |state, ctx, args| {
            let value = body(state, ctx, args)?;
            Ok(Some(value.into()))
        });
        let mut def = Self::from_parts(method, TestKind::Case, arity, body);
        def.template.returns_value = true;
        def
    }

    /// A theory: one case per combination of the fixture's datapoints
    /// matching each parameter kind.
    pub fn theory<F>(method: impl Into<String>, kinds: &[ArgKind], body: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>, &Args) -> Outcome + Send + Sync + 'static,
    {
        let mut def = Self::cases(method, kinds.len(), body);
        def.template.kind = TestKind::Theory;
        def.template.params = kinds.iter().copied().map(ParamSpec::Datapoints).collect();
        def
    }

    /// One case per combination of the parameter sources.
    pub fn combinatorial<F>(method: impl Into<String>, params: Vec<ParamSpec>, body: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>, &Args) -> Outcome + Send + Sync + 'static,
    {
        let mut def = Self::cases(method, params.len(), body);
        def.template.kind = TestKind::Combinatorial;
        def.template.params = params;
        def
    }

    /// Pairs parameter values by position instead of combining them.
    pub fn sequential(mut self) -> Self {
        self.template.strategy = Strategy::Sequential;
        self
    }

    pub fn case(mut self, case: CaseDef) -> Self {
        self.template.cases.push(case);
        self
    }

    pub fn apartment(mut self, apartment: Apartment) -> Self {
        self.template.apartment = apartment;
        self
    }

    pub fn into_template(self) -> TestTemplate {
        self.template
    }
}

impl<S> TestDef<S> {
    attribute_methods!(template.attrs);
}

// =====================
// Fixtures
// =====================

/// A type-erased fixture definition, ready for discovery.
pub struct FixtureTemplate {
    pub(crate) name: String,
    pub(crate) factory: Factory,
    pub(crate) arg_sets: Vec<Args>,
    pub(crate) hooks: Hooks,
    pub(crate) tests: Vec<TestTemplate>,
    pub(crate) children: Vec<FixtureTemplate>,
    pub(crate) datapoints: Vec<Arg>,
    pub(crate) apartment: Apartment,
    pub(crate) parallelizable: bool,
    pub(crate) lifecycle: LifeCycle,
    pub(crate) attrs: Attributes,
}

/// A fixture whose state is an `S`.
pub struct FixtureDef<S> {
    template: FixtureTemplate,
    _state: PhantomData<fn(&mut S)>,
}

fn erase_hook<S, F>(hook: F) -> Hook
where
    S: Send + Sync + 'static,
    F: Fn(&mut S, &mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
{
    Arc::new(
        move |state: &mut (dyn Any + Send + Sync), ctx: &mut TestContext<'_>| {
            hook(downcast::<S>(state)?, ctx)
        },
    )
}

impl<S: Send + Sync + 'static> FixtureDef<S> {
    /// Declares a fixture. `factory` builds the state from the fixture's
    /// arguments (empty unless [`FixtureDef::instances`] is used).
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Args) -> S + Send + Sync + 'static,
    {
        Self::try_new(name, move |args| Ok(factory(args)))
    }

    /// Like [`FixtureDef::new`], with a factory that can fail.
    pub fn try_new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Args) -> Result<S, Abort> + Send + Sync + 'static,
    {
        let factory: Factory = Arc::new(move |args: &Args| {
            let state = factory(args)?;
            Ok(Box::new(state) as Box<dyn Any + Send + Sync>)
        });
        Self {
            template: FixtureTemplate {
                name: name.into(),
                factory,
                arg_sets: Vec::new(),
                hooks: Hooks::default(),
                tests: Vec::new(),
                children: Vec::new(),
                datapoints: Vec::new(),
                apartment: Apartment::Any,
                parallelizable: false,
                lifecycle: LifeCycle::SingleInstance,
                attrs: Attributes::default(),
            },
            _state: PhantomData,
        }
    }

    pub fn one_time_setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        self.template.hooks.one_time_setup = Some(erase_hook(hook));
        self
    }

    pub fn one_time_teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        self.template.hooks.one_time_teardown = Some(erase_hook(hook));
        self
    }

    pub fn setup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        self.template.hooks.setup = Some(erase_hook(hook));
        self
    }

    pub fn teardown<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut S, &mut TestContext<'_>) -> Outcome + Send + Sync + 'static,
    {
        self.template.hooks.teardown = Some(erase_hook(hook));
        self
    }

    pub fn test(mut self, test: TestDef<S>) -> Self {
        self.template.tests.push(test.into_template());
        self
    }

    /// Nests a fixture inside this one. This fixture's one-time hooks wrap
    /// the child, and its state is readable through `TestContext::scope`.
    pub fn nest(mut self, child: impl Into<FixtureTemplate>) -> Self {
        self.template.children.push(child.into());
        self
    }

    /// Expands the fixture once per argument set, named `Fixture(args)`.
    pub fn instances(mut self, sets: Vec<Vec<Arg>>) -> Self {
        self.template.arg_sets = sets.into_iter().map(Args::new).collect();
        self
    }

    /// Values theories draw their parameters from.
    pub fn datapoints<I, A>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Arg>,
    {
        self.template
            .datapoints
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn apartment(mut self, apartment: Apartment) -> Self {
        self.template.apartment = apartment;
        self
    }

    /// Allows this fixture to run concurrently with parallelizable siblings.
    pub fn parallelizable(mut self) -> Self {
        self.template.parallelizable = true;
        self
    }

    pub fn lifecycle(mut self, lifecycle: LifeCycle) -> Self {
        self.template.lifecycle = lifecycle;
        self
    }

    pub fn into_template(self) -> FixtureTemplate {
        self.template
    }
}

impl<S> FixtureDef<S> {
    attribute_methods!(template.attrs);
}

impl<S: Send + Sync + 'static> From<FixtureDef<S>> for FixtureTemplate {
    fn from(def: FixtureDef<S>) -> Self {
        def.template
    }
}
