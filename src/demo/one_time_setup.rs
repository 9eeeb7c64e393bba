use crate::context::TestContext;
use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{FixtureDef, TestDef};
use crate::signal::Outcome;

#[derive(Default)]
pub struct OneTimeSetUpTests {
    set_up_count: u32,
    tear_down_count: u32,
}

fn ran_once(s: &mut OneTimeSetUpTests, ctx: &mut TestContext<'_>) -> Outcome {
    ctx.assert_eq(s.set_up_count, 1, "")?;
    ctx.assert_eq(s.tear_down_count, 0, "")
}

pub fn fixture() -> FixtureDef<OneTimeSetUpTests> {
    FixtureDef::new("OneTimeSetUpTests", |_| OneTimeSetUpTests::default())
        .expect(Expect::Pass)
        .one_time_setup(|s: &mut OneTimeSetUpTests, ctx| {
            ctx.assert_eq(s.set_up_count, 0, "")?;
            ctx.assert_eq(s.tear_down_count, 0, "")?;
            s.set_up_count += 1;
            Ok(())
        })
        .one_time_teardown(|s: &mut OneTimeSetUpTests, ctx| {
            ctx.assert_eq(s.set_up_count, 1, "Unexpected error")?;
            ctx.assert_eq(s.tear_down_count, 0, "")?;
            s.tear_down_count += 1;
            Ok(())
        })
        .test(TestDef::new("Test1", ran_once))
        .test(TestDef::new("Test2", ran_once))
}

/// A fixture whose one-time setup fails: every test in it reports `Error`
/// without running.
pub struct OneTimeSetUpFails;

pub fn failing() -> FixtureDef<OneTimeSetUpFails> {
    FixtureDef::new("OneTimeSetUpFails", |_| OneTimeSetUpFails)
        .expect(Expect::Error)
        .one_time_setup(|_, ctx| ctx.fail("Setup failed deliberately"))
        .test(TestDef::new("NeverRuns", |_, ctx| ctx.fail("body must not run")))
        .nest(
            FixtureDef::new("Nested", |_| ())
                .test(TestDef::new("NeverRunsEither", |_, ctx| ctx.fail("body must not run"))),
        )
}
