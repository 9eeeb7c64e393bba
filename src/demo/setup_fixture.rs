use crate::context::TestContext;
use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{FixtureDef, TestDef};
use crate::signal::Outcome;

/// Scope state shared with the nested fixtures.
#[derive(Default)]
pub struct SetUpFixture {
    set_up_count: u32,
    tear_down_count: u32,
}

pub struct TestFixture1;
pub struct TestFixture2;

fn scope_was_set_up<S>(_: &mut S, ctx: &mut TestContext<'_>) -> Outcome {
    let scope = ctx.require_scope::<SetUpFixture>()?;
    let (set_up, torn_down) = (scope.set_up_count, scope.tear_down_count);
    ctx.assert_eq(set_up, 1, "")?;
    ctx.assert_eq(torn_down, 0, "")
}

pub fn fixture() -> FixtureDef<SetUpFixture> {
    FixtureDef::new("SetUpFixture", |_| SetUpFixture::default())
        .one_time_setup(|s: &mut SetUpFixture, ctx| {
            ctx.assert_eq(s.set_up_count, 0, "")?;
            s.set_up_count += 1;
            Ok(())
        })
        .one_time_teardown(|s: &mut SetUpFixture, ctx| {
            ctx.assert_eq(s.tear_down_count, 0, "")?;
            s.tear_down_count += 1;
            Ok(())
        })
        .nest(
            FixtureDef::new("TestFixture1", |_| TestFixture1)
                .expect(Expect::Pass)
                .test(TestDef::new("Test1", scope_was_set_up::<TestFixture1>)),
        )
        .nest(
            FixtureDef::new("TestFixture2", |_| TestFixture2)
                .expect(Expect::Pass)
                .test(TestDef::new("Test2", scope_was_set_up::<TestFixture2>)),
        )
}
