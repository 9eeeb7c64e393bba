use crate::context::TestContext;
use crate::descriptor::{ExpectedOutcome as Expect, LifeCycle};
use crate::registry::{FixtureDef, TestDef};
use crate::signal::Outcome;

/// Each test gets its own instance, so every counter starts from zero.
#[derive(Default)]
pub struct InstancePerTestCaseTests {
    set_ups: u32,
    tear_downs: u32,
}

fn fresh_instance(s: &mut InstancePerTestCaseTests, ctx: &mut TestContext<'_>) -> Outcome {
    ctx.assert_eq(s.set_ups, 1, "setups seen by this instance")?;
    ctx.assert_eq(s.tear_downs, 0, "teardowns seen by this instance")
}

pub fn fixture() -> FixtureDef<InstancePerTestCaseTests> {
    FixtureDef::new("InstancePerTestCaseTests", |_| {
        InstancePerTestCaseTests::default()
    })
    .lifecycle(LifeCycle::InstancePerTestCase)
    .parallelizable()
    .expect(Expect::Pass)
    .setup(|s: &mut InstancePerTestCaseTests, _| {
        s.set_ups += 1;
        Ok(())
    })
    .teardown(|s: &mut InstancePerTestCaseTests, ctx| {
        s.tear_downs += 1;
        ctx.assert_eq(s.tear_downs, 1, "teardowns")
    })
    .test(TestDef::new("FirstTestSeesFreshInstance", fresh_instance))
    .test(TestDef::new("SecondTestSeesFreshInstance", fresh_instance))
    .test(TestDef::new("ThirdTestSeesFreshInstance", fresh_instance))
}
