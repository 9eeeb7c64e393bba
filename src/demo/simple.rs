use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{FixtureDef, TestDef};
use crate::signal::Abort;

pub struct SimpleTests;

pub fn fixture() -> FixtureDef<SimpleTests> {
    FixtureDef::new("SimpleTests", |_| SimpleTests)
        .test(
            TestDef::new("TestSucceeds", |_, ctx| {
                ctx.out_line("Simple test running");
                ctx.assert_eq(2 + 2, 4, "")
            })
            .expect(Expect::Pass),
        )
        .test(
            TestDef::new("TestSucceeds_Message", |_, ctx| {
                ctx.assert_eq(2 + 2, 4, "")?;
                ctx.pass("Simple arithmetic!")
            })
            .expect(Expect::Pass),
        )
        .test(TestDef::new("TestFails", |_, ctx| ctx.assert_eq(2 + 2, 5, "")).expect(Expect::Failure))
        .test(
            TestDef::new("TestWarns", |_, ctx| {
                ctx.warn("This is a warning");
                Ok(())
            })
            .expect(Expect::Warning),
        )
        .test(
            TestDef::new("TestWarnsThreeTimes", |_, ctx| {
                ctx.warn("Warning 1");
                ctx.warn("Warning 2");
                ctx.warn("Warning 3");
                Ok(())
            })
            .expect(Expect::Warning),
        )
        .test(
            TestDef::new("TestWithThreeFailures", |_, ctx| {
                ctx.multiple(|ctx| {
                    ctx.fail("Failure 1")?;
                    ctx.assert_eq(2 + 2, 5, "Failure 2")?;
                    ctx.assert_greater(42, 99, "Failure 3")
                })
            })
            .expect(Expect::Failure),
        )
        // The error raised inside the block outranks the recorded failures.
        .test(
            TestDef::new("TestWithTwoFailuresAndAnError", |_, ctx| {
                ctx.multiple(|ctx| {
                    ctx.assert_eq(2 + 2, 5, "")?;
                    ctx.assert_greater(42, 99, "")?;
                    Err(Abort::fault("Throwing after two failures"))
                })
            })
            .expect(Expect::Error),
        )
        .test(
            TestDef::new("TestWithFailureAndWarning", |_, ctx| {
                ctx.warn("WARNING!");
                ctx.fail("FAILING!")
            })
            .expect(Expect::Failure),
        )
        .test(
            TestDef::new("TestWithTwoFailuresAndAWarning", |_, ctx| {
                ctx.warn_unless(2 + 2 == 5, "Math is too hard!");
                ctx.multiple(|ctx| {
                    ctx.assert_eq(2 + 2, 5, "")?;
                    ctx.assert_greater(42, 99, "")
                })
            })
            .expect(Expect::Failure),
        )
        .test(
            TestDef::new("TestFails_StringEquality", |_, ctx| {
                let greeting = ["Hello", "World", "!"].concat();
                ctx.assert_eq(greeting.as_str(), "Hello World!", "")
            })
            .expect(Expect::Failure),
        )
        .test(
            TestDef::new("TestIsInconclusive", |_, ctx| ctx.inconclusive("Testing"))
                .expect(Expect::Inconclusive),
        )
        .test(
            TestDef::new("TestIsIgnored_Attribute", |_, _| Ok(()))
                .ignore("Ignoring this test deliberately")
                .expect(Expect::Ignore),
        )
        .test(
            TestDef::new("TestIsIgnored_Assert", |_, ctx| {
                ctx.ignore("Ignoring this test deliberately")
            })
            .expect(Expect::Ignore),
        )
        .test(
            TestDef::new("TestIsSkipped_Platform", |_, _| Ok(()))
                .exclude_platforms(["rust"])
                .expect(Expect::Skipped),
        )
        .test(
            TestDef::new("TestIsExplicit", |_, _| Ok(()))
                .explicit()
                .expect(Expect::Skipped),
        )
        .test(
            TestDef::new("TestThrowsException", |_, _| {
                Err(Abort::fault("Deliberate exception thrown"))
            })
            .expect(Expect::Error),
        )
        .test(
            TestDef::new("TestPanics", |_, _| panic!("Deliberate panic"))
                .expect(Expect::Error),
        )
        .test(
            TestDef::new("TestWithProperty", |_, _| Ok(()))
                .property("Priority", "High")
                .expect(Expect::Pass),
        )
        .test(
            TestDef::new("TestWithTwoProperties", |_, _| Ok(()))
                .property("Priority", "Low")
                .property("Action", "Ignore")
                .expect(Expect::Pass),
        )
        .test(
            TestDef::new("TestWithCategory", |_, _| Ok(()))
                .category("Slow")
                .expect(Expect::Pass),
        )
        .test(
            TestDef::new("TestWithTwoCategories", |_, _| Ok(()))
                .category("Slow")
                .category("Data")
                .expect(Expect::Pass),
        )
}
