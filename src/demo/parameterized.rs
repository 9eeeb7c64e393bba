use crate::args;
use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{CaseDef, FixtureDef, ParamSpec, TestDef};
use crate::signal::Abort;

pub struct ParameterizedTests;

pub fn fixture() -> FixtureDef<ParameterizedTests> {
    FixtureDef::new("ParameterizedTests", |_| ParameterizedTests)
        .test(
            TestDef::cases("TestCaseSucceeds", 3, |_, ctx, a| {
                ctx.assert_eq(a.int(0)? + a.int(1)?, a.int(2)?, "")
            })
            .case(CaseDef::new(args![2, 2, 4]))
            .case(CaseDef::new(args![0, 5, 5]))
            .case(CaseDef::new(args![31, 11, 42]))
            .expect(Expect::Pass),
        )
        .test(
            TestDef::returning("TestCaseSucceeds_Result", 2, |_, _, a| {
                Ok(a.int(0)? + a.int(1)?)
            })
            .case(CaseDef::new(args![2, 2]).returns(4))
            .case(CaseDef::new(args![0, 5]).returns(5))
            .case(CaseDef::new(args![31, 11]).returns(42))
            .expect(Expect::Pass),
        )
        .test(
            TestDef::cases("TestCaseFails", 3, |_, ctx, a| {
                ctx.assert_eq(a.int(0)? + a.int(1)?, a.int(2)?, "")
            })
            .case(CaseDef::new(args![31, 11, 99]))
            .expect(Expect::Failure),
        )
        .test(
            TestDef::returning("TestCaseFails_Result", 2, |_, _, a| {
                Ok(a.int(0)? + a.int(1)?)
            })
            .case(CaseDef::new(args![31, 11]).returns(99))
            .expect(Expect::Failure),
        )
        .test(
            TestDef::cases("TestCaseIsInconclusive", 2, |_, ctx, _| {
                ctx.inconclusive("Inconclusive test case")
            })
            .case(CaseDef::new(args![31, 11]))
            .expect(Expect::Inconclusive),
        )
        .test(
            TestDef::cases("TestCaseIsIgnored_Attribute", 2, |_, _, _| Ok(()))
                .case(CaseDef::new(args![31, 11]))
                .ignore("Ignored test")
                .expect(Expect::Ignore),
        )
        .test(
            TestDef::cases("TestCaseIsIgnored_Property", 2, |_, _, _| Ok(()))
                .case(CaseDef::new(args![31, 11]).ignore("Ignoring this"))
                .expect(Expect::Ignore),
        )
        .test(
            TestDef::cases("TestCaseIsIgnored_Assert", 2, |_, ctx, _| {
                ctx.ignore("Ignoring this test case")
            })
            .case(CaseDef::new(args![31, 11]))
            .expect(Expect::Ignore),
        )
        .test(
            TestDef::cases("TestCaseThrowsException", 2, |_, _, _| {
                Err(Abort::fault("Exception from test case"))
            })
            .case(CaseDef::new(args![31, 11]))
            .expect(Expect::Error),
        )
        .test(
            TestDef::cases("TestCaseWithAlternateName", 1, |_, _, _| Ok(()))
                .case(CaseDef::new(args![42]).named("AlternateTestName"))
                .expect(Expect::Pass),
        )
        // Declares three arguments but supplies two: not runnable.
        .test(
            TestDef::cases("TestCaseWithWrongArgumentCount", 3, |_, _, _| Ok(()))
                .case(CaseDef::new(args![31, 11]))
                .expect(Expect::Error),
        )
}

pub struct CombinatorialTests;

pub fn combinatorial() -> FixtureDef<CombinatorialTests> {
    FixtureDef::new("CombinatorialTests", |_| CombinatorialTests)
        .expect(Expect::Pass)
        .test(TestDef::combinatorial(
            "SumIsCommutative",
            vec![ParamSpec::values([1, 2, 3]), ParamSpec::range(0, 2)],
            |_, ctx, a| {
                let (x, y) = (a.int(0)?, a.int(1)?);
                ctx.assert_eq(x + y, y + x, "")
            },
        ))
        .test(
            TestDef::combinatorial(
                "PairsInSequence",
                vec![ParamSpec::values(["a", "b", "c"]), ParamSpec::values([1, 2])],
                |_, ctx, a| {
                    ctx.assert_that(a.str(0).is_ok(), "first parameter is a string")?;
                    let second = a.get(1).cloned().unwrap_or_default();
                    ctx.assert_that(second.is_null() || second.as_int().is_some(), "second parameter")
                },
            )
            .sequential(),
        )
        .test(TestDef::combinatorial(
            "RandomValuesStayInRange",
            vec![ParamSpec::random_int(3, 0, 100)],
            |_, ctx, a| {
                let n = a.int(0)?;
                ctx.assert_that((0..100).contains(&n), format!("{n} is out of range"))
            },
        ))
}
