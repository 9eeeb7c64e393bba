use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{FixtureDef, TestDef};
use crate::value::ArgKind;

pub struct Theories;

const TWO_INTS: &[ArgKind] = &[ArgKind::Int, ArgKind::Int];

pub fn fixture() -> FixtureDef<Theories> {
    FixtureDef::new("Theories", |_| Theories)
        .datapoints([0, 1, 42])
        .test(
            TestDef::theory("Theory_AllCasesSucceed", TWO_INTS, |_, ctx, a| {
                let (x, y) = (a.int(0)?, a.int(1)?);
                ctx.assert_eq(x + y, y + x, "")
            })
            .expect(Expect::Pass),
        )
        .test(
            TestDef::theory("Theory_SomeCasesAreInconclusive", TWO_INTS, |_, ctx, a| {
                ctx.assume(a.int(1)? != 0, "b must not be zero")
            })
            .expect(Expect::Mixed),
        )
        .test(
            TestDef::theory("Theory_SomeCasesFail", TWO_INTS, |_, ctx, a| {
                ctx.assert_that(a.int(1)? != 0, "b was zero")
            })
            .expect(Expect::Mixed),
        )
}
