use crate::context::TestContext;
use crate::descriptor::{Apartment, ExpectedOutcome as Expect};
use crate::registry::{FixtureDef, TestDef};
use crate::signal::Outcome;

pub struct FixtureWithApartmentAttributeOnClass;
pub struct FixtureWithApartmentAttributeOnMethod;

fn runs_in<S>(expected: Apartment) -> impl Fn(&mut S, &mut TestContext<'_>) -> Outcome {
    move |_, ctx| {
        let apartment = ctx.apartment();
        ctx.assert_eq(apartment, expected, "apartment")?;
        if expected == Apartment::Sta {
            let thread = ctx.thread_name().to_string();
            ctx.assert_eq(thread.as_str(), "verdict-sta", "thread")?;
        }
        Ok(())
    }
}

pub fn on_class() -> FixtureDef<FixtureWithApartmentAttributeOnClass> {
    FixtureDef::new("FixtureWithApartmentAttributeOnClass", |_| {
        FixtureWithApartmentAttributeOnClass
    })
    .apartment(Apartment::Sta)
    .expect(Expect::Pass)
    .test(TestDef::new("TestMethodInSTAFixture", runs_in(Apartment::Sta)))
}

pub fn on_method() -> FixtureDef<FixtureWithApartmentAttributeOnMethod> {
    FixtureDef::new("FixtureWithApartmentAttributeOnMethod", |_| {
        FixtureWithApartmentAttributeOnMethod
    })
    .expect(Expect::Pass)
    .test(TestDef::new("TestMethodInSTA", runs_in(Apartment::Sta)).apartment(Apartment::Sta))
    .test(TestDef::new("TestMethodInMTA", runs_in(Apartment::Mta)))
}
