use std::collections::VecDeque;

use crate::args;
use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{FixtureDef, TestDef};
use crate::signal::Abort;
use crate::value::Args;

pub struct GenericTests {
    pub element: String,
}

pub fn fixture() -> FixtureDef<GenericTests> {
    FixtureDef::try_new("GenericTests", |a: &Args| {
        Ok(GenericTests {
            element: a.str(0)?.to_string(),
        })
    })
    .instances(vec![args!["int"]])
    .test(
        TestDef::new("TestIt", |s: &mut GenericTests, ctx| {
            ctx.assert_that(!s.element.is_empty(), "element type is named")
        })
        .expect(Expect::Pass),
    )
}

/// The list operations the fixture exercises, implemented by several
/// collections.
pub trait IntList: Send + Sync {
    fn add(&mut self, value: i64);
    fn count(&self) -> usize;
}

impl IntList for Vec<i64> {
    fn add(&mut self, value: i64) {
        self.push(value);
    }

    fn count(&self) -> usize {
        self.len()
    }
}

impl IntList for VecDeque<i64> {
    fn add(&mut self, value: i64) {
        self.push_back(value);
    }

    fn count(&self) -> usize {
        self.len()
    }
}

pub struct GenericListTests {
    kind: String,
    list: Option<Box<dyn IntList>>,
}

fn new_list(kind: &str) -> Result<Box<dyn IntList>, Abort> {
    match kind {
        "vec" => Ok(Box::<Vec<i64>>::default()),
        "deque" => Ok(Box::<VecDeque<i64>>::default()),
        other => Err(Abort::fault(format!("unknown list kind '{other}'"))),
    }
}

pub fn lists() -> FixtureDef<GenericListTests> {
    FixtureDef::try_new("GenericTests_IList", |a: &Args| {
        Ok(GenericListTests {
            kind: a.str(0)?.to_string(),
            list: None,
        })
    })
    .instances(vec![args!["vec"], args!["deque"]])
    .expect(Expect::Pass)
    .setup(|s: &mut GenericListTests, _| {
        s.list = Some(new_list(&s.kind)?);
        Ok(())
    })
    .test(TestDef::new("CanAddToList", |s: &mut GenericListTests, ctx| {
        let list = s
            .list
            .as_mut()
            .ok_or_else(|| Abort::fault("setup did not create the list"))?;
        for n in 1..=3 {
            list.add(n);
        }
        let count = list.count();
        ctx.assert_eq(count, 3, "")
    }))
}
