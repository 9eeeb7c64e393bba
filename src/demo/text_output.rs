use crate::descriptor::ExpectedOutcome as Expect;
use crate::registry::{FixtureDef, TestDef};

pub struct TextOutputTests;

pub fn fixture() -> FixtureDef<TextOutputTests> {
    FixtureDef::new("TextOutputTests", |_| TextOutputTests)
        .expect(Expect::Pass)
        .test(TestDef::new("WriteToConsole", |_, ctx| {
            ctx.out_line("This is Console line 1");
            ctx.out_line("This is Console line 2\nThis is Console line 3");
            Ok(())
        }))
        .test(TestDef::new("WriteToError", |_, ctx| {
            ctx.error("This is Error line 1");
            ctx.error("This is Error line 2\nThis is Error line 3");
            Ok(())
        }))
        .test(TestDef::new("WriteToProgress", |_, ctx| {
            for n in 1..=3 {
                ctx.progress(format!("This is Progress line {n}"));
            }
            Ok(())
        }))
        .test(
            TestDef::new("DisplayTestSettings", |_, ctx| {
                let cwd = std::env::current_dir()?;
                ctx.out_line(format!("CurrentDirectory={}", cwd.display()));
                let (thread, apartment) = (ctx.thread_name().to_string(), ctx.apartment());
                ctx.out_line(format!("Thread={thread}"));
                ctx.out_line(format!("Apartment={apartment}"));
                let name = ctx.full_name().to_string();
                ctx.out_line(format!("FullName={name}"));
                Ok(())
            })
            .description("Displays various settings for verification"),
        )
        .test(TestDef::new("DisplayTestParameters", |_, ctx| {
            let lines: Vec<String> = ctx
                .parameters()
                .iter()
                .map(|(key, value)| format!("Parameter: {key} = {value}"))
                .collect();
            if lines.is_empty() {
                ctx.out_line("No TestParameters were passed");
            }
            for line in lines {
                ctx.out_line(line);
            }
            Ok(())
        }))
}
