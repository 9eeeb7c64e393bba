mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::{result, run, run_with, settings, verdict_of, Log, Logged};
use verdict::descriptor::{Apartment, FixtureDescriptor, LifeCycle};
use verdict::reconcile::Verdict;
use verdict::registry::{FixtureDef, Registry, TestDef};
use verdict::report::{ExecutionResult, FixtureReport};
use verdict::scheduler::{RunListener, Scheduler};
use verdict::signal::Signal;

fn logging_fixture(name: &str, log: &Log) -> FixtureDef<Logged> {
    FixtureDef::new(name, Logged::factory(log))
        .one_time_setup(|s: &mut Logged, _| {
            s.log.push("OneTimeSetUp");
            Ok(())
        })
        .setup(|s: &mut Logged, _| {
            s.log.push("SetUp");
            Ok(())
        })
        .teardown(|s: &mut Logged, _| {
            s.log.push("TearDown");
            Ok(())
        })
        .one_time_teardown(|s: &mut Logged, _| {
            s.log.push("OneTimeTearDown");
            Ok(())
        })
}

#[test]
fn hooks_wrap_tests_in_order() {
    let log = Log::default();
    let fixture = logging_fixture("Order", &log)
        .test(TestDef::new("A", |s: &mut Logged, _| {
            s.log.push("A");
            Ok(())
        }))
        .test(TestDef::new("B", |s: &mut Logged, _| {
            s.log.push("B");
            Ok(())
        }));
    let (_, report) = run(&Registry::new().register(fixture));

    assert_eq!(
        log.entries(),
        [
            "OneTimeSetUp",
            "SetUp",
            "A",
            "TearDown",
            "SetUp",
            "B",
            "TearDown",
            "OneTimeTearDown"
        ]
    );
    assert_eq!(verdict_of(&report, "Order.A"), Verdict::Passed);
    assert!(report.fixtures[0].setup.ran);
    assert!(report.fixtures[0].teardown.ran);
}

#[test]
fn failing_setup_skips_body_and_teardown() {
    let log = Log::default();
    let fixture = FixtureDef::new("Broken", Logged::factory(&log))
        .setup(|_: &mut Logged, ctx| ctx.fail("boom"))
        .teardown(|s: &mut Logged, _| {
            s.log.push("TearDown");
            Ok(())
        })
        .test(TestDef::new("Body", |s: &mut Logged, _| {
            s.log.push("Body");
            Ok(())
        }));
    let registry = Registry::new().register(fixture);

    let (_, report) = run(&registry);
    let body = result(&report, "Broken.Body");
    assert_eq!(body.verdict, Verdict::Failed);
    assert_eq!(body.message.as_deref(), Some("SetUp: boom"));
    assert!(log.entries().is_empty());

    let mut always = settings(1);
    always.teardown_after_failed_setup = true;
    let (_, report) = run_with(&registry, always);
    assert_eq!(verdict_of(&report, "Broken.Body"), Verdict::Failed);
    assert_eq!(log.entries(), ["TearDown"]);
}

#[test]
fn teardown_failure_turns_a_passing_test_into_a_failure() {
    let fixture = FixtureDef::new("F", |_| ())
        .teardown(|_: &mut (), ctx| ctx.fail("cleanup"))
        .test(TestDef::new("T", |_, _| Ok(())));
    let (_, report) = run(&Registry::new().register(fixture));
    let t = result(&report, "F.T");
    assert_eq!(t.verdict, Verdict::Failed);
    assert_eq!(t.message.as_deref(), Some("TearDown: cleanup"));
}

#[test]
fn panicking_body_is_an_error_and_later_tests_still_run() {
    let fixture = FixtureDef::new("F", |_| ())
        .test(TestDef::new("Panics", |_: &mut (), _| panic!("kaboom")))
        .test(TestDef::new("Fine", |_, _| Ok(())));
    let (_, report) = run(&Registry::new().register(fixture));
    let panicked = result(&report, "F.Panics");
    assert_eq!(panicked.verdict, Verdict::Error);
    assert!(panicked.message.as_deref().unwrap().contains("kaboom"));
    assert_eq!(verdict_of(&report, "F.Fine"), Verdict::Passed);
}

#[test]
fn failing_one_time_setup_cascades_error_but_still_tears_down() {
    let log = Log::default();
    let inner = FixtureDef::new("Inner", |_| ()).test(TestDef::new("Deep", |_, _| Ok(())));
    let fixture = FixtureDef::new("Outer", Logged::factory(&log))
        .one_time_setup(|_: &mut Logged, ctx| ctx.fail("no database"))
        .one_time_teardown(|s: &mut Logged, _| {
            s.log.push("OneTimeTearDown");
            Ok(())
        })
        .test(TestDef::new("Shallow", |s: &mut Logged, _| {
            s.log.push("Shallow");
            Ok(())
        }))
        .nest(inner);
    let (_, report) = run(&Registry::new().register(fixture));

    for name in ["Outer.Shallow", "Outer.Inner.Deep"] {
        let r = result(&report, name);
        assert_eq!(r.verdict, Verdict::Error, "{name}");
        assert_eq!(r.message.as_deref(), Some("OneTimeSetUp: no database"));
    }
    assert_eq!(log.entries(), ["OneTimeTearDown"]);
    assert_eq!(report.fixtures[0].setup.verdict(), Verdict::Failed);
}

#[test]
fn ignored_one_time_setup_cascades_as_ignored() {
    let fixture = FixtureDef::new("F", |_| ())
        .one_time_setup(|_: &mut (), ctx| ctx.ignore("not today"))
        .test(TestDef::new("T", |_, _| Ok(())));
    let (_, report) = run(&Registry::new().register(fixture));
    assert_eq!(verdict_of(&report, "F.T"), Verdict::Ignored);
}

#[test]
fn constructor_failure_cascades_as_error() {
    let fixture = FixtureDef::<()>::try_new("F", |_| Err(verdict::Abort::fault("no state")))
        .test(TestDef::new("T", |_, _| Ok(())));
    let (_, report) = run(&Registry::new().register(fixture));
    let t = result(&report, "F.T");
    assert_eq!(t.verdict, Verdict::Error);
    assert!(t.message.as_deref().unwrap().starts_with("OneTimeSetUp:"));
}

#[test]
fn constructor_aborts_cascade_with_their_own_message() {
    let failing =
        FixtureDef::<()>::try_new("Failing", |_| Err(verdict::Abort::failure("bad config")))
            .test(TestDef::new("T", |_, _| Ok(())));
    let ignored = FixtureDef::<()>::try_new("Ignored", |_| Err(verdict::Abort::ignore("not yet")))
        .test(TestDef::new("T", |_, _| Ok(())));
    let (_, report) = run(&Registry::new().register(failing).register(ignored));

    let failed = result(&report, "Failing.T");
    assert_eq!(failed.verdict, Verdict::Error);
    assert_eq!(failed.message.as_deref(), Some("OneTimeSetUp: bad config"));
    let skipped = result(&report, "Ignored.T");
    assert_eq!(skipped.verdict, Verdict::Ignored);
    assert_eq!(skipped.message.as_deref(), Some("not yet"));
}

fn scoped_child(name: &'static str, log: &Log, fails: bool) -> FixtureDef<Logged> {
    FixtureDef::new(name, Logged::factory(log))
        .one_time_setup(move |s: &mut Logged, _| {
            s.log.push(format!("{name}.OneTimeSetUp"));
            Ok(())
        })
        .one_time_teardown(move |s: &mut Logged, _| {
            s.log.push(format!("{name}.OneTimeTearDown"));
            Ok(())
        })
        .test(TestDef::new("T", move |s: &mut Logged, ctx| {
            s.log.push(format!("{name}.T"));
            if fails {
                ctx.fail("child failed")
            } else {
                Ok(())
            }
        }))
}

#[test]
fn outer_one_time_hooks_enclose_every_child() {
    for workers in [1, 4] {
        let log = Log::default();
        let outer = FixtureDef::new("Outer", Logged::factory(&log))
            .one_time_setup(|s: &mut Logged, _| {
                s.log.push("Outer.OneTimeSetUp");
                Ok(())
            })
            .one_time_teardown(|s: &mut Logged, _| {
                s.log.push("Outer.OneTimeTearDown");
                Ok(())
            })
            .nest(scoped_child("C1", &log, true))
            .nest(scoped_child("C2", &log, false));
        let (_, report) = run_with(&Registry::new().register(outer), settings(workers));

        assert_eq!(
            log.entries(),
            [
                "Outer.OneTimeSetUp",
                "C1.OneTimeSetUp",
                "C1.T",
                "C1.OneTimeTearDown",
                "C2.OneTimeSetUp",
                "C2.T",
                "C2.OneTimeTearDown",
                "Outer.OneTimeTearDown"
            ],
            "workers {workers}"
        );
        assert_eq!(verdict_of(&report, "Outer.C1.T"), Verdict::Failed);
        assert_eq!(verdict_of(&report, "Outer.C2.T"), Verdict::Passed);
        let outer_teardowns = log
            .entries()
            .iter()
            .filter(|e| *e == "Outer.OneTimeTearDown")
            .count();
        assert_eq!(outer_teardowns, 1);
        assert!(report.fixtures[0].teardown.ran);
    }
}

#[test]
fn nested_fixtures_read_ancestor_state() {
    struct Outer {
        connection: String,
    }
    struct Inner;

    let inner = FixtureDef::new("Inner", |_| Inner).test(TestDef::new(
        "SeesOuter",
        |_: &mut Inner, ctx| {
            let outer = ctx.require_scope::<Outer>()?;
            let connection = outer.connection.clone();
            ctx.assert_eq(connection.as_str(), "open", "connection")
        },
    ));
    let outer = FixtureDef::new("Outer", |_| Outer {
        connection: String::new(),
    })
    .one_time_setup(|s: &mut Outer, _| {
        s.connection = "open".into();
        Ok(())
    })
    .nest(inner);

    let (_, report) = run(&Registry::new().namespace("NS").register(outer));
    assert_eq!(verdict_of(&report, "NS.Outer.Inner.SeesOuter"), Verdict::Passed);
}

#[test]
fn missing_scope_state_is_an_error() {
    struct Lonely;
    let fixture = FixtureDef::new("Lonely", |_| Lonely).test(TestDef::new(
        "NeedsOuter",
        |_: &mut Lonely, ctx| {
            ctx.require_scope::<String>()?;
            Ok(())
        },
    ));
    let (_, report) = run(&Registry::new().register(fixture));
    assert_eq!(verdict_of(&report, "Lonely.NeedsOuter"), Verdict::Error);
}

#[test]
fn sta_tests_run_on_a_dedicated_thread() {
    let fixture = FixtureDef::new("Threads", |_| ())
        .test(
            TestDef::new("Sta", |_: &mut (), ctx| {
                let apartment = ctx.apartment();
                ctx.assert_eq(apartment, Apartment::Sta, "apartment")
            })
            .apartment(Apartment::Sta),
        )
        .test(TestDef::new("Default", |_: &mut (), ctx| {
            let apartment = ctx.apartment();
            ctx.assert_eq(apartment, Apartment::Mta, "apartment")
        }));
    let (_, report) = run(&Registry::new().register(fixture));

    let sta = result(&report, "Threads.Sta");
    assert_eq!(sta.verdict, Verdict::Passed);
    assert_eq!(sta.apartment, Apartment::Sta);
    assert_eq!(sta.thread, "verdict-sta");
    let default = result(&report, "Threads.Default");
    assert_eq!(default.verdict, Verdict::Passed);
    assert_ne!(default.thread, "verdict-sta");
}

#[test]
fn sta_fixture_runs_its_hooks_and_tests_on_one_thread() {
    let threads = Arc::new(Mutex::new(Vec::new()));
    let seen = threads.clone();
    let fixture = FixtureDef::new("StaFixture", |_| ())
        .apartment(Apartment::Sta)
        .one_time_setup(move |_: &mut (), ctx| {
            seen.lock().unwrap().push(ctx.thread_name().to_string());
            Ok(())
        })
        .test(TestDef::new("T", |_, _| Ok(())));
    let (_, report) = run(&Registry::new().register(fixture));

    assert_eq!(*threads.lock().unwrap(), ["verdict-sta"]);
    assert_eq!(result(&report, "StaFixture.T").thread, "verdict-sta");
}

#[test]
fn parallel_fixtures_report_in_declaration_order() {
    let mut registry = Registry::new();
    for n in 0..6 {
        registry.add(
            FixtureDef::new(format!("F{n}"), |_| ())
                .parallelizable()
                .test(TestDef::new("T", |_, _| {
                    std::thread::sleep(std::time::Duration::from_millis(5));
                    Ok(())
                })),
        );
    }
    let (_, report) = run_with(&registry, settings(4));
    let names: Vec<&str> = report.fixtures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["F0", "F1", "F2", "F3", "F4", "F5"]);
    assert!(report
        .all_results()
        .iter()
        .all(|r| r.verdict == Verdict::Passed));
    assert!(report
        .all_results()
        .iter()
        .any(|r| r.thread.starts_with("verdict-worker-")));
}

fn per_test(built: &Arc<AtomicUsize>) -> FixtureDef<u32> {
    let counter = built.clone();
    FixtureDef::new("PerTest", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        0u32
    })
    .lifecycle(LifeCycle::InstancePerTestCase)
    .setup(|n: &mut u32, _| {
        *n += 1;
        Ok(())
    })
    .test(TestDef::new("A", |n: &mut u32, ctx| ctx.assert_eq(*n, 1, "")))
    .test(TestDef::new("B", |n: &mut u32, ctx| ctx.assert_eq(*n, 1, "")))
    .test(TestDef::new("C", |n: &mut u32, ctx| ctx.assert_eq(*n, 1, "")))
}

#[test]
fn instance_per_test_case_builds_a_fresh_instance_per_test() {
    for workers in [1, 3] {
        let built = Arc::new(AtomicUsize::new(0));
        let registry = Registry::new().register(per_test(&built));
        let (_, report) = run_with(&registry, settings(workers));
        assert_eq!(report.summary().passed, 3, "workers {workers}");
        // One instance for the one-time hooks plus one per test.
        assert_eq!(built.load(Ordering::SeqCst), 4);
        let names: Vec<&str> = report.all_results().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["A", "B", "C"]);
    }
}

/// Live and peak counts of test bodies running at once.
#[derive(Default)]
struct Concurrency {
    live: AtomicUsize,
    peak: AtomicUsize,
}

fn busy_per_test_fixture(name: String, seen: &Arc<Concurrency>) -> FixtureDef<()> {
    let mut fixture = FixtureDef::new(name, |_| ())
        .parallelizable()
        .lifecycle(LifeCycle::InstancePerTestCase);
    for n in 0..4 {
        let seen = seen.clone();
        fixture = fixture.test(TestDef::new(format!("T{n}"), move |_: &mut (), _| {
            let now = seen.live.fetch_add(1, Ordering::SeqCst) + 1;
            seen.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(50));
            seen.live.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }));
    }
    fixture
}

#[test]
fn workers_bound_concurrency_across_nested_pools() {
    for workers in [2, 3] {
        let seen = Arc::new(Concurrency::default());
        let mut registry = Registry::new();
        for n in 0..3 {
            registry.add(busy_per_test_fixture(format!("P{n}"), &seen));
        }
        let (_, report) = run_with(&registry, settings(workers));

        assert_eq!(report.summary().passed, 12, "workers {workers}");
        let peak = seen.peak.load(Ordering::SeqCst);
        assert!(peak <= workers, "workers {workers} peak {peak}");
    }
}

#[test]
fn expected_result_mismatch_is_a_failure() {
    use verdict::args;
    use verdict::registry::CaseDef;

    let fixture = FixtureDef::new("Math", |_| ()).test(
        TestDef::returning("Add", 2, |_: &mut (), _, a| Ok(a.int(0)? + a.int(1)?))
            .case(CaseDef::new(args![2, 2]).returns(4))
            .case(CaseDef::new(args![2, 2]).returns(5).named("Wrong")),
    );
    let (_, report) = run(&Registry::new().register(fixture));
    assert_eq!(verdict_of(&report, "Math.Add(2,2)"), Verdict::Passed);
    let wrong = result(&report, "Math.Wrong");
    assert_eq!(wrong.verdict, Verdict::Failed);
    assert_eq!(wrong.message.as_deref(), Some("Expected: 5 But was: 4"));
}

#[test]
fn explicit_and_ignored_tests_never_run_hooks() {
    let log = Log::default();
    let fixture = logging_fixture("F", &log)
        .test(TestDef::new("Explicit", |_, _| Ok(())).explicit())
        .test(TestDef::new("Ignored", |_, _| Ok(())).ignore("flaky"));
    let (_, report) = run(&Registry::new().register(fixture));

    let explicit = result(&report, "F.Explicit");
    assert_eq!(explicit.verdict, Verdict::Skipped);
    assert_eq!(explicit.signals, [Signal::Skipped("Explicit".into())]);
    assert_eq!(verdict_of(&report, "F.Ignored"), Verdict::Ignored);
    assert_eq!(log.entries(), ["OneTimeSetUp", "OneTimeTearDown"]);
}

#[test]
fn captured_output_is_attached_to_results_and_fixtures() {
    let fixture = FixtureDef::new("Out", |_| ())
        .one_time_setup(|_: &mut (), ctx| {
            ctx.out_line("fixture ready");
            Ok(())
        })
        .test(TestDef::new("T", |_: &mut (), ctx| {
            ctx.out_line("hello");
            ctx.error_line("oops");
            Ok(())
        }));
    let (_, report) = run(&Registry::new().register(fixture));
    let t = result(&report, "Out.T");
    assert_eq!(t.output.out, "hello\n");
    assert_eq!(t.output.error, "oops\n");
    assert!(report.fixtures[0].output.out.contains("fixture ready"));
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl RunListener for Recorder {
    fn fixture_started(&self, fixture: &FixtureDescriptor) {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {}", fixture.name));
    }

    fn test_finished(&self, result: &ExecutionResult) {
        self.events
            .lock()
            .unwrap()
            .push(format!("{} {}", result.name, result.verdict));
    }

    fn fixture_finished(&self, report: &FixtureReport) {
        self.events
            .lock()
            .unwrap()
            .push(format!("finish {}", report.name));
    }
}

#[test]
fn listener_sees_every_event() {
    let fixture = FixtureDef::new("F", |_| ())
        .test(TestDef::new("A", |_, _| Ok(())))
        .test(TestDef::new("B", |_: &mut (), ctx| ctx.fail("no")));
    let registry = Registry::new().register(fixture);
    let discovery = registry.discover(1);
    let recorder = Recorder::default();
    Scheduler::new(settings(1))
        .unwrap()
        .with_listener(&recorder)
        .run(&discovery);
    assert_eq!(
        *recorder.events.lock().unwrap(),
        ["start F", "A Passed", "B Failed", "finish F"]
    );
}
