//! Thread affinity.
//!
//! Work that requires an apartment the current thread does not provide runs
//! on a freshly spawned, named thread. The caller blocks until it finishes,
//! and the result, or the panic as a [`Fault`], is marshalled back.

use std::thread;

use crate::descriptor::Apartment;
use crate::signal::Fault;

/// Returns true when work requiring `required` cannot run on a thread that
/// provides `current`.
pub(crate) fn needs_thread(required: Apartment, current: Apartment) -> bool {
    required != Apartment::Any && required != current
}

/// The apartment work runs in: its requirement, or the current one.
pub(crate) fn effective(required: Apartment, current: Apartment) -> Apartment {
    match required {
        Apartment::Any => current,
        other => other,
    }
}

fn thread_name(apartment: Apartment) -> &'static str {
    match apartment {
        Apartment::Sta => "verdict-sta",
        Apartment::Mta | Apartment::Any => "verdict-mta",
    }
}

/// Runs `work` on a dedicated thread for `apartment` and waits for it.
pub(crate) fn run_on<R, F>(apartment: Apartment, work: F) -> Result<R, Fault>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    thread::scope(|scope| {
        let handle = thread::Builder::new()
            .name(thread_name(apartment).to_string())
            .spawn_scoped(scope, work)
            .map_err(|err| Fault::new(format!("failed to spawn {apartment} thread: {err}")))?;
        handle.join().map_err(Fault::from_panic)
    })
}
