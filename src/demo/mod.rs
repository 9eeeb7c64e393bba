//! The demonstration suite.
//!
//! Every fixture here is tagged with the outcome it must produce, covering
//! each verdict, the lifecycle hooks, nesting, apartments, captured output
//! and fixture arguments. `verdict run` executes the suite and verifies
//! every verdict against its tag.

mod apartment;
mod generic;
mod lifecycle;
mod one_time_setup;
mod parameterized;
mod setup_fixture;
mod simple;
mod text_output;
mod theories;

use crate::registry::Registry;

pub const NAMESPACE: &str = "NUnitTestDemo";

/// All demo fixtures, in declaration order.
pub fn registry() -> Registry {
    Registry::new()
        .namespace(NAMESPACE)
        .register(simple::fixture())
        .register(parameterized::fixture())
        .register(parameterized::combinatorial())
        .register(theories::fixture())
        .register(one_time_setup::fixture())
        .register(one_time_setup::failing())
        .register(setup_fixture::fixture())
        .register(apartment::on_class())
        .register(apartment::on_method())
        .register(text_output::fixture())
        .register(generic::fixture())
        .register(generic::lists())
        .register(lifecycle::fixture())
}
