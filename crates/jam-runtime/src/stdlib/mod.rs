//! The Jam standard library.
//!
//! Every builtin is a (name, signature, implementation) triple registered
//! into the [`FunctionRegistry`]. Implementations receive already-evaluated
//! values through an [`Invocation`](crate::executor::Invocation) and invoke
//! lambda arguments through it; each such invocation goes through the
//! call-depth accounting.

pub mod arrays;
pub mod combinators;
pub mod datetime;
pub mod math;
pub mod schema;
pub mod strings;
pub mod util;

use jam_core::signature::FunctionSignature;

use crate::function::{NativeFunction, NativeHandler};
use crate::registry::FunctionRegistry;

/// Install the complete builtin library.
pub fn install(registry: &mut FunctionRegistry) {
    arrays::install(registry);
    combinators::install(registry);
    math::install(registry);
    strings::install(registry);
    datetime::install(registry);
    schema::install(registry);
    util::install(registry);
}

/// Builtin names and signatures are library constants; registration can
/// only fail on a programming error in the library itself.
pub(crate) fn register(
    registry: &mut FunctionRegistry,
    signature: FunctionSignature,
    handler: NativeHandler,
) {
    registry
        .register(NativeFunction::new(signature, handler))
        .expect("builtin signatures are unique and well-formed");
}
