//! Test suites for the `kiln` supervisor runtime.

mod support;
