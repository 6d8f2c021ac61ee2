//! End-to-end pipeline scenarios and shared test doubles.

pub(crate) mod support;
