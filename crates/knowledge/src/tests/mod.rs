//! Scenario tests for the query engine.

mod support;
