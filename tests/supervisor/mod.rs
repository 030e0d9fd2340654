//! Supervisor module tests.

mod runner_test;
