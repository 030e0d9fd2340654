//! Daemon lifecycle tests against real processes.

mod messenger_test;
