//! Common test utilities for bazaar-cli integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use bazaar_cli::{CliConfig, Dispatcher};
use bazaar_store::{Marketplace, MemoryTable};

/// Position of the creation time in a rendered listing.
pub const CREATED_AT_FIELD: usize = 3;

/// A dispatcher over a fresh in-memory table.
pub struct TestHarness {
    /// The dispatcher under test.
    pub dispatcher: Dispatcher,
    /// Direct access to the table for white-box assertions.
    pub table: Arc<MemoryTable>,
}

impl TestHarness {
    /// Create a harness with an empty table and default settings.
    pub fn new() -> Self {
        let table = Arc::new(MemoryTable::new());
        let market = Marketplace::new(table.clone()).expect("key layout is valid");
        let dispatcher = Dispatcher::new(market, &CliConfig::default());
        Self { dispatcher, table }
    }

    /// Send one line, expecting a reply.
    pub async fn send(&self, line: &str) -> String {
        self.dispatcher
            .dispatch(line)
            .await
            .unwrap_or_else(|| panic!("no reply to {line:?}"))
    }

    /// Send one line and compare the reply, ignoring creation times.
    pub async fn expect(&self, line: &str, expected: &str) {
        let reply = self.send(line).await;
        assert_replies_match(line, &reply, expected);
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare replies line by line. Listing lines are compared field by field,
/// skipping the creation time, which only has to be well formed.
pub fn assert_replies_match(input: &str, actual: &str, expected: &str) {
    let actual_lines: Vec<_> = actual.lines().collect();
    let expected_lines: Vec<_> = expected.lines().collect();
    assert_eq!(
        actual_lines.len(),
        expected_lines.len(),
        "input {input:?}: expected {expected:?}, got {actual:?}"
    );

    for (actual_line, expected_line) in actual_lines.iter().zip(&expected_lines) {
        let actual_fields: Vec<_> = actual_line.split('|').collect();
        let expected_fields: Vec<_> = expected_line.split('|').collect();
        if expected_fields.len() != 6 {
            assert_eq!(actual_line, expected_line, "input {input:?}");
            continue;
        }

        assert_eq!(actual_fields.len(), 6, "input {input:?}: got {actual_line:?}");
        for (i, (a, e)) in actual_fields.iter().zip(&expected_fields).enumerate() {
            if i == CREATED_AT_FIELD {
                assert_eq!(a.len(), "2019-02-22 12:34:56".len(), "timestamp {a:?}");
            } else {
                assert_eq!(a, e, "input {input:?}: field {i}");
            }
        }
    }
}
