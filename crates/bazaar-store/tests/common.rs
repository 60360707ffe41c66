//! Common test utilities for bazaar-store integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use bazaar_core::{CategoryMetric, Listing, Price};
use bazaar_store::{CreateOutcome, Marketplace, MemoryTable};

/// A marketplace over a fresh in-memory table.
pub struct TestHarness {
    /// The repositories under test.
    pub market: Marketplace,
    /// Direct access to the table for white-box assertions.
    pub table: Arc<MemoryTable>,
}

impl TestHarness {
    /// Create a harness with an empty table.
    pub fn new() -> Self {
        let table = Arc::new(MemoryTable::new());
        let market = Marketplace::new(table.clone()).expect("key layout is valid");
        Self { market, table }
    }

    /// Register users, panicking on failure.
    pub async fn register(&self, usernames: &[&str]) {
        for username in usernames {
            self.market
                .users()
                .register(username)
                .await
                .expect("register succeeds");
        }
    }

    /// Create a listing that must succeed.
    pub async fn create(&self, username: &str, title: &str, cents: i64, category: &str) -> Listing {
        match self
            .market
            .listings()
            .create_listing(username, title, "", price(cents), category)
            .await
            .expect("create succeeds")
        {
            CreateOutcome::Created(listing) => listing,
            CreateOutcome::AlreadyExists => panic!("listing unexpectedly exists"),
        }
    }

    /// Current counter of a category, 0 when it has no record.
    pub async fn count(&self, category: &str) -> i64 {
        self.market
            .categories()
            .get_metric(category)
            .await
            .expect("metric read succeeds")
            .map_or(0, |metric: CategoryMetric| metric.count)
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// A price from minor units.
pub fn price(cents: i64) -> Price {
    Price::from_minor_units(cents).expect("non-negative price")
}
