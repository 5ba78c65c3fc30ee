//! NameSilo integration tests. NameSilo has no record enable/disable
//! operation and no native pagination, so it's exercised through the
//! same check-auth/resolve-zone/record-CRUD suite as every other vendor.
//!
//! ```bash
//! NAMESILO_API_KEY=xxx TEST_DOMAIN=example.com \
//!     cargo test --test namesilo_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(ProviderKind::Namesilo, [("apiKey", "NAMESILO_API_KEY")]);
