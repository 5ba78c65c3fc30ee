//! West.cn integration tests.
//!
//! ```bash
//! WESTCN_USERNAME=xxx WESTCN_API_PASSWORD=xxx TEST_DOMAIN=example.com \
//!     cargo test --test westcn_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Westcn,
    [
        ("username", "WESTCN_USERNAME"),
        ("apiPassword", "WESTCN_API_PASSWORD"),
    ]
);
