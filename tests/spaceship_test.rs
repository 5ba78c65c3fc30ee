//! Spaceship integration tests. Spaceship has no zone-creation endpoint
//! (`add_zone` is intentionally left unimplemented, returning
//! `Unsupported` from the trait default) and no record enable/disable
//! operation, but the check-auth/resolve-zone/record-CRUD suite covers
//! everything else the adapter exposes.
//!
//! ```bash
//! SPACESHIP_API_KEY=xxx SPACESHIP_API_SECRET=xxx TEST_DOMAIN=example.com \
//!     cargo test --test spaceship_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use dns_gateway_provider::ProviderKind;

vendor_integration_tests!(
    ProviderKind::Spaceship,
    [
        ("apiKey", "SPACESHIP_API_KEY"),
        ("apiSecret", "SPACESHIP_API_SECRET"),
    ]
);
