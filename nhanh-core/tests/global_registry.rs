//! The process-wide client is established by the first successful build.
//!
//! Kept in its own test binary so no other test touches the global registry.

use std::sync::Arc;

use nhanh_core::{ClientBuilder, ClientRegistry};

#[test]
fn test_second_build_returns_first_client() {
    assert!(ClientRegistry::global().current().is_none());

    let failed = ClientBuilder::create().app_id("A0").build();
    assert!(failed.is_err());
    assert!(ClientRegistry::global().current().is_none());

    let first = ClientBuilder::create()
        .app_id("A1")
        .business_id("B1")
        .access_token("TOK")
        .build()
        .unwrap();

    let second = ClientBuilder::create()
        .app_id("A2")
        .business_id("B2")
        .access_token("OTHER")
        .timeout(120)
        .build()
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.app_id().as_str(), "A1");
    assert_eq!(second.config().timeout().as_secs(), 30);
}
