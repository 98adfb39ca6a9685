//! End-to-end tests: keystone authentication followed by cinder calls.
//!
//! **Coverage:**
//! - Happy path: authenticate → catalog lookup → volume fetch
//! - Server error: the status code and body reach the caller
//! - Token expiry: 401 → single reauthentication → retried call succeeds
//! - Retry budget: transient 5xx recovered within the attempt budget

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use osc_domain::OpenStackError;
use osc_infra::RequestContext;
use support::{cloud, mount_keystone, volume_body, PROJECT_ID, TOKEN};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn volume_path() -> String {
    format!("/volume/v3/{PROJECT_ID}/volumes/vol-1")
}

/// Validates the full authenticate-then-fetch flow.
///
/// Assertions:
/// - the token and project come from keystone
/// - the volume request carries the token and the fixed query
/// - status and image metadata are decoded
#[tokio::test]
async fn test_get_volume_after_authentication() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_keystone(&server).await;
    Mock::given(method("GET"))
        .and(path(volume_path()))
        .and(query_param("limit", "1"))
        .and(query_param("all_tenants", "1"))
        .and(header("x-auth-token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(volume_body("in-use")))
        .expect(1)
        .mount(&server)
        .await;

    let cloud = cloud(&server);
    let ctx = RequestContext::background();
    cloud.authenticate(&ctx).await?;

    assert_eq!(cloud.client().get_token(), TOKEN);
    assert_eq!(cloud.keystone().project_id(), PROJECT_ID);

    let volume = cloud.cinder().get_volume(&ctx, "vol-1").await?;
    assert_eq!(volume.volume.status, "in-use");
    assert_eq!(volume.volume.volume_image_metadata.disk_format, "qcow2");
    assert_eq!(volume.volume.volume_image_metadata.image_name, "cirros-0.6.2-x86_64-disk");
    Ok(())
}

#[tokio::test]
async fn test_server_error_surfaces_code_and_body() {
    let server = MockServer::start().await;
    mount_keystone(&server).await;
    Mock::given(method("GET"))
        .and(path(volume_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("cinder is down"))
        .expect(3)
        .mount(&server)
        .await;

    let cloud = cloud(&server);
    let ctx = RequestContext::background();
    cloud.authenticate(&ctx).await.expect("authenticate");

    let err = cloud.cinder().get_volume(&ctx, "vol-1").await.unwrap_err();
    assert_eq!(err, OpenStackError::HttpStatus { code: 500, body: "cinder is down".into() });

    let message = err.to_string();
    assert!(message.contains("500"));
    assert!(message.contains("cinder is down"));
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    let issued = Arc::new(AtomicUsize::new(0));
    let counter = issued.clone();
    let body = support::token_body(&server);
    Mock::given(method("POST"))
        .and(path("/identity/v3/auth/tokens"))
        .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(201)
                .insert_header("X-Subject-Token", format!("token-{n}").as_str())
                .set_body_json(body.clone())
        })
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(volume_path()))
        .and(header("x-auth-token", "token-0"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(volume_path()))
        .and(header("x-auth-token", "token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(volume_body("available")))
        .expect(1)
        .mount(&server)
        .await;

    let cloud = cloud(&server);
    let ctx = RequestContext::background();
    cloud.authenticate(&ctx).await.expect("authenticate");

    let volume = cloud.cinder().get_volume(&ctx, "vol-1").await.expect("volume");
    assert_eq!(volume.volume.status, "available");
    assert_eq!(issued.load(Ordering::SeqCst), 2);
    assert_eq!(cloud.client().get_token(), "token-1");
}

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let server = MockServer::start().await;
    mount_keystone(&server).await;
    Mock::given(method("GET"))
        .and(path(volume_path()))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(volume_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(volume_body("available")))
        .expect(1)
        .mount(&server)
        .await;

    let cloud = cloud(&server);
    let ctx = RequestContext::background();
    cloud.authenticate(&ctx).await.expect("authenticate");

    let volume = cloud.cinder().get_volume(&ctx, "vol-1").await.expect("volume");
    assert_eq!(volume.volume.status, "available");
}

#[tokio::test]
async fn test_unauthenticated_client_has_no_cinder_endpoint() {
    let server = MockServer::start().await;
    let cloud = cloud(&server);

    let err = cloud.cinder().get_volume(&RequestContext::background(), "vol-1").await.unwrap_err();
    assert!(matches!(err, OpenStackError::Config(_)));
}

#[tokio::test]
async fn test_keystone_rejection_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("The request you have made requires authentication."))
        .mount(&server)
        .await;

    let cloud = cloud(&server);
    cloud.client().set_max_retries(0);

    let err = cloud.authenticate(&RequestContext::background()).await.unwrap_err();
    assert!(matches!(err, OpenStackError::Auth(ref msg) if msg.contains("401")));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
