//! Shared fixtures for integration tests: a mock keystone and cinder on one
//! wiremock server.

#![allow(dead_code)]

use std::time::Duration;

use osc_domain::AuthOptions;
use osc_infra::OpenStack;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "gAAAAABtest-token";
pub const PROJECT_ID: &str = "8c2b1b5d0e3a4f0d9f7a6c5b4a3d2e1f";

/// Keystone token body whose catalog points cinder at `server`.
pub fn token_body(server: &MockServer) -> Value {
    json!({
        "token": {
            "methods": ["password"],
            "expires_at": "2031-06-01T12:00:00.000000Z",
            "issued_at": "2031-06-01T11:00:00.000000Z",
            "project": { "id": PROJECT_ID, "name": "demo", "domain": { "id": "default" } },
            "catalog": [
                {
                    "id": "c1",
                    "name": "cinderv3",
                    "type": "volumev3",
                    "endpoints": [
                        { "id": "e1", "interface": "admin", "region": "RegionOne", "url": "http://admin.invalid/v3" },
                        { "id": "e2", "interface": "public", "region": "RegionOne", "url": format!("{}/volume/v3/{PROJECT_ID}", server.uri()) }
                    ]
                },
                {
                    "id": "k1",
                    "name": "keystone",
                    "type": "identity",
                    "endpoints": [
                        { "id": "e3", "interface": "public", "region": "RegionOne", "url": format!("{}/identity", server.uri()) }
                    ]
                }
            ]
        }
    })
}

/// Volume body as returned by `GET /volumes/{id}`.
pub fn volume_body(status: &str) -> Value {
    json!({
        "volume": {
            "id": "vol-1",
            "status": status,
            "size": 1,
            "bootable": "true",
            "volume_image_metadata": {
                "checksum": "443b7623e27ecf03dc9e01ee93f67afe",
                "min_ram": "0",
                "disk_format": "qcow2",
                "image_name": "cirros-0.6.2-x86_64-disk",
                "image_id": "1b2c3d4e-0000-1111-2222-333344445555",
                "container_format": "bare",
                "min_disk": "0",
                "size": "21430272"
            }
        }
    })
}

/// Mount a keystone that issues `TOKEN` on every request.
pub async fn mount_keystone(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/identity/v3/auth/tokens"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Subject-Token", TOKEN)
                .set_body_json(token_body(server)),
        )
        .mount(server)
        .await;
}

pub fn auth_options(server: &MockServer) -> AuthOptions {
    AuthOptions::new("demo", "default", "secret", format!("{}/identity/v3/auth/tokens", server.uri()))
}

/// Client against `server` with short retry delays.
pub fn cloud(server: &MockServer) -> OpenStack {
    let cloud = OpenStack::new(auth_options(server)).expect("client should build");
    cloud.client().set_retry_delay(Duration::from_millis(10));
    cloud
}
