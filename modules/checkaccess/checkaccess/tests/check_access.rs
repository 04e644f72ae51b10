#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Wire-level tests: the real hyper transport against a mock PDP.

use std::sync::Arc;

use checkaccess::{ClientOptions, RemotePdpClientImpl, RetryConfig, StaticTokenCredential};
use checkaccess_sdk::{
    AccessDecision, CallContext, PdpClientError, RemotePdpClient, TokenCredential,
    create_authorization_request,
};
use httpmock::prelude::*;
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};

const API_VERSION: &str = "2021-06-01-preview";
const SCOPE: &str = "https://authorization.azure.net/.default";

fn user_token(claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"integration-test-key"),
    )
    .expect("token signs")
}

fn client_for(server: &MockServer) -> RemotePdpClientImpl {
    let credential: Arc<dyn TokenCredential> = Arc::new(StaticTokenCredential::new("pdp-token"));
    RemotePdpClientImpl::new(
        &server.url(format!("/checkAccess?api-version={API_VERSION}")),
        SCOPE,
        Some(credential),
        ClientOptions::default()
            .with_application_id("integration-rp")
            .with_retry(RetryConfig::disabled()),
    )
    .expect("client builds")
}

#[tokio::test]
async fn end_to_end_allowed_decision() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/checkAccess")
                .query_param("api-version", API_VERSION)
                .header("authorization", "Bearer pdp-token")
                .header("content-type", "application/json")
                .header_exists("x-ms-client-request-id")
                .json_body(json!({
                    "Subject": {
                        "Attributes": { "ObjectId": "object123", "Groups": ["g1"] }
                    },
                    "Actions": [{ "Id": "read" }, { "Id": "write" }],
                    "Resource": { "Id": "resource456" }
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "value": [
                        { "actionId": "read", "accessDecision": "Allowed", "isDataAction": false },
                        { "actionId": "write", "accessDecision": "NotAllowed", "isDataAction": false }
                    ]
                }));
        })
        .await;

    let token = user_token(&json!({ "oid": "object123", "groups": ["g1"] }));
    let request = create_authorization_request("resource456", ["read", "write"], &token).unwrap();

    let response = client_for(&server)
        .check_access(&CallContext::new(), &request)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(
        response.decision_for("read").unwrap().access_decision,
        AccessDecision::Allowed
    );
    assert_eq!(
        response.decision_for("write").unwrap().access_decision,
        AccessDecision::NotAllowed
    );
}

#[tokio::test]
async fn group_overflow_requests_expansion_on_the_wire() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/checkAccess").json_body(json!({
                "Subject": {
                    "Attributes": {
                        "ObjectId": "object123",
                        "xms-pasrp-retrievegroupmemberships": "GroupExpansion"
                    }
                },
                "Actions": [{ "Id": "read" }],
                "Resource": { "Id": "resource456" }
            }));
            then.status(200).json_body(json!({ "value": [] }));
        })
        .await;

    let token = user_token(&json!({
        "oid": "object123",
        "_claim_names": { "groups": "src1" }
    }));
    let request = create_authorization_request("resource456", ["read"], &token).unwrap();

    let response = client_for(&server)
        .check_access(&CallContext::new(), &request)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(response.value.is_empty());
}

#[tokio::test]
async fn unauthorized_returns_remote_decision_error() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/checkAccess");
            then.status(401).body("invalid bearer token");
        })
        .await;

    let token = user_token(&json!({ "oid": "object123" }));
    let request = create_authorization_request("resource456", ["read"], &token).unwrap();

    let err = client_for(&server)
        .check_access(&CallContext::new(), &request)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(
        err,
        PdpClientError::RemoteDecision {
            status: 401,
            body: "invalid bearer token".to_owned(),
        }
    );
}

#[tokio::test]
async fn unknown_response_fields_pass_through() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/checkAccess");
            then.status(200).json_body(json!({
                "value": [{ "actionId": "read", "accessDecision": "Allowed" }],
                "nextLink": null,
                "diagnostics": { "region": "westus" }
            }));
        })
        .await;

    let token = user_token(&json!({ "oid": "object123" }));
    let request = create_authorization_request("resource456", ["read"], &token).unwrap();

    let response = client_for(&server)
        .check_access(&CallContext::new(), &request)
        .await
        .unwrap();

    assert_eq!(response.additional["diagnostics"]["region"], "westus");
    assert_eq!(
        serde_json::to_value(&response).unwrap()["value"][0]["accessDecision"],
        "Allowed"
    );
}
