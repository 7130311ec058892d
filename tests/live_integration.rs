use fabric_gateway_http::{operations, GatewayClient, GatewayError, Outcome, ENDPOINTS_ENV};
use reqwest::StatusCode;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NodeInfo {
    name: String,
}

fn live_client() -> Option<GatewayClient> {
    if std::env::var(ENDPOINTS_ENV).is_err() {
        eprintln!("skipping live test: {ENDPOINTS_ENV} is not set");
        return None;
    }
    Some(GatewayClient::from_env().expect("live client must build from env"))
}

#[tokio::test]
async fn live_nodes_manifest_and_missing_name() {
    let Some(client) = live_client() else {
        return;
    };

    let nodes: Vec<NodeInfo> = client
        .query(&operations::get_nodes())
        .await
        .expect("node query must succeed");
    assert!(!nodes.is_empty());
    assert!(nodes.iter().all(|node| !node.name.is_empty()));

    let manifest = client
        .execute(&operations::get_cluster_manifest())
        .await
        .expect("manifest query must succeed");
    assert!(manifest.is_success());

    let missing = client
        .execute(
            &operations::name_exists("fabric:/live-test-missing-name")
                .expect("must build")
                .expect_status(StatusCode::NOT_FOUND),
        )
        .await;
    match missing {
        Ok(Outcome::ExpectedFailure(response)) => {
            assert_eq!(response.status, StatusCode::NOT_FOUND)
        }
        Ok(other) => panic!("expected a not-found outcome, got {other:?}"),
        Err(GatewayError::HeaderContractViolation { header, .. }) => {
            panic!("cluster violates {header} header contract")
        }
        Err(err) => panic!("missing name lookup failed: {err}"),
    }
}
