use fabric_gateway_http::{operations, GatewayClient, Outcome};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = GatewayClient::from_env()?;

    let nodes: Vec<Value> = client.query(&operations::get_nodes()).await?;
    println!("{} nodes", nodes.len());

    let apps: Vec<Value> = client
        .collect_pages(&operations::get_applications("2.0"))
        .await?;
    for app in &apps {
        println!("{}", app["Name"]);
    }

    match client.execute(&operations::get_cluster_manifest()).await? {
        Outcome::Success(response) => println!("manifest: {} bytes", response.body.len()),
        Outcome::ExpectedFailure(response) => println!("manifest: {}", response.status),
    }

    Ok(())
}
