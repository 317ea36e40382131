use anyhow::Result;
use aws_sdk_ec2::types::{Filter, Instance};
use aws_sdk_ec2::Client;
use futures::stream::{self, StreamExt, TryStreamExt};

/// Instance attributes a query string is matched against.
pub const MATCH_ATTRIBUTES: [&str; 4] = [
    "tag:Name",
    "network-interface.addresses.association.public-ip",
    "network-interface.addresses.private-ip-address",
    "network-interface.private-dns-name",
];

/// Upper bound on in-flight DescribeInstances calls.
pub const QUERY_WORKERS: usize = 4;

pub fn name(instance: &Instance) -> String {
    instance
        .tags()
        .iter()
        .find(|tag| tag.key() == Some("Name"))
        .and_then(|tag| tag.value())
        .unwrap_or_default()
        .to_string()
}

pub fn public_ip(instance: &Instance) -> Option<&str> {
    instance.public_ip_address()
}

pub fn private_ip(instance: &Instance) -> Option<&str> {
    instance.private_ip_address()
}

/// Finds instances whose name, public IP, private IP, or private DNS name
/// contains `query`. One describe call is issued per attribute; the calls run
/// concurrently and all must succeed before the merged result is returned.
pub async fn match_instances(client: &Client, query: &str) -> Result<Vec<Instance>> {
    let pattern = format!("*{query}*");

    let matched: Vec<Vec<Instance>> = stream::iter(MATCH_ATTRIBUTES)
        .map(|attribute| fetch_by_attribute(client, attribute, &pattern))
        .buffered(QUERY_WORKERS)
        .try_collect()
        .await?;

    Ok(sort_by_name(matched.into_iter().flatten().collect()))
}

async fn fetch_by_attribute(
    client: &Client,
    attribute: &str,
    pattern: &str,
) -> Result<Vec<Instance>> {
    let filter = Filter::builder().name(attribute).values(pattern).build();

    let response = client.describe_instances().filters(filter).send().await?;

    Ok(response
        .reservations()
        .iter()
        .flat_map(|reservation| reservation.instances())
        .cloned()
        .collect())
}

/// Sorts matches ascending by display name. The sort is stable, so instances
/// sharing a name (or matched under more than one attribute) keep their fetch
/// order; unnamed instances sort first.
pub fn sort_by_name(mut instances: Vec<Instance>) -> Vec<Instance> {
    instances.sort_by_key(name);
    instances
}
