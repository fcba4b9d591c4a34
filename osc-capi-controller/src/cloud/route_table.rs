use async_trait::async_trait;
use log::debug;
#[cfg(test)]
use mockall::automock;
use osc_capi_core::resources::defaults::{GATEWAY_TARGET_TYPE, NAT_TARGET_TYPE};
use serde::{Deserialize, Serialize};

use super::{
    client::OscClient, error::CloudError, tag::cluster_resource_tags, IgnoredResponse,
};

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct RouteTable {
    pub route_table_id: String,
    pub net_id: String,
    pub routes: Vec<Route>,
    pub link_route_tables: Vec<LinkRouteTable>,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct Route {
    pub destination_ip_range: String,
    pub gateway_id: Option<String>,
    pub nat_service_id: Option<String>,
    pub state: String,
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, rename_all = "PascalCase")]
pub struct LinkRouteTable {
    pub link_route_table_id: String,
    pub route_table_id: String,
    pub subnet_id: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait RouteTableService: Send + Sync {
    async fn create_route(
        &self,
        destination_ip_range: &str,
        route_table_id: &str,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<RouteTable, CloudError>;
    async fn create_route_table(
        &self,
        net_id: &str,
        cluster_name: &str,
        route_table_name: &str,
    ) -> Result<RouteTable, CloudError>;
    async fn delete_route(
        &self,
        destination_ip_range: &str,
        route_table_id: &str,
    ) -> Result<(), CloudError>;
    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), CloudError>;
    async fn get_route_table(
        &self,
        route_table_ids: Vec<String>,
    ) -> Result<Option<RouteTable>, CloudError>;
    /// Finds the route table holding a route to `resource_id` (an internet or nat service).
    ///
    /// Routes are matched on their target only: two routes of a table with the same target
    /// and different destinations can't be told apart, finding either one reports both as
    /// present.
    async fn get_route_table_from_route(
        &self,
        route_table_id: &str,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<Option<RouteTable>, CloudError>;
    async fn get_route_table_ids_from_net_ids(
        &self,
        net_id: &str,
    ) -> Result<Vec<String>, CloudError>;
    /// Returns the link id.
    async fn link_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String, CloudError>;
    async fn unlink_route_table(&self, link_route_table_id: &str) -> Result<(), CloudError>;
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRouteRequest<'a> {
    destination_ip_range: &'a str,
    route_table_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    nat_service_id: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RouteTableResponse {
    route_table: RouteTable,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateRouteTableRequest<'a> {
    net_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteRouteRequest<'a> {
    destination_ip_range: &'a str,
    route_table_id: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DeleteRouteTableRequest<'a> {
    route_table_id: &'a str,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct ReadRouteTablesRequest {
    filters: RouteTableFilters,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "PascalCase")]
struct RouteTableFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    route_table_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    net_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    route_gateway_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    route_nat_service_ids: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "PascalCase")]
struct ReadRouteTablesResponse {
    route_tables: Vec<RouteTable>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct LinkRouteTableRequest<'a> {
    route_table_id: &'a str,
    subnet_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LinkRouteTableResponse {
    link_route_table_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UnlinkRouteTableRequest<'a> {
    link_route_table_id: &'a str,
}

impl OscClient {
    async fn read_route_tables(
        &self,
        filters: RouteTableFilters,
    ) -> Result<Vec<RouteTable>, CloudError> {
        let response: ReadRouteTablesResponse = self
            .call("ReadRouteTables", &ReadRouteTablesRequest { filters })
            .await?;

        Ok(response.route_tables)
    }
}

fn route_target<'a>(
    resource_id: &'a str,
    resource_type: &str,
) -> Result<(Option<&'a str>, Option<&'a str>), CloudError> {
    match resource_type {
        GATEWAY_TARGET_TYPE => Ok((Some(resource_id), None)),
        NAT_TARGET_TYPE => Ok((None, Some(resource_id))),
        other => Err(CloudError::Other(format!("unknown route target type {other}"))),
    }
}

#[async_trait]
impl RouteTableService for OscClient {
    async fn create_route(
        &self,
        destination_ip_range: &str,
        route_table_id: &str,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<RouteTable, CloudError> {
        let (gateway_id, nat_service_id) = route_target(resource_id, resource_type)?;
        let response: RouteTableResponse = self
            .call(
                "CreateRoute",
                &CreateRouteRequest {
                    destination_ip_range,
                    route_table_id,
                    gateway_id,
                    nat_service_id,
                },
            )
            .await?;

        Ok(response.route_table)
    }

    async fn create_route_table(
        &self,
        net_id: &str,
        cluster_name: &str,
        route_table_name: &str,
    ) -> Result<RouteTable, CloudError> {
        let response: RouteTableResponse = self
            .call("CreateRouteTable", &CreateRouteTableRequest { net_id })
            .await?;
        let route_table = response.route_table;

        self.create_tags(
            &[&route_table.route_table_id],
            &cluster_resource_tags(cluster_name, route_table_name),
        )
        .await
        .map_err(CloudError::untagged(&route_table.route_table_id))?;

        Ok(route_table)
    }

    async fn delete_route(
        &self,
        destination_ip_range: &str,
        route_table_id: &str,
    ) -> Result<(), CloudError> {
        let result: Result<IgnoredResponse, _> = self
            .call(
                "DeleteRoute",
                &DeleteRouteRequest {
                    destination_ip_range,
                    route_table_id,
                },
            )
            .await;

        match result {
            Err(error) if error.is_not_found() => {
                debug!("Route to {destination_ip_range} in {route_table_id} is already gone");
                Ok(())
            }
            result => result.map(|_| ()),
        }
    }

    async fn delete_route_table(&self, route_table_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call("DeleteRouteTable", &DeleteRouteTableRequest { route_table_id })
            .await?;

        Ok(())
    }

    async fn get_route_table(
        &self,
        route_table_ids: Vec<String>,
    ) -> Result<Option<RouteTable>, CloudError> {
        let route_tables = self
            .read_route_tables(RouteTableFilters {
                route_table_ids,
                ..Default::default()
            })
            .await?;

        Ok(route_tables.into_iter().next())
    }

    async fn get_route_table_from_route(
        &self,
        route_table_id: &str,
        resource_id: &str,
        resource_type: &str,
    ) -> Result<Option<RouteTable>, CloudError> {
        let (gateway_id, nat_service_id) = route_target(resource_id, resource_type)?;
        let route_tables = self
            .read_route_tables(RouteTableFilters {
                route_table_ids: vec![route_table_id.to_owned()],
                route_gateway_ids: gateway_id.map(str::to_owned).into_iter().collect(),
                route_nat_service_ids: nat_service_id.map(str::to_owned).into_iter().collect(),
                ..Default::default()
            })
            .await?;

        Ok(route_tables.into_iter().next())
    }

    async fn get_route_table_ids_from_net_ids(
        &self,
        net_id: &str,
    ) -> Result<Vec<String>, CloudError> {
        let route_tables = self
            .read_route_tables(RouteTableFilters {
                net_ids: vec![net_id.to_owned()],
                ..Default::default()
            })
            .await?;

        Ok(route_tables
            .into_iter()
            .map(|route_table| route_table.route_table_id)
            .collect())
    }

    async fn link_route_table(
        &self,
        route_table_id: &str,
        subnet_id: &str,
    ) -> Result<String, CloudError> {
        let response: LinkRouteTableResponse = self
            .call(
                "LinkRouteTable",
                &LinkRouteTableRequest {
                    route_table_id,
                    subnet_id,
                },
            )
            .await?;

        Ok(response.link_route_table_id)
    }

    async fn unlink_route_table(&self, link_route_table_id: &str) -> Result<(), CloudError> {
        let _: IgnoredResponse = self
            .call(
                "UnlinkRouteTable",
                &UnlinkRouteTableRequest {
                    link_route_table_id,
                },
            )
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{route_target, RouteTableFilters};

    #[test]
    fn route_target_picks_the_matching_id_field() {
        assert_eq!(
            route_target("igw-1", "gateway").unwrap(),
            (Some("igw-1"), None)
        );
        assert_eq!(route_target("nat-1", "nat").unwrap(), (None, Some("nat-1")));
        assert!(route_target("vm-1", "vm").is_err());
    }

    #[test]
    fn empty_filters_are_not_serialized() {
        let filters = RouteTableFilters {
            net_ids: vec!["vpc-1".to_owned()],
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_string(&filters).unwrap(),
            r#"{"NetIds":["vpc-1"]}"#
        );
    }
}
