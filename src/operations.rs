//! Catalog of gateway operations.
//!
//! Each function returns an [`Operation`] carrying its route, verb, default
//! expected status and the error code tolerated after a transient retry.
//! Nothing here touches the network; [`crate::GatewayClient::execute`] turns
//! an operation into a request.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use crate::{
    resources::{
        codes, API_1_0, API_4_0, APPLICATIONS, APPLICATION_TYPES, GET_PARTITIONS, GET_REPLICAS,
        GET_SERVICES, NAMES, PARTITIONS, SERVICE_KIND_PARAMETER, SYSTEM_APPLICATION_NAME,
    },
    uri::{escape, fabric_name_to_id, QueryParams},
    wire, GatewayError, Result,
};

/// Where an operation is sent, relative to the chosen endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    /// Equivalent suffix templates, each already carrying `api-version`.
    /// One is picked uniformly per call.
    Flat(Vec<String>),
    /// `types[0]/ids[0]/types[1]/ids[1]...?api-version=...`
    Resource {
        types: Vec<String>,
        ids: Vec<String>,
        api_version: String,
    },
}

impl Target {
    pub fn flat(suffix: impl Into<String>) -> Self {
        Self::Flat(vec![suffix.into()])
    }

    pub fn routes<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Flat(alternatives.into_iter().map(Into::into).collect())
    }

    pub fn resource<T, I>(types: &[T], ids: &[I], api_version: &str) -> Self
    where
        T: AsRef<str>,
        I: AsRef<str>,
    {
        Self::Resource {
            types: types.iter().map(|t| t.as_ref().to_owned()).collect(),
            ids: ids.iter().map(|i| i.as_ref().to_owned()).collect(),
            api_version: api_version.to_owned(),
        }
    }
}

/// A gateway call before endpoint selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub method: Method,
    pub target: Target,
    /// Extra query parameters, appended in order after `api-version`.
    pub query: QueryParams,
    pub body: Option<Value>,
    pub expected_status: StatusCode,
    pub tolerated_on_retry: Option<&'static str>,
    /// Fixed endpoint index; `None` picks one at random.
    pub endpoint: Option<usize>,
}

impl Operation {
    pub fn new(method: Method, target: Target) -> Self {
        Self {
            method,
            target,
            query: Vec::new(),
            body: None,
            expected_status: StatusCode::OK,
            tolerated_on_retry: None,
            endpoint: None,
        }
    }

    pub fn get(target: Target) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: Target) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: Target) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: Target) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn expect_status(mut self, status: StatusCode) -> Self {
        self.expected_status = status;
        self
    }

    pub fn tolerate_on_retry(mut self, code: &'static str) -> Self {
        self.tolerated_on_retry = Some(code);
        self
    }

    pub fn on_endpoint(mut self, index: usize) -> Self {
        self.endpoint = Some(index);
        self
    }

    /// Adds a query parameter verbatim. Escape values with [`escape`] first
    /// when they may carry reserved characters.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    fn with_envelope<T: Serialize>(self, envelope: &T) -> Result<Self> {
        let body =
            serde_json::to_value(envelope).map_err(|err| GatewayError::Encode(err.to_string()))?;
        Ok(self.with_body(body))
    }
}

// Cluster

pub fn get_cluster_manifest() -> Operation {
    Operation::get(Target::flat("$/GetClusterManifest?api-version=3.0"))
}

pub fn get_cluster_health(api_version: &str) -> Operation {
    Operation::get(Target::flat(format!("$/GetClusterHealth?api-version={api_version}")))
}

pub fn get_fabric_upgrade_progress() -> Operation {
    Operation::get(Target::flat("$/GetUpgradeProgress?api-version=1.0"))
}

pub fn get_cluster_load_information() -> Operation {
    Operation::get(Target::flat("$/GetLoadInformation?api-version=3.0"))
}

pub fn recover_all_partitions() -> Operation {
    Operation::post(Target::flat("$/RecoverAllPartitions?api-version=3.0"))
}

pub fn recover_system_partitions() -> Operation {
    Operation::post(Target::flat("$/RecoverSystemPartitions?api-version=3.0"))
}

pub fn report_cluster_health(health_information: Value) -> Operation {
    Operation::post(Target::flat("$/ReportClusterHealth?api-version=3.0"))
        .with_body(health_information)
}

pub fn provision_fabric(
    code_file_path: &str,
    cluster_manifest_file_path: &str,
) -> Result<Operation> {
    Operation::post(Target::flat("$/Provision?api-version=1.0")).with_envelope(
        &wire::ProvisionFabric {
            code_file_path,
            cluster_manifest_file_path,
        },
    )
}

/// Starts a cluster upgrade. `description` is the full upgrade description document.
pub fn upgrade_fabric(description: Value) -> Operation {
    Operation::post(Target::flat("$/Upgrade?api-version=1.0")).with_body(description)
}

pub fn unprovision_fabric(code_version: &str, config_version: &str) -> Result<Operation> {
    Operation::post(Target::flat("$/Unprovision?api-version=1.0")).with_envelope(
        &wire::UnprovisionFabric {
            code_version,
            config_version,
        },
    )
}

// Nodes

pub fn get_nodes() -> Operation {
    Operation::get(Target::flat("Nodes?api-version=1.0"))
}

pub fn get_node_health(node: &str) -> Operation {
    Operation::get(Target::flat(format!("Nodes/{node}/$/GetHealth?api-version=3.0")))
}

pub fn get_node_load_information(node: &str) -> Operation {
    Operation::get(Target::flat(format!("Nodes/{node}/$/GetLoadInformation?api-version=3.0")))
}

pub fn activate_node(node: &str) -> Operation {
    Operation::post(Target::flat(format!("Nodes/{node}/$/Activate?api-version=1.0")))
}

pub fn deactivate_node(node: &str, intent: &str) -> Result<Operation> {
    Operation::post(Target::flat(format!("Nodes/{node}/$/Deactivate?api-version=1.0")))
        .with_envelope(&wire::DeactivateNode {
            deactivation_intent: intent,
        })
}

pub fn restart_node(node: &str, instance_id: i64) -> Result<Operation> {
    Operation::post(Target::flat(format!("Nodes/{node}/$/Restart?api-version=1.0")))
        .with_envelope(&wire::NodeControl {
            node_instance_id: instance_id.to_string(),
        })
}

pub fn report_node_health(node: &str, health_information: Value) -> Operation {
    Operation::post(Target::flat(format!("Nodes/{node}/$/ReportHealth?api-version=3.0")))
        .with_body(health_information)
}

pub fn report_deployed_application_health(
    node: &str,
    application: &str,
    health_information: Value,
) -> Result<Operation> {
    let app = fabric_name_to_id(application)?;
    Ok(Operation::post(Target::flat(format!(
        "Nodes/{node}/$/GetApplications/{app}/$/ReportHealth?api-version=3.0"
    )))
    .with_body(health_information))
}

pub fn report_deployed_service_package_health(
    node: &str,
    application: &str,
    service_manifest: &str,
    health_information: Value,
) -> Result<Operation> {
    let app = fabric_name_to_id(application)?;
    Ok(Operation::post(Target::flat(format!(
        "Nodes/{node}/$/GetApplications/{app}/$/GetServicePackages/{service_manifest}\
         /$/ReportHealth?api-version=3.0"
    )))
    .with_body(health_information))
}

// Application types

pub fn get_application_types() -> Operation {
    Operation::get(Target::resource(&[APPLICATION_TYPES], &[] as &[&str], API_1_0))
}

pub fn provision_application_type(build_path: &str) -> Result<Operation> {
    Operation::post(Target::flat("ApplicationTypes/$/Provision?api-version=1.0"))
        .tolerate_on_retry(codes::APPLICATION_TYPE_ALREADY_EXISTS)
        .with_envelope(&wire::ProvisionApplicationType {
            application_type_build_path: build_path,
        })
}

pub fn unprovision_application_type(type_name: &str, type_version: &str) -> Result<Operation> {
    Operation::post(Target::flat(format!(
        "ApplicationTypes/{type_name}/$/Unprovision?api-version=1.0"
    )))
    .tolerate_on_retry(codes::APPLICATION_TYPE_NOT_FOUND)
    .with_envelope(&wire::UnprovisionApplicationType {
        application_type_version: type_version,
    })
}

// Applications

/// One page of applications. Paging needs api-version 2.0 or later.
pub fn get_applications(api_version: &str) -> Operation {
    Operation::get(Target::resource(&[APPLICATIONS], &[] as &[&str], api_version))
}

pub fn create_application(
    name: &str,
    type_name: &str,
    type_version: &str,
    parameters: &[(&str, &str)],
) -> Result<Operation> {
    Operation::post(Target::flat("Applications/$/Create?api-version=1.0"))
        .expect_status(StatusCode::CREATED)
        .tolerate_on_retry(codes::APPLICATION_ALREADY_EXISTS)
        .with_envelope(&wire::CreateApplication {
            name,
            type_name,
            type_version,
            parameter_list: parameters
                .iter()
                .map(|&(key, value)| wire::ApplicationParameter { key, value })
                .collect(),
        })
}

pub fn delete_application(name: &str) -> Result<Operation> {
    let app = fabric_name_to_id(name)?;
    Ok(
        Operation::post(Target::flat(format!("Applications/{app}/$/Delete?api-version=1.0")))
            .tolerate_on_retry(codes::APPLICATION_NOT_FOUND),
    )
}

/// `description` is the upgrade description document; its `Name` selects the application.
pub fn upgrade_application(name: &str, description: Value) -> Result<Operation> {
    let app = fabric_name_to_id(name)?;
    Ok(
        Operation::post(Target::flat(format!("Applications/{app}/$/Upgrade?api-version=1.0")))
            .tolerate_on_retry(codes::APPLICATION_ALREADY_IN_TARGET_VERSION)
            .with_body(description),
    )
}

pub fn update_application_upgrade(name: &str, description: Value) -> Result<Operation> {
    let app = fabric_name_to_id(name)?;
    Ok(Operation::post(Target::flat(format!(
        "Applications/{app}/$/UpdateUpgrade?api-version=1.0"
    )))
    .tolerate_on_retry(codes::APPLICATION_UPGRADE_IN_PROGRESS)
    .with_body(description))
}

pub fn get_application_upgrade_progress(name: &str) -> Result<Operation> {
    let app = fabric_name_to_id(name)?;
    Ok(Operation::get(Target::flat(format!(
        "Applications/{app}/$/GetUpgradeProgress?api-version=1.0"
    ))))
}

pub fn get_application_health(name: &str) -> Result<Operation> {
    let app = fabric_name_to_id(name)?;
    Ok(Operation::get(Target::flat(format!(
        "Applications/{app}/$/GetHealth?api-version=1.0"
    ))))
}

pub fn report_application_health(name: &str, health_information: Value) -> Result<Operation> {
    let app = fabric_name_to_id(name)?;
    Ok(Operation::post(Target::flat(format!(
        "Applications/{app}/$/ReportHealth?api-version=3.0"
    )))
    .with_body(health_information))
}

// Services

pub fn get_services(application: &str, api_version: &str) -> Result<Operation> {
    let app = fabric_name_to_id(application)?;
    Ok(Operation::get(Target::resource(
        &[APPLICATIONS, GET_SERVICES],
        &[app],
        api_version,
    )))
}

pub fn get_system_services() -> Result<Operation> {
    get_services(SYSTEM_APPLICATION_NAME, API_1_0)
}

/// `description` is the service description document.
pub fn create_service(application: &str, description: Value) -> Result<Operation> {
    let app = fabric_name_to_id(application)?;
    Ok(Operation::post(Target::flat(format!(
        "Applications/{app}/$/GetServices/$/Create?api-version=1.0"
    )))
    .expect_status(StatusCode::ACCEPTED)
    .tolerate_on_retry(codes::SERVICE_ALREADY_EXISTS)
    .with_body(description))
}

pub fn delete_service(application: &str, service: &str) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::post(Target::routes([
        format!("Applications/{app}/$/GetServices/{svc}/$/Delete?api-version=1.0"),
        format!("Services/{svc}/$/Delete?api-version=1.0"),
    ]))
    .tolerate_on_retry(codes::SERVICE_DOES_NOT_EXIST))
}

pub fn get_service_description(application: &str, service: &str) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::get(Target::routes([
        format!("Applications/{app}/$/GetServices/{svc}/$/GetDescription?api-version=1.0"),
        format!("Services/{svc}/$/GetDescription?api-version=1.0"),
    ])))
}

/// Scales a stateless service to `instance_count` instances.
pub fn update_service(application: &str, service: &str, instance_count: i32) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Operation::post(Target::routes([
        format!("Applications/{app}/$/GetServices/{svc}/$/Update?api-version=1.0"),
        format!("Services/{svc}/$/Update?api-version=1.0"),
    ]))
    .with_envelope(&wire::UpdateServiceDescription {
        service_kind: wire::ServiceKind::Stateless.code(),
        flags: 1,
        instance_count,
    })
}

pub fn report_service_health(
    application: &str,
    service: &str,
    health_information: Value,
) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::post(Target::routes([
        format!("Applications/{app}/$/GetServices/{svc}/$/ReportHealth?api-version=3.0"),
        format!("Services/{svc}/$/ReportHealth?api-version=3.0"),
    ]))
    .with_body(health_information))
}

// Partitions and replicas

pub fn get_partitions(application: &str, service: &str) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::get(Target::routes([
        format!("Applications/{app}/$/GetServices/{svc}/$/GetPartitions?api-version=1.0"),
        format!("Services/{svc}/$/GetPartitions?api-version=1.0"),
    ])))
}

pub fn get_partition(partition_id: &str) -> Operation {
    Operation::get(Target::resource(&[PARTITIONS], &[partition_id], API_1_0))
}

pub fn get_replicas(application: &str, service: &str, partition_id: &str) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::get(Target::routes([
        format!(
            "Applications/{app}/$/GetServices/{svc}/$/GetPartitions/{partition_id}\
             /$/GetReplicas?api-version=1.0"
        ),
        format!("Services/{svc}/$/GetPartitions/{partition_id}/$/GetReplicas?api-version=1.0"),
        format!("Partitions/{partition_id}/$/GetReplicas?api-version=1.0"),
    ])))
}

pub fn get_system_service_replicas(service: &str, partition_id: &str) -> Result<Operation> {
    get_replicas(SYSTEM_APPLICATION_NAME, service, partition_id)
}

pub fn get_replica_health(
    application: &str,
    service: &str,
    partition_id: &str,
    replica_id: &str,
) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::get(Target::routes([
        format!(
            "Applications/{app}/$/GetServices/{svc}/$/GetPartitions/{partition_id}\
             /$/GetReplicas/{replica_id}/$/GetHealth?api-version=1.0"
        ),
        format!(
            "Services/{svc}/$/GetPartitions/{partition_id}/$/GetReplicas/{replica_id}\
             /$/GetHealth?api-version=1.0"
        ),
        format!("Partitions/{partition_id}/$/GetReplicas/{replica_id}/$/GetHealth?api-version=1.0"),
    ])))
}

pub fn recover_partition(
    application: &str,
    service: &str,
    partition_id: &str,
) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::post(Target::routes([
        format!(
            "Applications/{app}/$/GetServices/{svc}/$/GetPartitions/{partition_id}\
             /$/Recover?api-version=1.0"
        ),
        format!("Services/{svc}/$/GetPartitions/{partition_id}/$/Recover?api-version=1.0"),
        format!("Partitions/{partition_id}/$/Recover?api-version=1.0"),
    ])))
}

pub fn report_partition_health(
    application: &str,
    service: &str,
    partition_id: &str,
    health_information: Value,
) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::post(Target::routes([
        format!(
            "Applications/{app}/$/GetServices/{svc}/$/GetPartitions/{partition_id}\
             /$/ReportHealth?api-version=3.0"
        ),
        format!("Services/{svc}/$/GetPartitions/{partition_id}/$/ReportHealth?api-version=3.0"),
        format!("Partitions/{partition_id}/$/ReportHealth?api-version=3.0"),
    ]))
    .with_body(health_information))
}

/// Reports health for one replica. Stateful replicas are addressed by replica
/// id, stateless ones by instance id; `kind` is sent as `ServiceKind`.
pub fn report_replica_health(
    application: &str,
    service: &str,
    partition_id: &str,
    replica_or_instance_id: &str,
    kind: wire::ServiceKind,
    health_information: Value,
) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    let replica = format!("{partition_id}/$/GetReplicas/{replica_or_instance_id}/$/ReportHealth");
    Ok(Operation::post(Target::routes([
        format!("Applications/{app}/$/GetServices/{svc}/$/GetPartitions/{replica}?api-version=4.0"),
        format!("Services/{svc}/$/GetPartitions/{replica}?api-version=4.0"),
        format!("Partitions/{replica}?api-version=4.0"),
    ]))
    .with_query(SERVICE_KIND_PARAMETER, kind.code().to_string())
    .with_body(health_information))
}

/// Replica list of a partition addressed through its parent resources.
pub fn get_replicas_by_resource(
    application: &str,
    service: &str,
    partition_id: &str,
) -> Result<Operation> {
    let (app, svc) = (fabric_name_to_id(application)?, fabric_name_to_id(service)?);
    Ok(Operation::get(Target::resource(
        &[APPLICATIONS, GET_SERVICES, GET_PARTITIONS, GET_REPLICAS],
        &[app.as_str(), svc.as_str(), partition_id],
        API_1_0,
    )))
}

// Names and properties

pub fn create_name(name: &str) -> Result<Operation> {
    Operation::post(Target::flat("Names/$/Create?api-version=4.0"))
        .tolerate_on_retry(codes::NAME_ALREADY_EXISTS)
        .with_envelope(&wire::NameDescription { name })
}

pub fn name_exists(name: &str) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    Ok(Operation::get(Target::resource(&[NAMES], &[id], API_4_0)))
}

pub fn delete_name(name: &str) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    Ok(Operation::delete(Target::resource(&[NAMES], &[id], API_4_0))
        .tolerate_on_retry(codes::NAME_DOES_NOT_EXIST))
}

/// One page of sub-names.
pub fn get_sub_names(name: &str, recursive: bool) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    let operation = Operation::get(Target::resource(&[NAMES, "$/GetSubNames"], &[id], API_4_0));
    Ok(if recursive {
        operation.with_query("Recursive", "true")
    } else {
        operation
    })
}

pub fn get_property(name: &str, property: &str) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    Ok(Operation::get(Target::flat(format!("Names/{id}/$/GetProperty?api-version=4.0")))
        .with_query("PropertyName", escape(property)))
}

/// One page of properties, with values when `include_values` is set.
pub fn get_properties(name: &str, include_values: bool) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    let operation = Operation::get(Target::resource(&[NAMES, "$/GetProperties"], &[id], API_4_0));
    Ok(if include_values {
        operation.with_query("IncludeValues", "true")
    } else {
        operation
    })
}

pub fn put_property(name: &str, property: Value) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    Ok(Operation::put(Target::flat(format!("Names/{id}/$/GetProperty?api-version=4.0")))
        .with_body(property))
}

pub fn delete_property(name: &str, property: &str) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    Ok(Operation::delete(Target::flat(format!("Names/{id}/$/GetProperty?api-version=4.0")))
        .with_query("PropertyName", escape(property))
        .tolerate_on_retry(codes::PROPERTY_DOES_NOT_EXIST))
}

pub fn submit_property_batch(name: &str, batch: Value) -> Result<Operation> {
    let id = fabric_name_to_id(name)?;
    Ok(Operation::post(Target::flat(format!(
        "Names/{id}/$/GetProperties/$/SubmitBatch?api-version=4.0"
    )))
    .with_body(batch))
}

// Repair tasks

pub fn create_repair_task(task: Value) -> Operation {
    Operation::post(Target::flat("$/CreateRepairTask?api-version=3.0")).with_body(task)
}

pub fn cancel_repair_task(task_id: &str, version: i64, request_abort: bool) -> Result<Operation> {
    Operation::post(Target::flat("$/CancelRepairTask?api-version=3.0")).with_envelope(
        &wire::RepairTaskRef {
            task_id,
            version: version.to_string(),
            request_abort: Some(request_abort),
        },
    )
}

pub fn force_approve_repair_task(task_id: &str, version: i64) -> Result<Operation> {
    repair_task_update("$/ForceApproveRepairTask?api-version=3.0", task_id, version)
}

pub fn delete_repair_task(task_id: &str, version: i64) -> Result<Operation> {
    repair_task_update("$/DeleteRepairTask?api-version=3.0", task_id, version)
}

fn repair_task_update(suffix: &str, task_id: &str, version: i64) -> Result<Operation> {
    Operation::post(Target::flat(suffix)).with_envelope(&wire::RepairTaskRef {
        task_id,
        version: version.to_string(),
        request_abort: None,
    })
}

/// Filters are escaped; `state_filter` is the numeric state mask.
pub fn get_repair_task_list(
    task_id_filter: Option<&str>,
    state_filter: Option<u32>,
    executor_filter: Option<&str>,
) -> Operation {
    let mut operation = Operation::get(Target::flat("$/GetRepairTaskList?api-version=1.0"));
    if let Some(filter) = task_id_filter {
        operation = operation.with_query("TaskIdFilter", escape(filter));
    }
    if let Some(state) = state_filter {
        operation = operation.with_query("StateFilter", state.to_string());
    }
    if let Some(filter) = executor_filter {
        operation = operation.with_query("ExecutorFilter", escape(filter));
    }
    operation
}

// Infrastructure

pub fn invoke_infrastructure_command(service_name: &str, command: &str) -> Result<Operation> {
    infrastructure(
        Method::POST,
        "$/InvokeInfrastructureCommand?api-version=3.0",
        service_name,
        command,
    )
}

pub fn invoke_infrastructure_query(service_name: &str, command: &str) -> Result<Operation> {
    infrastructure(
        Method::GET,
        "$/InvokeInfrastructureQuery?api-version=3.0",
        service_name,
        command,
    )
}

fn infrastructure(
    method: Method,
    suffix: &str,
    service_name: &str,
    command: &str,
) -> Result<Operation> {
    let service_id = fabric_name_to_id(service_name)?;
    Ok(Operation::new(method, Target::flat(suffix))
        .with_query("Command", escape(command))
        .with_query("ServiceId", escape(&service_id)))
}
