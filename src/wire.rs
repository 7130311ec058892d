use serde::{Deserialize, Serialize};

/// Error body returned by the gateway alongside a failing status.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorEnvelope {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorDetail {
    pub code: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// One page of a paged query.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct PagedList<T> {
    #[serde(default)]
    pub continuation_token: Option<String>,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionApplicationType<'a> {
    pub application_type_build_path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnprovisionApplicationType<'a> {
    pub application_type_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameDescription<'a> {
    pub name: &'a str,
}

/// Reference to a repair task at a given version.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepairTaskRef<'a> {
    pub task_id: &'a str,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_abort: Option<bool>,
}

/// Version stamp returned by repair task mutations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RepairTaskVersion {
    pub version: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateApplication<'a> {
    pub name: &'a str,
    pub type_name: &'a str,
    pub type_version: &'a str,
    pub parameter_list: Vec<ApplicationParameter<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicationParameter<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeactivateNode<'a> {
    pub deactivation_intent: &'a str,
}

/// Instance guard for node restart/stop.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeControl {
    pub node_instance_id: String,
}

/// Numeric service kind, as sent in bodies and the `ServiceKind` query parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceKind {
    Stateless = 1,
    Stateful = 2,
}

impl ServiceKind {
    pub fn code(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateServiceDescription {
    pub service_kind: u8,
    /// Bit set naming the fields present. `1` is the instance count.
    pub flags: u32,
    pub instance_count: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisionFabric<'a> {
    pub code_file_path: &'a str,
    pub cluster_manifest_file_path: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UnprovisionFabric<'a> {
    pub code_version: &'a str,
    pub config_version: &'a str,
}
