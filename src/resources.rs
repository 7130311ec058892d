//! Resource segment names, api versions and gateway error codes.

pub const API_VERSION_PARAMETER: &str = "api-version";
pub const CONTINUATION_TOKEN_PARAMETER: &str = "ContinuationToken";
pub const SERVICE_KIND_PARAMETER: &str = "ServiceKind";

pub const API_1_0: &str = "1.0";
pub const API_2_0: &str = "2.0";
pub const API_3_0: &str = "3.0";
pub const API_4_0: &str = "4.0";
pub const API_6_0: &str = "6.0";

pub const APPLICATIONS: &str = "Applications";
pub const APPLICATION_TYPES: &str = "ApplicationTypes";
pub const NODES: &str = "Nodes";
pub const SERVICES: &str = "Services";
pub const PARTITIONS: &str = "Partitions";
pub const NAMES: &str = "Names";
pub const GET_SERVICES: &str = "$/GetServices";
pub const GET_PARTITIONS: &str = "$/GetPartitions";
pub const GET_REPLICAS: &str = "$/GetReplicas";
pub const GET_HEALTH: &str = "$/GetHealth";
pub const REPORT_HEALTH: &str = "$/ReportHealth";

pub const SYSTEM_APPLICATION_NAME: &str = "fabric:/System";

/// Error codes the gateway returns in place of a reason phrase. Several are
/// tolerated when they show up on a retried mutation.
pub mod codes {
    pub const APPLICATION_TYPE_ALREADY_EXISTS: &str = "FABRIC_E_APPLICATION_TYPE_ALREADY_EXISTS";
    pub const APPLICATION_TYPE_NOT_FOUND: &str = "FABRIC_E_APPLICATION_TYPE_NOT_FOUND";
    pub const APPLICATION_ALREADY_EXISTS: &str = "FABRIC_E_APPLICATION_ALREADY_EXISTS";
    pub const APPLICATION_NOT_FOUND: &str = "FABRIC_E_APPLICATION_NOT_FOUND";
    pub const APPLICATION_ALREADY_IN_TARGET_VERSION: &str =
        "FABRIC_E_APPLICATION_ALREADY_IN_TARGET_VERSION";
    pub const APPLICATION_UPGRADE_IN_PROGRESS: &str = "FABRIC_E_APPLICATION_UPGRADE_IN_PROGRESS";
    pub const SERVICE_ALREADY_EXISTS: &str = "FABRIC_E_SERVICE_ALREADY_EXISTS";
    pub const SERVICE_DOES_NOT_EXIST: &str = "FABRIC_E_SERVICE_DOES_NOT_EXIST";
    pub const NAME_ALREADY_EXISTS: &str = "FABRIC_E_NAME_ALREADY_EXISTS";
    pub const NAME_DOES_NOT_EXIST: &str = "FABRIC_E_NAME_DOES_NOT_EXIST";
    pub const PROPERTY_DOES_NOT_EXIST: &str = "FABRIC_E_PROPERTY_DOES_NOT_EXIST";
}
