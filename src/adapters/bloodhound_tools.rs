//! The BloodHound tool set.
//!
//! Most tools are a single GET against an entity endpoint and are described
//! by the [`ENDPOINTS`] table. Search, graph, raw query and saved-query tools
//! have their own argument handling in [`SpecialTool`].

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::adapters::catalog::{CatalogError, ToolArgs, ToolCatalog, ToolDescriptor};
use crate::bloodhound::{ApiError, ApiErrorKind, BloodhoundClient, QueryParams};
use crate::domain::{ParamSpec, ParamType, ToolClass, ToolHandler};

const DEFAULT_LIMIT: u64 = 100;

/// The ID parameter an entity endpoint is addressed by
#[derive(Debug, Clone, Copy)]
struct IdParam {
    name: &'static str,
    description: &'static str,
}

const DOMAIN_ID: IdParam = IdParam {
    name: "domain_id",
    description: "Object ID of the domain (see get_domains)",
};
const USER_ID: IdParam = IdParam {
    name: "user_id",
    description: "Object ID (SID) of the user",
};
const GROUP_ID: IdParam = IdParam {
    name: "group_id",
    description: "Object ID (SID) of the group",
};
const COMPUTER_ID: IdParam = IdParam {
    name: "computer_id",
    description: "Object ID (SID) of the computer",
};
const OU_ID: IdParam = IdParam {
    name: "ou_id",
    description: "Object ID (GUID) of the organizational unit",
};
const GPO_ID: IdParam = IdParam {
    name: "gpo_id",
    description: "Object ID (GUID) of the group policy object",
};
const TEMPLATE_ID: IdParam = IdParam {
    name: "template_id",
    description: "Object ID of the certificate template",
};
const CA_ID: IdParam = IdParam {
    name: "ca_id",
    description: "Object ID of the certificate authority",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// One entity under `data`
    Object { counts: bool },
    /// A skip/limit listing
    Listing,
}

/// A tool backed by one entity endpoint
#[derive(Debug)]
struct EndpointSpec {
    name: &'static str,
    /// Path with `{id}` where the entity ID goes
    path: &'static str,
    id: IdParam,
    /// Plural noun used in result messages
    noun: &'static str,
    shape: Shape,
    description: &'static str,
}

impl EndpointSpec {
    /// Key the data is returned under, e.g. `user_sessions`
    fn result_key(&self) -> &'static str {
        self.name.strip_prefix("get_").unwrap_or(self.name)
    }
}

const fn listing(
    name: &'static str,
    path: &'static str,
    id: IdParam,
    noun: &'static str,
    description: &'static str,
) -> EndpointSpec {
    EndpointSpec {
        name,
        path,
        id,
        noun,
        shape: Shape::Listing,
        description,
    }
}

const fn object(
    name: &'static str,
    path: &'static str,
    id: IdParam,
    noun: &'static str,
    counts: bool,
    description: &'static str,
) -> EndpointSpec {
    EndpointSpec {
        name,
        path,
        id,
        noun,
        shape: Shape::Object { counts },
        description,
    }
}

static ENDPOINTS: &[EndpointSpec] = &[
    // domains
    listing("get_users", "/api/v2/domains/{id}/users", DOMAIN_ID, "users",
        "List users in a domain."),
    listing("get_groups", "/api/v2/domains/{id}/groups", DOMAIN_ID, "groups",
        "List groups in a domain."),
    listing("get_computers", "/api/v2/domains/{id}/computers", DOMAIN_ID, "computers",
        "List computers in a domain."),
    listing("get_security_controllers", "/api/v2/domains/{id}/controllers", DOMAIN_ID, "security controllers",
        "List principals with control rights over the domain object itself."),
    listing("get_gpos", "/api/v2/domains/{id}/gpos", DOMAIN_ID, "GPOs",
        "List group policy objects in a domain."),
    listing("get_ous", "/api/v2/domains/{id}/ous", DOMAIN_ID, "OUs",
        "List organizational units in a domain."),
    listing("get_dc_syncers", "/api/v2/domains/{id}/dc-syncers", DOMAIN_ID, "DCSync principals",
        "List principals that can perform DCSync against the domain and so extract every credential hash."),
    listing("get_foreign_admins", "/api/v2/domains/{id}/foreign-admins", DOMAIN_ID, "foreign admins",
        "List principals from other domains with local admin rights in this domain."),
    listing("get_foreign_gpo_controllers", "/api/v2/domains/{id}/foreign-gpo-controllers", DOMAIN_ID, "foreign GPO controllers",
        "List principals from other domains that control GPOs in this domain."),
    listing("get_foreign_groups", "/api/v2/domains/{id}/foreign-groups", DOMAIN_ID, "foreign groups",
        "List groups from other domains that are members of groups in this domain."),
    listing("get_foreign_users", "/api/v2/domains/{id}/foreign-users", DOMAIN_ID, "foreign users",
        "List users from other domains that are members of groups in this domain."),
    listing("get_inbound_trusts", "/api/v2/domains/{id}/inbound-trusts", DOMAIN_ID, "inbound trusts",
        "List domains that trust this domain."),
    listing("get_linked_gpos", "/api/v2/domains/{id}/linked-gpos", DOMAIN_ID, "linked GPOs",
        "List GPOs linked directly to the domain object."),
    listing("get_outbound_trusts", "/api/v2/domains/{id}/outbound-trusts", DOMAIN_ID, "outbound trusts",
        "List domains this domain trusts."),
    // users
    object("get_user_info", "/api/v2/users/{id}", USER_ID, "user information", true,
        "Get properties and relationship counts for a user."),
    listing("get_user_admin_rights", "/api/v2/users/{id}/admin-rights", USER_ID, "admin rights",
        "List computers where the user has local administrator rights."),
    listing("get_user_constrained_delegation_rights", "/api/v2/users/{id}/constrained-delegation-rights", USER_ID, "constrained delegation rights",
        "List computers the user can impersonate other users to through constrained delegation."),
    listing("get_user_controllables", "/api/v2/users/{id}/controllables", USER_ID, "controllable objects",
        "List principals the user has control rights over."),
    listing("get_user_controllers", "/api/v2/users/{id}/controllers", USER_ID, "controllers",
        "List principals that have control rights over the user."),
    listing("get_user_dcom_rights", "/api/v2/users/{id}/dcom-rights", USER_ID, "DCOM rights",
        "List computers where the user can execute DCOM."),
    listing("get_user_memberships", "/api/v2/users/{id}/memberships", USER_ID, "group memberships",
        "List groups the user belongs to."),
    listing("get_user_ps_remote_rights", "/api/v2/users/{id}/ps-remote-rights", USER_ID, "PowerShell remoting rights",
        "List computers the user can reach with PowerShell remoting."),
    listing("get_user_rdp_rights", "/api/v2/users/{id}/rdp-rights", USER_ID, "RDP rights",
        "List computers the user can log on to over RDP."),
    listing("get_user_sessions", "/api/v2/users/{id}/sessions", USER_ID, "sessions",
        "List computers where the user has an active session."),
    listing("get_user_sql_admin_rights", "/api/v2/users/{id}/sql-admin-rights", USER_ID, "SQL admin rights",
        "List computers where the user is a SQL Server administrator."),
    // groups
    object("get_group_info", "/api/v2/groups/{id}", GROUP_ID, "group information", true,
        "Get properties and relationship counts for a group."),
    listing("get_group_admin_rights", "/api/v2/groups/{id}/admin-rights", GROUP_ID, "admin rights",
        "List computers where the group has local administrator rights."),
    listing("get_group_controllables", "/api/v2/groups/{id}/controllables", GROUP_ID, "controllable objects",
        "List principals the group has control rights over."),
    listing("get_group_controllers", "/api/v2/groups/{id}/controllers", GROUP_ID, "controllers",
        "List principals that have control rights over the group."),
    listing("get_group_dcom_rights", "/api/v2/groups/{id}/dcom-rights", GROUP_ID, "DCOM rights",
        "List computers where the group can execute DCOM."),
    listing("get_group_members", "/api/v2/groups/{id}/members", GROUP_ID, "members",
        "List users and groups that are members of the group."),
    listing("get_group_memberships", "/api/v2/groups/{id}/memberships", GROUP_ID, "group memberships",
        "List groups this group belongs to."),
    listing("get_group_ps_remote_rights", "/api/v2/groups/{id}/ps-remote-rights", GROUP_ID, "PowerShell remoting rights",
        "List computers the group can reach with PowerShell remoting."),
    listing("get_group_rdp_rights", "/api/v2/groups/{id}/rdp-rights", GROUP_ID, "RDP rights",
        "List computers the group can log on to over RDP."),
    listing("get_group_sessions", "/api/v2/groups/{id}/sessions", GROUP_ID, "sessions",
        "List active sessions of the group's members."),
    // computers
    object("get_computer_info", "/api/v2/computers/{id}", COMPUTER_ID, "computer information", true,
        "Get properties and relationship counts for a computer."),
    listing("get_computer_admin_rights", "/api/v2/computers/{id}/admin-rights", COMPUTER_ID, "admin rights",
        "List computers where this computer account has local administrator rights."),
    listing("get_computer_admin_users", "/api/v2/computers/{id}/admin-users", COMPUTER_ID, "admin users",
        "List principals with local administrator rights on the computer."),
    listing("get_computer_constrained_delegation_rights", "/api/v2/computers/{id}/constrained-delegation-rights", COMPUTER_ID, "constrained delegation rights",
        "List computers this computer can delegate to through constrained delegation."),
    listing("get_computer_constrained_users", "/api/v2/computers/{id}/constrained-users", COMPUTER_ID, "constrained delegation principals",
        "List principals allowed to delegate to the computer."),
    listing("get_computer_controllables", "/api/v2/computers/{id}/controllables", COMPUTER_ID, "controllable objects",
        "List principals the computer has control rights over."),
    listing("get_computer_controllers", "/api/v2/computers/{id}/controllers", COMPUTER_ID, "controllers",
        "List principals that have control rights over the computer."),
    listing("get_computer_dcom_rights", "/api/v2/computers/{id}/dcom-rights", COMPUTER_ID, "DCOM rights",
        "List computers where this computer can execute DCOM."),
    listing("get_computer_dcom_users", "/api/v2/computers/{id}/dcom-users", COMPUTER_ID, "DCOM users",
        "List principals that can execute DCOM on the computer."),
    listing("get_computer_memberships", "/api/v2/computers/{id}/group-membership", COMPUTER_ID, "group memberships",
        "List groups the computer belongs to."),
    listing("get_computer_ps_remote_rights", "/api/v2/computers/{id}/ps-remote-rights", COMPUTER_ID, "PowerShell remoting rights",
        "List computers this computer can reach with PowerShell remoting."),
    listing("get_computer_ps_remote_users", "/api/v2/computers/{id}/ps-remote-users", COMPUTER_ID, "PowerShell remoting users",
        "List principals that can reach the computer with PowerShell remoting."),
    listing("get_computer_rdp_rights", "/api/v2/computers/{id}/rdp-rights", COMPUTER_ID, "RDP rights",
        "List computers this computer can log on to over RDP."),
    listing("get_computer_rdp_users", "/api/v2/computers/{id}/rdp-users", COMPUTER_ID, "RDP users",
        "List principals that can log on to the computer over RDP."),
    listing("get_computer_sessions", "/api/v2/computers/{id}/sessions", COMPUTER_ID, "sessions",
        "List users with an active session on the computer."),
    listing("get_computer_sql_admins", "/api/v2/computers/{id}/sql-admins", COMPUTER_ID, "SQL admins",
        "List principals that are SQL Server administrators on the computer."),
    // organizational units
    object("get_ou_info", "/api/v2/ous/{id}", OU_ID, "OU information", true,
        "Get properties and contents counts for an organizational unit."),
    listing("get_ou_computers", "/api/v2/ous/{id}/computers", OU_ID, "computers",
        "List computers contained in the OU."),
    listing("get_ou_gpos", "/api/v2/ous/{id}/gpos", OU_ID, "GPOs",
        "List GPOs that apply to the OU."),
    listing("get_ou_groups", "/api/v2/ous/{id}/groups", OU_ID, "groups",
        "List groups contained in the OU."),
    listing("get_ou_users", "/api/v2/ous/{id}/users", OU_ID, "users",
        "List users contained in the OU."),
    // group policy objects
    object("get_gpo_info", "/api/v2/gpos/{id}", GPO_ID, "GPO information", true,
        "Get properties and affected-object counts for a GPO."),
    listing("get_gpo_computers", "/api/v2/gpos/{id}/computers", GPO_ID, "computers",
        "List computers the GPO applies to."),
    listing("get_gpo_controllers", "/api/v2/gpos/{id}/controllers", GPO_ID, "controllers",
        "List principals that can modify the GPO."),
    listing("get_gpo_ous", "/api/v2/gpos/{id}/ous", GPO_ID, "OUs",
        "List OUs the GPO is linked to."),
    listing("get_gpo_tier_zeros", "/api/v2/gpos/{id}/tier-zeros", GPO_ID, "tier zero objects",
        "List tier zero (highest privilege) objects the GPO applies to."),
    listing("get_gpo_users", "/api/v2/gpos/{id}/users", GPO_ID, "users",
        "List users the GPO applies to."),
    // certificate services
    object("get_cert_template_info", "/api/v2/certtemplates/{id}", TEMPLATE_ID, "certificate template information", false,
        "Get properties of a certificate template, including enrollment flags relevant to ESC abuse."),
    listing("get_cert_template_controllers", "/api/v2/certtemplates/{id}/controllers", TEMPLATE_ID, "controllers",
        "List principals that can modify the certificate template."),
    object("get_root_ca_info", "/api/v2/rootcas/{id}", CA_ID, "root CA information", false,
        "Get properties of a root certificate authority."),
    listing("get_root_ca_controllers", "/api/v2/rootcas/{id}/controllers", CA_ID, "controllers",
        "List principals that control the root CA."),
    object("get_enterprise_ca_info", "/api/v2/enterprisecas/{id}", CA_ID, "enterprise CA information", false,
        "Get properties of an enterprise certificate authority."),
    listing("get_enterprise_ca_controllers", "/api/v2/enterprisecas/{id}/controllers", CA_ID, "controllers",
        "List principals that control the enterprise CA."),
    listing("get_aia_ca_controllers", "/api/v2/aia-cas/{id}/controllers", CA_ID, "controllers",
        "List principals that control the AIA certificate authority."),
];

fn paging_params() -> [ParamSpec; 2] {
    [
        ParamSpec::optional("limit", ParamType::Integer, "Maximum number of results to return")
            .with_default(json!(DEFAULT_LIMIT))
            .at_least(1),
        ParamSpec::optional("skip", ParamType::Integer, "Number of results to skip, for paging")
            .with_default(json!(0))
            .at_least(0),
    ]
}

/// Handler for a row of [`ENDPOINTS`]
struct EndpointHandler {
    client: Arc<BloodhoundClient>,
    spec: &'static EndpointSpec,
}

#[async_trait]
impl ToolHandler for EndpointHandler {
    async fn call(&self, args: &Map<String, Value>) -> Result<Value, ApiError> {
        let args = ToolArgs(args);
        let id = args.str(self.spec.id.name)?;
        let path = self.spec.path.replace("{id}", &urlencoding::encode(id));
        let key = self.spec.result_key();

        match self.spec.shape {
            Shape::Listing => {
                let skip = args.opt_u64("skip").unwrap_or(0);
                let limit = args.opt_u64("limit").unwrap_or(DEFAULT_LIMIT) as usize;
                let query = QueryParams::new().with("type", "list");
                match self.client.list(&path, &query, skip, limit).await {
                    Ok(listing) => {
                        let mut out = Map::new();
                        out.insert(
                            "message".into(),
                            json!(format!("Found {} {}", listing.count, self.spec.noun)),
                        );
                        out.insert(key.into(), Value::Array(listing.data));
                        out.insert("count".into(), json!(listing.count));
                        Ok(Value::Object(out))
                    }
                    Err(err) if err.kind == ApiErrorKind::NotFound => Ok(not_found(
                        key,
                        json!([]),
                        format!("No {} found for {} {id}", self.spec.noun, self.spec.id.name),
                    )),
                    Err(err) => Err(err),
                }
            }
            Shape::Object { counts } => {
                let query = if counts {
                    QueryParams::new().with("counts", true)
                } else {
                    QueryParams::new()
                };
                match self.client.get(&path, &query).await {
                    Ok(body) => {
                        let data = unwrap_data(body);
                        let label = display_name(&data).unwrap_or(id).to_string();
                        let mut out = Map::new();
                        out.insert(
                            "message".into(),
                            json!(format!("Retrieved {} for {label}", self.spec.noun)),
                        );
                        out.insert(key.into(), data);
                        Ok(Value::Object(out))
                    }
                    Err(err) if err.kind == ApiErrorKind::NotFound => Ok(not_found(
                        key,
                        Value::Null,
                        format!("No object found with {} {id}", self.spec.id.name),
                    )),
                    Err(err) => Err(err),
                }
            }
        }
    }
}

/// A negative answer: the lookup ran but matched nothing.
fn not_found(key: &str, empty: Value, message: String) -> Value {
    let mut out = Map::new();
    out.insert("message".into(), json!(message));
    out.insert(key.into(), empty);
    out.insert("found".into(), json!(false));
    Value::Object(out)
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    }
}

fn display_name(data: &Value) -> Option<&str> {
    data.get("props")
        .and_then(|p| p.get("name"))
        .or_else(|| data.get("name"))
        .and_then(Value::as_str)
}

/// Tools whose arguments do not fit the entity-endpoint pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpecialTool {
    Domains,
    SearchObjects,
    SearchGraph,
    ShortestPath,
    EdgeComposition,
    RelayTargets,
    RunCypherQuery,
    CreateSavedQuery,
    ListSavedQueries,
}

struct SpecialHandler {
    client: Arc<BloodhoundClient>,
    tool: SpecialTool,
}

#[async_trait]
impl ToolHandler for SpecialHandler {
    async fn call(&self, args: &Map<String, Value>) -> Result<Value, ApiError> {
        let args = ToolArgs(args);
        let client = &self.client;

        match self.tool {
            SpecialTool::Domains => {
                let body = client
                    .get("/api/v2/available-domains", &QueryParams::new())
                    .await?;
                let domains = unwrap_data(body);
                let count = domains.as_array().map_or(0, Vec::len);
                Ok(json!({
                    "message": format!("Found {count} domains in BloodHound"),
                    "domains": domains,
                    "count": count,
                }))
            }
            SpecialTool::SearchObjects => {
                let query = args.str("query")?;
                let params = QueryParams::new()
                    .with("q", query)
                    .with_opt("type", args.opt_str("object_type"));
                let listing = client
                    .list(
                        "/api/v2/search",
                        &params,
                        args.opt_u64("skip").unwrap_or(0),
                        args.opt_u64("limit").unwrap_or(DEFAULT_LIMIT) as usize,
                    )
                    .await?;
                Ok(json!({
                    "message": format!("Found {} results matching '{query}'", listing.count),
                    "results": listing.data,
                    "count": listing.count,
                }))
            }
            SpecialTool::SearchGraph => {
                let query = args.str("query")?;
                let params = QueryParams::new()
                    .with("query", query)
                    .with("type", args.opt_str("search_type").unwrap_or("fuzzy"));
                let body = client.get("/api/v2/graph-search", &params).await?;
                Ok(json!({
                    "message": format!("Search results for '{query}'"),
                    "results": unwrap_data(body),
                }))
            }
            SpecialTool::ShortestPath => {
                let start = args.str("start_node")?;
                let end = args.str("end_node")?;
                let params = QueryParams::new()
                    .with("start_node", start)
                    .with("end_node", end)
                    .with_opt("relationshipkinds", args.opt_str("relationship_kinds"));
                match client.get("/api/v2/graphs/shortest-path", &params).await {
                    Ok(body) => Ok(json!({
                        "message": format!("Shortest path from {start} to {end}"),
                        "path": unwrap_data(body),
                        "found": true,
                    })),
                    Err(err) if err.kind == ApiErrorKind::NotFound => Ok(not_found(
                        "path",
                        Value::Null,
                        format!("No path exists from {start} to {end}"),
                    )),
                    Err(err) => Err(err),
                }
            }
            SpecialTool::EdgeComposition | SpecialTool::RelayTargets => {
                let source = args.u64("source_node")?;
                let target = args.u64("target_node")?;
                let edge = args.str("edge_type")?;
                let params = QueryParams::new()
                    .with("sourcenode", source)
                    .with("targetnode", target)
                    .with("edgetype", edge);
                let (path, key, what) = if self.tool == SpecialTool::EdgeComposition {
                    ("/api/v2/graphs/edge-composition", "composition", "Edge composition")
                } else {
                    ("/api/v2/graphs/relay-targets", "targets", "Relay targets")
                };
                let body = client.get(path, &params).await?;
                Ok(json!({
                    "message": format!("{what} for {edge} edge from {source} to {target}"),
                    key: unwrap_data(body),
                }))
            }
            SpecialTool::RunCypherQuery => {
                let query = args.str("query")?;
                let result = client
                    .run_cypher(query, args.bool_or("include_properties", true))
                    .await?;
                let message = if result.has_results {
                    "Cypher query executed successfully"
                } else {
                    "Cypher query executed successfully but matched no data"
                };
                Ok(json!({
                    "message": message,
                    "result": result.data,
                    "has_results": result.has_results,
                    "warnings": result.warnings,
                }))
            }
            SpecialTool::CreateSavedQuery => {
                let name = args.str("name")?;
                let saved = client
                    .create_saved_query(name, args.str("query")?, args.opt_str("description"))
                    .await?;
                Ok(json!({
                    "message": format!("Created saved query '{name}'"),
                    "query": saved,
                }))
            }
            SpecialTool::ListSavedQueries => {
                let listing = client
                    .list_saved_queries(
                        args.opt_u64("skip").unwrap_or(0),
                        args.opt_u64("limit").unwrap_or(DEFAULT_LIMIT) as usize,
                        args.opt_str("name"),
                        args.opt_str("sort_by"),
                    )
                    .await?;
                Ok(json!({
                    "message": format!("Found {} saved queries", listing.count),
                    "queries": listing.data,
                    "count": listing.count,
                }))
            }
        }
    }
}

fn special(
    client: &Arc<BloodhoundClient>,
    tool: SpecialTool,
    name: &str,
    class: ToolClass,
    description: &str,
) -> ToolDescriptor {
    ToolDescriptor::new(
        name,
        description,
        class,
        Arc::new(SpecialHandler {
            client: client.clone(),
            tool,
        }),
    )
}

fn special_tools(client: &Arc<BloodhoundClient>) -> Vec<ToolDescriptor> {
    let [limit, skip] = paging_params();
    vec![
        special(client, SpecialTool::Domains, "get_domains", ToolClass::Lookup,
            "List every domain collected into BloodHound, with object IDs. Start here to get a domain_id."),
        special(client, SpecialTool::SearchObjects, "search_objects", ToolClass::Listing,
            "Search objects by name or object ID. Use this to resolve a name such as 'DOMAIN ADMINS@CORP.LOCAL' into an object ID.")
            .param(ParamSpec::required("query", ParamType::String, "Partial or full name, or an object ID"))
            .param(ParamSpec::optional("object_type", ParamType::String,
                "Filter by kind: User, Computer, Group, GPO, OU, Domain, or Azure kinds such as AZUser"))
            .param(limit.clone())
            .param(skip.clone()),
        special(client, SpecialTool::SearchGraph, "search_graph", ToolClass::Listing,
            "Search graph nodes by name.")
            .param(ParamSpec::required("query", ParamType::String, "Text to match against node names"))
            .param(ParamSpec::optional("search_type", ParamType::String, "'fuzzy' or 'exact'")
                .with_default(json!("fuzzy"))),
        special(client, SpecialTool::ShortestPath, "get_shortest_path", ToolClass::Listing,
            "Find the shortest attack path between two nodes. Returns found=false when no path exists.")
            .param(ParamSpec::required("start_node", ParamType::String, "Object ID of the source node"))
            .param(ParamSpec::required("end_node", ParamType::String, "Object ID of the target node"))
            .param(ParamSpec::optional("relationship_kinds", ParamType::String,
                "Relationship filter, e.g. 'in:MemberOf,AdminTo'")),
        special(client, SpecialTool::EdgeComposition, "get_edge_composition", ToolClass::Lookup,
            "Break a composite edge (for example ADCSESC1) down into the relationships it is built from.")
            .param(ParamSpec::required("source_node", ParamType::Integer, "Graph ID of the source node").at_least(0))
            .param(ParamSpec::required("target_node", ParamType::Integer, "Graph ID of the target node").at_least(0))
            .param(ParamSpec::required("edge_type", ParamType::String, "Edge kind, e.g. 'ADCSESC1'")),
        special(client, SpecialTool::RelayTargets, "get_relay_targets", ToolClass::Lookup,
            "List valid relay targets for an NTLM relay edge between two nodes.")
            .param(ParamSpec::required("source_node", ParamType::Integer, "Graph ID of the source node").at_least(0))
            .param(ParamSpec::required("target_node", ParamType::Integer, "Graph ID of the target node").at_least(0))
            .param(ParamSpec::required("edge_type", ParamType::String, "Edge kind, e.g. 'CoerceAndRelayNTLMToSMB'")),
        special(client, SpecialTool::RunCypherQuery, "run_cypher_query", ToolClass::RawQuery,
            "Run a read-only Cypher query against the BloodHound graph. Add a LIMIT clause; oversized results are refused. An empty match is reported as has_results=false, not an error.")
            .param(ParamSpec::required("query", ParamType::String, "The Cypher query"))
            .param(ParamSpec::optional("include_properties", ParamType::Boolean,
                "Include node and edge properties").with_default(json!(true))),
        special(client, SpecialTool::CreateSavedQuery, "create_saved_query", ToolClass::Lookup,
            "Save a Cypher query in BloodHound under a name.")
            .param(ParamSpec::required("name", ParamType::String, "Name for the saved query"))
            .param(ParamSpec::required("query", ParamType::String, "The Cypher query to save"))
            .param(ParamSpec::optional("description", ParamType::String, "What the query finds")),
        special(client, SpecialTool::ListSavedQueries, "list_saved_queries", ToolClass::Listing,
            "List saved Cypher queries.")
            .param(ParamSpec::optional("name", ParamType::String, "Filter by query name"))
            .param(ParamSpec::optional("sort_by", ParamType::String, "Field to sort by, e.g. 'name'"))
            .param(limit)
            .param(skip),
    ]
}

/// Register the full BloodHound tool set.
pub fn register_all(
    catalog: &mut ToolCatalog,
    client: Arc<BloodhoundClient>,
) -> Result<(), CatalogError> {
    let mut specials = special_tools(&client).into_iter();
    // get_domains and search_objects lead the listing; models read top-down
    for descriptor in specials.by_ref().take(2) {
        catalog.register(descriptor)?;
    }

    for spec in ENDPOINTS {
        let class = match spec.shape {
            Shape::Listing => ToolClass::Listing,
            Shape::Object { .. } => ToolClass::Lookup,
        };
        let mut descriptor = ToolDescriptor::new(
            spec.name,
            spec.description,
            class,
            Arc::new(EndpointHandler {
                client: client.clone(),
                spec,
            }),
        )
        .param(ParamSpec::required(spec.id.name, ParamType::String, spec.id.description));
        if spec.shape == Shape::Listing {
            for p in paging_params() {
                descriptor = descriptor.param(p);
            }
        }
        catalog.register(descriptor)?;
    }

    for descriptor in specials {
        catalog.register(descriptor)?;
    }
    Ok(())
}

/// Build a catalog holding the full tool set.
pub fn build_catalog(client: Arc<BloodhoundClient>) -> Result<ToolCatalog, CatalogError> {
    let mut catalog = ToolCatalog::new();
    register_all(&mut catalog, client)?;
    Ok(catalog)
}
