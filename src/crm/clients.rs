//! Find a Jobber client by email or phone, or create one.
//!
//! Matching order: exact email (case/whitespace-insensitive), then exact
//! phone (digits only). Search failures are logged and fall through to
//! the next strategy so a flaky search never blocks client creation.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{first_user_error, GraphQlExecutor, UserError};
use crate::error::AppError;

const SEARCH_CLIENTS: &str = r#"
    query SearchClients($searchTerm: String!) {
        clients(searchTerm: $searchTerm, first: 10) {
            nodes {
                id
                firstName
                lastName
                companyName
                emails {
                    address
                }
                phones {
                    number
                }
            }
        }
    }
"#;

const CLIENT_PROPERTIES: &str = r#"
    query GetClientProperties($clientId: EncodedId!) {
        client(id: $clientId) {
            properties {
                id
            }
        }
    }
"#;

const CREATE_PROPERTY: &str = r#"
    mutation CreateProperty($clientId: EncodedId!, $input: PropertyCreateInput!) {
        propertyCreate(clientId: $clientId, input: $input) {
            properties {
                id
            }
            userErrors {
                message
                path
            }
        }
    }
"#;

const CREATE_CLIENT: &str = r#"
    mutation CreateClient($input: ClientCreateInput!) {
        clientCreate(input: $input) {
            client {
                id
                firstName
                lastName
                companyName
            }
            userErrors {
                message
                path
            }
        }
    }
"#;

/// A client record as returned by Jobber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrmClient {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<ClientEmail>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phones: Option<Vec<ClientPhone>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientEmail {
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientPhone {
    pub number: Option<String>,
}

/// Contact details entered on the estimate form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientLookup {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchedBy {
    Email,
    Phone,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMatch {
    pub client: CrmClient,
    pub property_id: Option<String>,
    pub created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<MatchedBy>,
}

#[derive(Deserialize)]
struct SearchData {
    clients: NodeList,
}

#[derive(Deserialize)]
struct NodeList {
    #[serde(default)]
    nodes: Vec<CrmClient>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClientData {
    client_create: CreateClientPayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateClientPayload {
    client: Option<CrmClient>,
    user_errors: Option<Vec<UserError>>,
}

pub fn normalize_email(email: Option<&str>) -> String {
    email.map(|e| e.trim().to_lowercase()).unwrap_or_default()
}

pub fn normalize_phone(phone: Option<&str>) -> String {
    phone
        .map(|p| p.chars().filter(char::is_ascii_digit).collect())
        .unwrap_or_default()
}

/// Split a full name into first and last name.
///
/// Missing parts default to "Unknown" / "Customer".
pub fn split_name(name: Option<&str>) -> (String, String) {
    let name = name.filter(|n| !n.is_empty()).unwrap_or("Unknown Customer");
    let mut parts = name.split(' ');
    let first = parts
        .next()
        .filter(|p| !p.is_empty())
        .unwrap_or("Unknown")
        .to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    let last = if rest.is_empty() { "Customer".to_string() } else { rest };
    (first, last)
}

pub fn match_by_email(nodes: Vec<CrmClient>, email: &str) -> Option<CrmClient> {
    let target = normalize_email(Some(email));
    if target.is_empty() {
        return None;
    }
    nodes.into_iter().find(|client| {
        client
            .emails
            .iter()
            .flatten()
            .any(|e| normalize_email(e.address.as_deref()) == target)
    })
}

pub fn match_by_phone(nodes: Vec<CrmClient>, phone: &str) -> Option<CrmClient> {
    let target = normalize_phone(Some(phone));
    if target.is_empty() {
        return None;
    }
    nodes.into_iter().find(|client| {
        client
            .phones
            .iter()
            .flatten()
            .any(|p| normalize_phone(p.number.as_deref()) == target)
    })
}

pub async fn find_or_create_client(
    crm: &dyn GraphQlExecutor,
    lookup: &ClientLookup,
) -> Result<ClientMatch, AppError> {
    let address = present(&lookup.address);

    if let Some(email) = present(&lookup.email) {
        match search_clients(crm, email).await {
            Ok(nodes) => {
                if let Some(client) = match_by_email(nodes, email) {
                    return Ok(existing_match(crm, client, address, MatchedBy::Email).await);
                }
            }
            Err(e) => warn!("Email search failed: {e}"),
        }
    }

    if let Some(phone) = present(&lookup.phone) {
        match search_clients(crm, phone).await {
            Ok(nodes) => {
                if let Some(client) = match_by_phone(nodes, phone) {
                    return Ok(existing_match(crm, client, address, MatchedBy::Phone).await);
                }
            }
            Err(e) => warn!("Phone search failed: {e}"),
        }
    }

    create_client(crm, lookup, address).await
}

async fn existing_match(
    crm: &dyn GraphQlExecutor,
    client: CrmClient,
    address: Option<&str>,
    matched_by: MatchedBy,
) -> ClientMatch {
    info!(client_id = %client.id, ?matched_by, "Matched existing Jobber client");
    let property_id = ensure_property(crm, &client.id, address).await;
    ClientMatch {
        client,
        property_id,
        created: false,
        matched_by: Some(matched_by),
    }
}

async fn create_client(
    crm: &dyn GraphQlExecutor,
    lookup: &ClientLookup,
    address: Option<&str>,
) -> Result<ClientMatch, AppError> {
    let (first_name, last_name) = split_name(lookup.name.as_deref());

    let mut input = json!({
        "firstName": first_name,
        "lastName": last_name,
    });
    if let Some(email) = present(&lookup.email) {
        input["emails"] = json!([{ "description": "MAIN", "primary": true, "address": email }]);
    }
    if let Some(phone) = present(&lookup.phone) {
        input["phones"] = json!([{ "description": "MAIN", "primary": true, "number": phone }]);
    }

    let data = crm.execute(CREATE_CLIENT, json!({ "input": input })).await?;
    let payload: CreateClientData =
        serde_json::from_value(data).map_err(|_| AppError::InvalidResponse)?;

    if let Some(message) = first_user_error(payload.client_create.user_errors.as_deref()) {
        return Err(AppError::Crm(message));
    }

    let client = payload
        .client_create
        .client
        .ok_or(AppError::InvalidResponse)?;
    info!(client_id = %client.id, "Created Jobber client");

    let property_id = match address {
        Some(address) => create_property(crm, &client.id, address).await,
        None => None,
    };

    Ok(ClientMatch {
        client,
        property_id,
        created: true,
        matched_by: None,
    })
}

async fn search_clients(
    crm: &dyn GraphQlExecutor,
    term: &str,
) -> Result<Vec<CrmClient>, AppError> {
    let data = crm
        .execute(SEARCH_CLIENTS, json!({ "searchTerm": term }))
        .await?;
    let parsed: SearchData = serde_json::from_value(data).map_err(|_| AppError::InvalidResponse)?;
    Ok(parsed.clients.nodes)
}

/// First property of the client, creating one from `address` if it has none.
async fn ensure_property(
    crm: &dyn GraphQlExecutor,
    client_id: &str,
    address: Option<&str>,
) -> Option<String> {
    if let Some(id) = client_property(crm, client_id).await {
        return Some(id);
    }
    create_property(crm, client_id, address?).await
}

async fn client_property(crm: &dyn GraphQlExecutor, client_id: &str) -> Option<String> {
    match crm
        .execute(CLIENT_PROPERTIES, json!({ "clientId": client_id }))
        .await
    {
        Ok(data) => first_id(&data, "/client/properties/0/id"),
        Err(e) => {
            warn!("Get client property error: {e}");
            None
        }
    }
}

async fn create_property(
    crm: &dyn GraphQlExecutor,
    client_id: &str,
    address: &str,
) -> Option<String> {
    let variables = json!({
        "clientId": client_id,
        "input": { "address": { "street1": address } },
    });

    let data = match crm.execute(CREATE_PROPERTY, variables).await {
        Ok(data) => data,
        Err(e) => {
            warn!("Create property error: {e}");
            return None;
        }
    };

    let user_errors: Option<Vec<UserError>> = data
        .pointer("/propertyCreate/userErrors")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok());
    if let Some(message) = first_user_error(user_errors.as_deref()) {
        warn!("Property create error: {message}");
        return None;
    }

    first_id(&data, "/propertyCreate/properties/0/id")
}

fn first_id(data: &Value, pointer: &str) -> Option<String> {
    data.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}
