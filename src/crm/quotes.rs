//! Quote creation in Jobber from estimate line items.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::{first_user_error, GraphQlExecutor, UserError};
use crate::error::AppError;

const DEFAULT_TITLE: &str = "Spray Foam Estimate";

const CREATE_QUOTE: &str = r#"
    mutation CreateQuote($clientId: EncodedId!, $propertyId: EncodedId!, $title: String, $lineItems: [QuoteCreateLineItemAttributes!]!, $discount: CostModifierAttributes) {
        quoteCreate(attributes: {
            clientId: $clientId
            propertyId: $propertyId
            title: $title
            lineItems: $lineItems
            discount: $discount
        }) {
            quote {
                id
                quoteNumber
                jobberWebUri
            }
            userErrors {
                message
                path
            }
        }
    }
"#;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub client_id: Option<String>,
    pub property_id: Option<String>,
    pub title: Option<String>,
    #[serde(default)]
    pub line_items: Vec<QuoteLineItem>,
    pub discount: Option<Discount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLineItem {
    pub name: String,
    pub description: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Discount {
    pub rate: f64,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: String,
    pub quote_number: Option<String>,
    pub jobber_web_uri: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LineItemInput<'a> {
    name: &'a str,
    description: &'a str,
    quantity: f64,
    unit_price: f64,
    save_to_products_and_services: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteCreateData {
    quote_create: QuoteCreatePayload,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteCreatePayload {
    quote: Option<Quote>,
    user_errors: Option<Vec<UserError>>,
}

/// Round a price to cents.
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// Build the `CreateQuote` variables, rejecting requests without a property.
pub fn build_variables(req: &QuoteRequest) -> Result<Value, AppError> {
    let property_id = req
        .property_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest("Property ID is required to create a quote".into()))?;

    let line_items: Vec<LineItemInput<'_>> = req
        .line_items
        .iter()
        .map(|item| LineItemInput {
            name: &item.name,
            description: item.description.as_deref().unwrap_or(""),
            quantity: item.quantity.filter(|q| *q != 0.0).unwrap_or(1.0),
            unit_price: round_price(item.unit_price),
            save_to_products_and_services: false,
        })
        .collect();

    let mut variables = json!({
        "clientId": req.client_id,
        "propertyId": property_id,
        "title": req.title.as_deref().filter(|t| !t.is_empty()).unwrap_or(DEFAULT_TITLE),
        "lineItems": line_items,
    });

    if let Some(discount) = req.discount.as_ref().filter(|d| d.rate > 0.0) {
        variables["discount"] = json!({
            "rate": discount.rate,
            "type": discount.kind,
        });
    }

    Ok(variables)
}

pub async fn create_quote(crm: &dyn GraphQlExecutor, req: &QuoteRequest) -> Result<Quote, AppError> {
    let variables = build_variables(req)?;

    let data = crm.execute(CREATE_QUOTE, variables).await?;
    let payload: QuoteCreateData =
        serde_json::from_value(data).map_err(|_| AppError::InvalidResponse)?;

    if let Some(message) = first_user_error(payload.quote_create.user_errors.as_deref()) {
        return Err(AppError::Crm(message));
    }

    let quote = payload.quote_create.quote.ok_or(AppError::InvalidResponse)?;
    info!(quote_id = %quote.id, "Created Jobber quote");
    Ok(quote)
}
