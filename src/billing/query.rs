//! Paginated Cost Management query, grouped by resource type.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::token::TokenProvider;
use super::{BillingError, CostSource};
use crate::detect::series::CostRecord;

/// Cost Management query client for a single app registration.
#[derive(Debug, Clone)]
pub struct CostManagementClient {
    http: Client,
    management_endpoint: String,
    api_version: String,
    tokens: TokenProvider,
}

/// One decoded page of query results.
#[derive(Debug, Clone, PartialEq)]
pub struct CostPage {
    pub records: Vec<CostRecord>,
    pub next_link: Option<String>,
}

impl CostManagementClient {
    pub fn new(
        http: Client,
        management_endpoint: impl Into<String>,
        api_version: impl Into<String>,
        tokens: TokenProvider,
    ) -> Self {
        Self {
            http,
            management_endpoint: management_endpoint.into(),
            api_version: api_version.into(),
            tokens,
        }
    }

    pub fn query_url(&self, subscription_id: &str) -> String {
        format!(
            "{}/subscriptions/{}/providers/Microsoft.CostManagement/query?api-version={}",
            self.management_endpoint.trim_end_matches('/'),
            subscription_id,
            self.api_version
        )
    }
}

/// Daily pre-tax cost summed per resource type over `[from, to]`.
pub fn query_body(from: NaiveDate, to: NaiveDate) -> Value {
    json!({
        "type": "Usage",
        "timeframe": "Custom",
        "timePeriod": {
            "from": format!("{}T00:00:00+00:00", from),
            "to": format!("{}T23:59:59+00:00", to),
        },
        "dataset": {
            "granularity": "Daily",
            "aggregation": {
                "totalCost": { "name": "PreTaxCost", "function": "Sum" }
            },
            "grouping": [
                { "type": "Dimension", "name": "ResourceType" }
            ]
        }
    })
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    properties: Option<QueryProperties>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryProperties {
    rows: Option<Vec<Vec<Value>>>,
    next_link: Option<String>,
}

/// Decode a query response page.
///
/// Rows are positional: `[amount, YYYYMMDD date, resource type, ...]`.
/// Any row that does not have this shape fails the whole page.
pub fn parse_page(body: &str) -> Result<CostPage, BillingError> {
    let response: QueryResponse = serde_json::from_str(body)
        .map_err(|e| BillingError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let properties = response
        .properties
        .ok_or_else(|| BillingError::MalformedResponse("missing properties".into()))?;
    let rows = properties
        .rows
        .ok_or_else(|| BillingError::MalformedResponse("missing properties.rows".into()))?;

    let records = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            parse_row(row)
                .map_err(|e| BillingError::MalformedResponse(format!("row {}: {}", i, e)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let next_link = properties
        .next_link
        .filter(|link| !link.trim().is_empty());

    Ok(CostPage { records, next_link })
}

fn parse_row(row: &[Value]) -> Result<CostRecord, String> {
    if row.len() < 3 {
        return Err(format!("expected at least 3 columns, got {}", row.len()));
    }
    let amount = row[0]
        .as_f64()
        .ok_or_else(|| format!("amount is not a number: {}", row[0]))?;
    let date = parse_usage_date(&row[1])?;
    let category = row[2]
        .as_str()
        .ok_or_else(|| format!("resource type is not a string: {}", row[2]))?;

    Ok(CostRecord {
        category: category.to_string(),
        date,
        amount,
    })
}

/// Usage dates arrive as 8-digit `YYYYMMDD`, either quoted or numeric.
fn parse_usage_date(value: &Value) -> Result<NaiveDate, String> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) if n.is_u64() => n.to_string(),
        other => return Err(format!("date is not a YYYYMMDD value: {}", other)),
    };
    if raw.len() != 8 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("date is not a YYYYMMDD value: {}", raw));
    }
    NaiveDate::parse_from_str(&raw, "%Y%m%d").map_err(|e| format!("invalid date {}: {}", raw, e))
}

#[async_trait]
impl CostSource for CostManagementClient {
    async fn fetch_costs(
        &self,
        subscription_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<CostRecord>, BillingError> {
        let token = self.tokens.acquire(&self.http).await?;
        let body = query_body(from, to);

        let mut records = Vec::new();
        let mut next_link = Some(self.query_url(subscription_id));
        let mut pages = 0usize;

        while let Some(link) = next_link.take() {
            debug!(%link, "loading cost page");
            let response = self
                .http
                .post(&link)
                .bearer_auth(&token)
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(BillingError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }

            let page = parse_page(&text)?;
            records.extend(page.records);
            next_link = page.next_link;
            pages += 1;
        }

        info!(
            %subscription_id,
            %from,
            %to,
            pages,
            records = records.len(),
            "cost records retrieved"
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_query_body_window() {
        let body = query_body(day(2024, 1, 1), day(2024, 3, 31));
        assert_eq!(body["timePeriod"]["from"], "2024-01-01T00:00:00+00:00");
        assert_eq!(body["timePeriod"]["to"], "2024-03-31T23:59:59+00:00");
        assert_eq!(body["dataset"]["granularity"], "Daily");
        assert_eq!(body["dataset"]["grouping"][0]["name"], "ResourceType");
        assert_eq!(body["dataset"]["aggregation"]["totalCost"]["function"], "Sum");
    }

    #[test]
    fn test_query_url() {
        let tokens =
            TokenProvider::new("https://login", "t", "c", "s", "https://management.azure.com");
        let client = CostManagementClient::new(
            Client::new(),
            "https://management.azure.com/",
            "2019-11-01",
            tokens,
        );
        assert_eq!(
            client.query_url("sub-1"),
            concat!(
                "https://management.azure.com/subscriptions/sub-1",
                "/providers/Microsoft.CostManagement/query?api-version=2019-11-01"
            )
        );
    }

    #[test]
    fn test_parse_page_with_next_link() {
        let body = r#"{
            "properties": {
                "nextLink": "https://management.azure.com/next?page=2",
                "columns": [
                    {"name": "PreTaxCost", "type": "Number"},
                    {"name": "UsageDate", "type": "Number"},
                    {"name": "ResourceType", "type": "String"},
                    {"name": "Currency", "type": "String"}
                ],
                "rows": [
                    [12.5, "20240301", "microsoft.compute/virtualmachines", "USD"],
                    [3.25, 20240302, "microsoft.storage/storageaccounts", "USD"]
                ]
            }
        }"#;

        let page = parse_page(body).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].amount, 12.5);
        assert_eq!(page.records[0].date, day(2024, 3, 1));
        assert_eq!(page.records[0].category, "microsoft.compute/virtualmachines");
        assert_eq!(page.records[1].date, day(2024, 3, 2));
        assert_eq!(
            page.next_link.as_deref(),
            Some("https://management.azure.com/next?page=2")
        );
    }

    #[test]
    fn test_blank_or_null_next_link_ends_paging() {
        let page = parse_page(r#"{"properties": {"rows": [], "nextLink": null}}"#).unwrap();
        assert!(page.next_link.is_none());
        let page = parse_page(r#"{"properties": {"rows": [], "nextLink": "  "}}"#).unwrap();
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_malformed_rows_fail_the_page() {
        let cases = [
            r#"{"properties": {"rows": [["12.5", "20240301", "vm"]]}}"#,
            r#"{"properties": {"rows": [[12.5, "2024-03-01", "vm"]]}}"#,
            r#"{"properties": {"rows": [[12.5, "20241341", "vm"]]}}"#,
            r#"{"properties": {"rows": [[12.5, "20240301", 7]]}}"#,
            r#"{"properties": {"rows": [[12.5, "20240301"]]}}"#,
            r#"{"properties": {}}"#,
            r#"{"error": {"code": "Throttled"}}"#,
            "not json",
        ];
        for body in cases {
            let err = parse_page(body).unwrap_err();
            assert!(
                matches!(err, BillingError::MalformedResponse(_)),
                "expected malformed response for {}",
                body
            );
        }
    }
}
