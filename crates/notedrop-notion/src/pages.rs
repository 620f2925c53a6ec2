//! Page creation against a resolved data source.

use serde_json::json;
use tracing::debug;

use crate::client::NotionClient;
use crate::error::{Error, Result};
use crate::types::CreatedPage;

/// Notion's ceiling on title length, in characters.
const TITLE_MAX_CHARS: usize = 2000;

/// Creates a page in a data source from a template and a title text.
///
/// The title text is truncated to the platform's 2000-character ceiling and
/// assigned to the property named by `title_property_key`, which must be the
/// data source's title-type property.
///
/// # Errors
///
/// Returns an error on transport failure or any non-success status. Callers
/// at the UI boundary log and no-op; there is no retry.
pub async fn create_page(
    client: &NotionClient,
    token: &str,
    data_source_id: &str,
    title_property_key: &str,
    title_text: &str,
    template_id: &str,
) -> Result<CreatedPage> {
    let title: String = title_text.chars().take(TITLE_MAX_CHARS).collect();
    let body = json!({
        "parent": {"data_source_id": data_source_id},
        "properties": {
            title_property_key: {
                "title": [{"text": {"content": title}}]
            }
        },
        "template": {"type": "template_id", "template_id": template_id},
    });

    let res = client.post(token, "/v1/pages", &body).await?;
    let status = res.status();
    if !status.is_success() {
        let message = res.text().await.unwrap_or_default();
        return Err(Error::api(status.as_u16(), message));
    }

    let page: CreatedPage = res.json().await?;
    debug!(data_source_id, template_id, "created page");
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_parent_properties_and_template() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .and(body_partial_json(json!({
                "parent": {"data_source_id": "ds1"},
                "properties": {"Name": {"title": [{"text": {"content": "clip"}}]}},
                "template": {"type": "template_id", "template_id": "t1"},
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"url": "https://notion.so/p1"})),
            )
            .mount(&server)
            .await;

        let client = NotionClient::with_base_url(server.uri());
        let page = create_page(&client, "secret", "ds1", "Name", "clip", "t1")
            .await
            .unwrap();
        assert_eq!(page.url.as_deref(), Some("https://notion.so/p1"));
    }

    #[tokio::test]
    async fn truncates_title_to_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = NotionClient::with_base_url(server.uri());
        let long = "x".repeat(2500);
        create_page(&client, "secret", "ds1", "Name", &long, "t1")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        let content = body["properties"]["Name"]["title"][0]["text"]["content"]
            .as_str()
            .unwrap();
        assert_eq!(content.chars().count(), 2000);
    }

    #[tokio::test]
    async fn non_success_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        let client = NotionClient::with_base_url(server.uri());
        let err = create_page(&client, "secret", "ds1", "Name", "clip", "t1")
            .await
            .unwrap_err();
        match err {
            Error::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad request");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
