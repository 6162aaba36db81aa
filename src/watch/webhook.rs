//! Discord-style webhook notifications for new products

use crate::catalog::ProductRecord;
use crate::config::NotifyConfig;
use chrono::{SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use url::Url;

/// Placeholder for fields the listing did not provide
const MISSING: &str = "-";

/// Errors that can occur while delivering notifications
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Webhook request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Body of one webhook POST
#[derive(Debug, Serialize)]
pub struct WebhookMessage {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub attachments: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Embed {
    pub title: Option<String>,
    pub url: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub author: EmbedAuthor,
    pub timestamp: String,
    pub thumbnail: EmbedThumbnail,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub url: String,
    pub icon_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmbedThumbnail {
    pub url: Option<String>,
}

/// Posts new products to a webhook, a batch of embeds per message
pub struct Notifier {
    client: Client,
    webhook_url: Url,
    base_url: Url,
    batch_size: usize,
    author: EmbedAuthor,
}

impl Notifier {
    /// Creates a notifier
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for the POSTs
    /// * `webhook_url` - Where the messages are sent
    /// * `config` - Batch size and embed author
    /// * `base_url` - Page the relative product URLs are resolved against
    pub fn new(client: Client, webhook_url: Url, config: &NotifyConfig, base_url: Url) -> Self {
        Self {
            client,
            webhook_url,
            base_url,
            batch_size: config.batch_size.max(1),
            author: EmbedAuthor {
                name: config.author_name.clone(),
                url: config.author_url.clone(),
                icon_url: config.author_icon_url.clone(),
            },
        }
    }

    /// Builds the embed announcing one product
    pub fn build_embed(&self, product: &ProductRecord, timestamp: &str) -> Embed {
        let category = product
            .most_specific_category()
            .and_then(|c| c.name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(MISSING);

        let price = product
            .price
            .as_deref()
            .map(str::trim)
            .filter(|price| !price.is_empty())
            .unwrap_or(MISSING);

        let date = if product.date.trim().is_empty() {
            MISSING
        } else {
            product.date.trim()
        };

        Embed {
            title: product.name.as_deref().map(|name| name.trim().to_string()),
            url: self.absolute_url(product.url.as_deref()),
            color: None,
            fields: vec![
                field("Release date", date),
                field("Category", category),
                field("Price", price),
            ],
            author: self.author.clone(),
            timestamp: timestamp.to_string(),
            thumbnail: EmbedThumbnail {
                url: self.absolute_url(product.image.as_deref()),
            },
        }
    }

    /// Sends one embed per product, `batch_size` embeds per message
    ///
    /// Messages are sent in order and the first failure stops delivery.
    ///
    /// # Returns
    ///
    /// The number of messages sent
    pub async fn notify(&self, products: &[&ProductRecord]) -> Result<usize, WebhookError> {
        if products.is_empty() {
            return Ok(0);
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let embeds: Vec<Embed> = products
            .iter()
            .map(|product| self.build_embed(product, &timestamp))
            .collect();

        let mut sent = 0;
        for batch in embeds.chunks(self.batch_size) {
            let message = WebhookMessage {
                content: None,
                embeds: batch.to_vec(),
                attachments: Vec::new(),
            };
            self.post(&message).await?;
            sent += 1;
        }

        tracing::info!(
            "Announced {} new products in {} webhook messages",
            products.len(),
            sent
        );
        Ok(sent)
    }

    async fn post(&self, message: &WebhookMessage) -> Result<(), WebhookError> {
        tracing::debug!(
            "Posting {} embeds to webhook {}",
            message.embeds.len(),
            self.webhook_url.host_str().unwrap_or("")
        );

        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Webhook failed {}: {}", status, body);
            return Err(WebhookError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn absolute_url(&self, href: Option<&str>) -> Option<String> {
        let href = href?.trim();
        if href.is_empty() {
            return None;
        }
        match self.base_url.join(href) {
            Ok(url) => Some(url.to_string()),
            Err(_) => Some(href.to_string()),
        }
    }
}

fn field(name: &str, value: &str) -> EmbedField {
    EmbedField {
        name: name.to_string(),
        value: value.to_string(),
        inline: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CategoryRef;

    fn notifier() -> Notifier {
        Notifier::new(
            Client::new(),
            Url::parse("https://hooks.test/webhook").unwrap(),
            &NotifyConfig::default(),
            Url::parse("https://www.suruga-ya.com/en/products?keyword=figure").unwrap(),
        )
    }

    fn product() -> ProductRecord {
        ProductRecord {
            id: Some("123".to_string()),
            url: Some("/en/product/123".to_string()),
            name: Some(" Figure A ".to_string()),
            image: Some("https://cdn.test/a.jpg".to_string()),
            date: "2024-01-01".to_string(),
            categories: vec![
                CategoryRef {
                    name: Some("Hobby".to_string()),
                    url: Some("/c/hobby".to_string()),
                },
                CategoryRef {
                    name: Some("Figures".to_string()),
                    url: Some("/c/figures".to_string()),
                },
            ],
            price: Some("¥1,200".to_string()),
        }
    }

    #[test]
    fn test_embed_fields() {
        let embed = notifier().build_embed(&product(), "2024-05-01T00:00:00.000Z");

        assert_eq!(embed.title.as_deref(), Some("Figure A"));
        assert_eq!(
            embed.url.as_deref(),
            Some("https://www.suruga-ya.com/en/product/123")
        );
        assert_eq!(embed.fields.len(), 3);
        assert_eq!(embed.fields[0].name, "Release date");
        assert_eq!(embed.fields[0].value, "2024-01-01");
        assert_eq!(embed.fields[1].name, "Category");
        assert_eq!(embed.fields[1].value, "Figures");
        assert_eq!(embed.fields[2].name, "Price");
        assert_eq!(embed.fields[2].value, "¥1,200");
        assert_eq!(embed.author.name, "Suruga-ya.com");
        assert_eq!(embed.thumbnail.url.as_deref(), Some("https://cdn.test/a.jpg"));
        assert_eq!(embed.timestamp, "2024-05-01T00:00:00.000Z");
    }

    #[test]
    fn test_embed_placeholders_for_missing_fields() {
        let mut sparse = product();
        sparse.categories.clear();
        sparse.price = None;
        sparse.image = None;
        sparse.url = None;

        let embed = notifier().build_embed(&sparse, "t");
        assert_eq!(embed.fields[1].value, "-");
        assert_eq!(embed.fields[2].value, "-");
        assert!(embed.thumbnail.url.is_none());
        assert!(embed.url.is_none());
    }

    #[test]
    fn test_message_serialization() {
        let message = WebhookMessage {
            content: None,
            embeds: vec![notifier().build_embed(&product(), "t")],
            attachments: Vec::new(),
        };
        let json = serde_json::to_value(&message).unwrap();

        assert!(json["content"].is_null());
        assert_eq!(json["attachments"], serde_json::json!([]));
        assert!(json["embeds"][0]["color"].is_null());
        assert_eq!(json["embeds"][0]["fields"][0]["inline"], true);
        assert_eq!(
            json["embeds"][0]["author"]["icon_url"],
            NotifyConfig::default().author_icon_url
        );
    }

    #[tokio::test]
    async fn test_notify_nothing_sends_nothing() {
        assert_eq!(notifier().notify(&[]).await.unwrap(), 0);
    }
}
