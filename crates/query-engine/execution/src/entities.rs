//! List the entity sets the service declares in its `$metadata` document.

use std::time::Instant;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{info_span, Instrument};

use query_engine_odata::odata::url::{metadata_url, QueryParameters};

use crate::error::Error;
use crate::metrics::Metrics;
use crate::query::{elapsed_ms, transport, ODataClient};

/// The `Name` of every `EntitySet` element, in document order.
pub fn parse_entity_sets(xml: &str) -> Result<Vec<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut names = vec![];
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if element.local_name().as_ref() == b"EntitySet" =>
            {
                for attribute in element.attributes() {
                    let attribute = attribute?;
                    if attribute.key.local_name().as_ref() == b"Name" {
                        let name = attribute.unescape_value()?;
                        if !name.is_empty() {
                            names.push(name.into_owned());
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(names)
}

impl ODataClient {
    /// Fetch `$metadata` and list its entity sets. A document without any is an error.
    pub async fn fetch_entity_sets(&self, metrics: &Metrics) -> Result<Vec<String>, Error> {
        let url = metadata_url(&self.connection().base_url)?;

        let span = info_span!("odata_metadata", url = %url);
        async {
            let start = Instant::now();
            let result = self
                .connection()
                .retry
                .run("odata_metadata", Error::is_retryable, |_| {
                    self.get_entity_sets(&url)
                })
                .await;
            metrics.record_odata_request(start.elapsed(), result.is_ok());
            if let Ok(names) = &result {
                tracing::info!(entity_sets = names.len(), "read OData metadata");
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn get_entity_sets(&self, url: &str) -> Result<Vec<String>, Error> {
        let start = Instant::now();
        let request = self
            .http()
            .get(url)
            .header(reqwest::header::ACCEPT, "application/xml")
            .timeout(self.connection().timeout);
        let response = self
            .authenticate(request)
            .send()
            .await
            .map_err(|source| transport(url, &QueryParameters::new(), start, source))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|source| transport(url, &QueryParameters::new(), start, source))?;

        if status >= 400 {
            return Err(Error::Http {
                status,
                detail: serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)),
                url: url.to_string(),
                elapsed_ms: elapsed_ms(start),
                params: QueryParameters::new(),
            });
        }

        let invalid = |message: String| Error::InvalidPayload {
            url: url.to_string(),
            status,
            elapsed_ms: elapsed_ms(start),
            params: QueryParameters::new(),
            message,
        };
        let names = parse_entity_sets(&body).map_err(|err| invalid(err.to_string()))?;
        if names.is_empty() {
            return Err(invalid("no entity sets found in $metadata".to_string()));
        }
        Ok(names)
    }
}
