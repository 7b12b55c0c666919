//! Per-call XML detail client, used only to backfill missing budgets.

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument};

use callscout_common::parse_amount;

use super::{FetchError, SourceConfig};

/// Client for the detail endpoint (`{base}/{id}` returning XML).
pub struct DetailClient {
    client: reqwest::Client,
    base_url: String,
}

impl DetailClient {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.detail_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.detail_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the detail XML for one call and scan it for a budget.
    /// A well-formed response without a usable `<Budget>` element is
    /// `Ok(None)`; only transport problems surface as errors.
    #[instrument(skip(self))]
    pub async fn fetch_budget(&self, call_id: i64) -> Result<Option<f64>, FetchError> {
        let url = format!("{}/{}", self.base_url, call_id);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = resp.text().await?;
        Ok(scan_budget_xml(&body))
    }
}

/// Find the first `<Budget>` descendant anywhere in the document and
/// parse its text as an amount. Malformed XML or an unparsable amount
/// yields `None`, never an error.
pub fn scan_budget_xml(xml: &str) -> Option<f64> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut in_budget = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"Budget" => in_budget = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"Budget" => in_budget = false,
            Ok(Event::Text(ref e)) if in_budget => {
                let text = e.unescape().unwrap_or_default();
                if let Some(amount) = parse_amount(&text) {
                    return Some(amount);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "Detail XML parse error, treating budget as absent");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    None
}
