use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::Arc;

use reqwest::{Client, Response, Url};
use serde::Deserialize;

use crate::Error;

/// The public Frankfurter API.
pub const DEFAULT_BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// A client for the `/latest` endpoint of a Frankfurter-compatible rate
/// service.
#[derive(Clone, Debug)]
pub struct RateClient {
    client: Client,
    base_url: Arc<str>,
}

impl RateClient {
    /// Creates a client for the service at `base_url`, e.g.
    /// [`DEFAULT_BASE_URL`].
    #[inline]
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Creates a client that sends requests through `client`.
    #[inline]
    pub fn with_client<S: Into<String>>(client: Client, base_url: S) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').into(),
        }
    }

    /// Returns the base URL requests are sent to.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetches the latest rate of `target` for one unit of `base`.
    ///
    /// Currency codes are trimmed and upper-cased, any other validation is
    /// left to the service.
    pub async fn latest(
        &self,
        base: &str,
        target: &str,
    ) -> Result<RateQuote, Error> {
        let base = normalize_code(base);
        let target = normalize_code(target);

        let url = Url::parse_with_params(
            &format!("{}/latest", self.base_url),
            &[("base", base.as_str()), ("symbols", target.as_str())],
        )
        .map_err(|err| {
            Error::transport(format!("invalid rate service URL: {err}"))
        })?;
        debug!("fetching {url}");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|err| Error::transport(format!("{err}")))?;
        let body = resp
            .text()
            .await
            .map_err(|err| Error::transport(format!("{err}")))?;

        parse_latest(&body, base, target)
    }

    /// Converts `amount` of `base` into `target` at the latest rate.
    pub async fn convert(
        &self,
        base: &str,
        target: &str,
        amount: f64,
    ) -> Result<Conversion, Error> {
        let quote = self.latest(base, target).await?;
        let converted = amount * quote.rate;
        Ok(Conversion {
            quote,
            amount,
            converted,
        })
    }
}

#[inline]
fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[derive(Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default)]
    date: Option<String>,
}

fn parse_latest(
    body: &str,
    base: String,
    target: String,
) -> Result<RateQuote, Error> {
    let unexpected =
        || Error::data(format!("Unexpected API response: {}", body.trim()));

    let latest: LatestResponse =
        serde_json::from_str(body).map_err(|_| unexpected())?;
    let (Some(rate), Some(date)) = (latest.rates.get(&target), latest.date)
    else {
        warn!("no {target} rate in the response");
        return Err(unexpected());
    };
    Ok(RateQuote {
        base,
        target,
        rate: *rate,
        date,
    })
}

/// The rate of one currency against another, as published on a date.
#[derive(Clone, Debug, PartialEq)]
pub struct RateQuote {
    /// The base currency code.
    pub base: String,
    /// The target currency code.
    pub target: String,
    /// How many `target` units one `base` unit buys.
    pub rate: f64,
    /// The publication date of the rate, as given by the service.
    pub date: String,
}

/// An amount converted at a quoted rate.
///
/// The `Display` form is the message handed back to the model.
#[derive(Clone, Debug, PartialEq)]
pub struct Conversion {
    /// The rate that was used.
    pub quote: RateQuote,
    /// The amount in the base currency.
    pub amount: f64,
    /// The amount in the target currency, unrounded.
    pub converted: f64,
}

impl Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let RateQuote {
            base,
            target,
            rate,
            date,
        } = &self.quote;
        write!(
            f,
            "{} {base} = {:.2} {target} (Rate: 1 {base} = {rate} {target}, as of {date})",
            self.amount, self.converted
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_latest() {
        let body = r#"{"amount":1.0,"base":"USD","date":"2024-01-01","rates":{"EUR":0.9}}"#;
        let quote =
            parse_latest(body, "USD".to_owned(), "EUR".to_owned()).unwrap();
        assert_eq!(quote.rate, 0.9);
        assert_eq!(quote.date, "2024-01-01");
    }

    #[test]
    fn test_parse_latest_missing_rate() {
        let body = r#"{"date":"2024-01-01","rates":{"GBP":0.8}}"#;
        let err = parse_latest(body, "USD".to_owned(), "EUR".to_owned())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().starts_with("Data error: "));
        assert!(err.to_string().contains("GBP"));

        let err = parse_latest("not json", "USD".to_owned(), "EUR".to_owned())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);

        let body = r#"{"rates":{"EUR":0.9}}"#;
        let err = parse_latest(body, "USD".to_owned(), "EUR".to_owned())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn test_conversion_message() {
        let conversion = Conversion {
            quote: RateQuote {
                base: "USD".to_owned(),
                target: "JPY".to_owned(),
                rate: 151.37,
                date: "2024-03-28".to_owned(),
            },
            amount: 12.5,
            converted: 12.5 * 151.37,
        };
        assert_eq!(
            conversion.to_string(),
            "12.5 USD = 1892.13 JPY (Rate: 1 USD = 151.37 JPY, as of 2024-03-28)"
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = RateClient::new("http://localhost:8080/v1/");
        assert_eq!(client.base_url(), "http://localhost:8080/v1");
        assert_eq!(normalize_code(" eur "), "EUR");
    }
}
