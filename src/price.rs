//! Price quote client. One GET against the CoinGecko simple-price endpoint
//! for the fixed SOL/USD pair; any failure degrades to a zero price rather
//! than surfacing an error of its own.

use anyhow::{anyhow, Result};
use serde::Deserialize;

pub const QUOTE_ENDPOINT: &str = "https://api.coingecko.com/api/v3/simple/price";
const ASSET_ID: &str = "solana";
const QUOTE_CURRENCY: &str = "usd";

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    solana: Option<CurrencyQuote>,
}

#[derive(Debug, Deserialize)]
struct CurrencyQuote {
    usd: Option<f64>,
}

pub struct PriceClient {
    http: reqwest::Client,
    endpoint: String,
}

impl PriceClient {
    pub fn new() -> Self {
        Self::with_endpoint(QUOTE_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }

    /// Current USD price for one SOL, or `0.0` when the quote cannot be
    /// fetched. "Price unknown" and "price is zero" are deliberately not
    /// distinguished.
    pub async fn sol_usd(&self) -> f64 {
        self.fetch().await.unwrap_or(0.0)
    }

    async fn fetch(&self) -> Result<f64> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[("ids", ASSET_ID), ("vs_currencies", QUOTE_CURRENCY)])
            .send()
            .await?
            .error_for_status()?;
        let quote: QuoteResponse = response.json().await?;
        quote
            .solana
            .and_then(|currencies| currencies.usd)
            .ok_or_else(|| anyhow!("quote missing from response"))
    }
}

impl Default for PriceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes()).await;
        });
        format!("http://{}/simple/price", addr)
    }

    #[tokio::test]
    async fn parses_the_quote_shape() {
        let endpoint = serve_once(r#"{"solana":{"usd":142.35}}"#).await;
        let client = PriceClient::with_endpoint(endpoint);
        assert_eq!(client.sol_usd().await, 142.35);
    }

    #[tokio::test]
    async fn missing_quote_degrades_to_zero() {
        let endpoint = serve_once(r#"{}"#).await;
        let client = PriceClient::with_endpoint(endpoint);
        assert_eq!(client.sol_usd().await, 0.0);
    }

    #[tokio::test]
    async fn unreachable_endpoint_degrades_to_zero() {
        let client = PriceClient::with_endpoint("http://127.0.0.1:1/simple/price");
        assert_eq!(client.sol_usd().await, 0.0);
    }
}
