use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// GET a listing page and return its body. Non-2xx statuses are errors.
pub fn fetch_listing(
    url: &str,
    headers: &BTreeMap<String, String>,
    verify_tls: bool,
) -> Result<String> {
    let mut body = Vec::new();
    let mut easy = curl::easy::Easy::new();
    easy.url(url).context("invalid URL")?;
    easy.follow_location(true)?;
    easy.connect_timeout(Duration::from_secs(15))?;
    easy.timeout(Duration::from_secs(60))?;
    easy.ssl_verify_peer(verify_tls)?;
    easy.ssl_verify_host(verify_tls)?;
    // Listings are HTML and compress well.
    easy.accept_encoding("")?;

    let mut list = curl::easy::List::new();
    for (k, v) in headers {
        list.append(&format!("{}: {}", k.trim(), v.trim()))?;
    }
    if !headers.is_empty() {
        easy.http_headers(list)?;
    }

    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer
            .perform()
            .with_context(|| format!("GET {} failed", url))?;
    }

    let code = easy.response_code().context("no response code")?;
    if !(200..300).contains(&code) {
        bail!("GET {} returned HTTP {}", url, code);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
