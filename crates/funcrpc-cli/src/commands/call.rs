//! `funcrpc call` / `funcrpc methods`: Talk to a running server.

use super::print_json;

/// Send one JSON-RPC request to `url` and print the response.
pub async fn call(url: &str, method: &str, params_str: &str) -> Result<(), String> {
    let params: serde_json::Value =
        serde_json::from_str(params_str).map_err(|e| format!("Invalid JSON params: {}", e))?;

    let request = serde_json::json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params
    });
    tracing::debug!(%url, %method, "sending request");

    let response: serde_json::Value = reqwest::Client::new()
        .post(url)
        .json(&request)
        .send()
        .await
        .map_err(|e| format!("Request to {} failed: {}", url, e))?
        .json()
        .await
        .map_err(|e| format!("Invalid response from {}: {}", url, e))?;

    print_json(&response);
    if response.get("error").is_some() {
        return Err(format!("{} returned an error", method));
    }
    Ok(())
}

/// Print the method listing served at `GET /`.
pub async fn methods(url: &str) -> Result<(), String> {
    let listing: serde_json::Value = reqwest::get(url)
        .await
        .map_err(|e| format!("Request to {} failed: {}", url, e))?
        .json()
        .await
        .map_err(|e| format!("Invalid response from {}: {}", url, e))?;

    print_json(&listing);
    Ok(())
}
