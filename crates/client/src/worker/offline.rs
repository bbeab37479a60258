//! Responses synthesized when neither network nor cache can answer.

use railbook_core::ResponseSnapshot;

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Offline - RailBook</title>
  <style>
    body { font-family: Arial, sans-serif; display: flex; align-items: center; justify-content: center;
           height: 100vh; margin: 0; background: #f5f5f5; text-align: center; padding: 20px; }
    .offline-container { background: white; padding: 40px; border-radius: 12px;
                         box-shadow: 0 4px 20px rgba(0,0,0,0.1); }
    h1 { color: #9370DB; margin-bottom: 20px; }
    p { color: #666; line-height: 1.6; }
    button { background: #9370DB; color: white; border: none; padding: 12px 30px;
             border-radius: 25px; font-size: 16px; cursor: pointer; margin-top: 20px; }
  </style>
</head>
<body>
  <div class="offline-container">
    <h1>You're Offline</h1>
    <p>No internet connection detected.<br>Please check your connection and try again.</p>
    <button onclick="location.reload()">Retry</button>
  </div>
</body>
</html>
"#;

/// Offline document for navigation requests.
pub fn offline_page() -> ResponseSnapshot {
    ResponseSnapshot::new(503, OFFLINE_PAGE)
        .with_status_text("Service Unavailable")
        .with_header("content-type", "text/html; charset=utf-8")
        .with_header("cache-control", "no-store")
}

/// Placeholder for a static asset that is neither cached nor reachable.
pub fn asset_unavailable() -> ResponseSnapshot {
    ResponseSnapshot::new(503, "Asset not available offline").with_header("content-type", "text/plain; charset=utf-8")
}

/// Placeholder for a data-backend call made while offline.
pub fn api_unavailable() -> ResponseSnapshot {
    ResponseSnapshot::new(503, r#"{"error":"offline"}"#)
        .with_header("content-type", "application/json")
        .with_header("cache-control", "no-store")
}
