//! WebDriver capability payloads for the supported browsers.

use serde_json::{json, Map, Value};

/// Build the capability object for a session. Unknown browser names are
/// rejected here, before any connection attempt.
pub fn capabilities(
    browser: &str,
    headless: bool,
    window_size: (u32, u32),
) -> Result<Map<String, Value>, String> {
    let (width, height) = window_size;
    let mut caps = Map::new();
    match browser.to_lowercase().as_str() {
        "chrome" | "chromium" => {
            let mut args = vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
                format!("--window-size={},{}", width, height),
            ];
            if headless {
                args.push("--headless=new".to_string());
            }
            caps.insert("browserName".into(), json!("chrome"));
            caps.insert("goog:chromeOptions".into(), json!({ "args": args }));
        }
        "firefox" => {
            let mut args = vec![
                format!("--width={}", width),
                format!("--height={}", height),
            ];
            if headless {
                args.push("-headless".to_string());
            }
            caps.insert("browserName".into(), json!("firefox"));
            caps.insert("moz:firefoxOptions".into(), json!({ "args": args }));
        }
        other => return Err(format!("unsupported browser: {}", other)),
    }
    Ok(caps)
}
