/// FocusBrowse - Pomodoro focus sessions for Chrome
/// Built with Rust + WASM + Yew

mod background;
mod content;
pub mod domain;
pub mod error;
pub mod machine;
pub mod notify;
pub mod overlay;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod ui;

use wasm_bindgen::prelude::*;

pub use background::{FocusService, PopupSubscription, init_focus_service};
pub use content::PageNudges;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Re-export domain matching for JavaScript access
#[wasm_bindgen]
pub fn is_in_scope(url: &str, domains: JsValue) -> Result<bool, JsValue> {
    let domains: Vec<String> = serde_wasm_bindgen::from_value(domains)
        .map_err(|e| JsValue::from_str(&format!("Invalid domain list: {}", e)))?;
    Ok(domain::is_in_scope(url, &domains))
}

#[wasm_bindgen]
pub fn normalize_domain(raw: &str) -> Option<String> {
    domain::normalize_domain(raw)
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}
