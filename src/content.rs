/// Content script handle around the page nudge logic
use crate::error::ProtocolError;
use crate::notify::Push;
use crate::overlay::{Banner, PageState};
use crate::session::CheckUrlResponse;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
#[derive(Default)]
pub struct PageNudges {
    page: PageState,
}

#[wasm_bindgen]
impl PageNudges {
    #[wasm_bindgen(constructor)]
    pub fn new() -> PageNudges {
        PageNudges::default()
    }

    /// Take the reply to a `checkUrl` request. Returns true when the page must be redrawn.
    pub fn apply_check(&mut self, response: JsValue) -> Result<bool, JsValue> {
        let response: CheckUrlResponse = serde_wasm_bindgen::from_value(response)
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
        Ok(self.page.apply(PageState::from(response)))
    }

    /// Take an `updateState` or `updateTimer` push
    pub fn apply_push(&mut self, message: JsValue) -> Result<bool, JsValue> {
        let push: Push = serde_wasm_bindgen::from_value(message)
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
        Ok(self.page.apply_push(&push))
    }

    pub fn local_tick(&mut self) -> bool {
        self.page.local_tick()
    }

    /// What to draw: `{dim, banner, mug}`
    pub fn effects(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.page.effects())
            .map_err(|e| ProtocolError::Encode(e.to_string()).into())
    }

    /// Banner line, icon first, if one should be shown
    pub fn banner_text(&self) -> Option<String> {
        self.page.effects().banner.map(Banner::line)
    }
}
