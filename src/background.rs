/// Background service worker glue: Chrome-backed ports around the state machine
use crate::error::{DeliveryError, ProtocolError, StoreError};
use crate::machine::{Ports, SessionStateMachine, Ticker};
use crate::notify::{
    NotificationChannel, Notifier, Observer, ObserverId, ObserverRegistry, PhaseNotice, Push,
    StatusLight,
};
use crate::protocol::Request;
use crate::session::{SessionState, StateView, StatusMode, TimerConfig, TimerUpdate};
use crate::storage::{DOMAINS_KEY, PersistentStore, STATE_KEY, StorageData};
use serde::Deserialize;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

// Import JS bridge functions
#[wasm_bindgen(module = "/background.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(keys: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryTabs() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTab() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn sendTabMessage(tab_id: i32, message: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn postToStatusPage(page_url: &str, mode: u8) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    fn postToPort(port: &JsValue, message: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn showNotification(title: &str, message: &str) -> Result<(), JsValue>;

    fn startInterval(callback: &js_sys::Function, millis: u32) -> i32;

    fn stopInterval(handle: i32);
}

const TICK_MILLIS: u32 = 1000;

/// Tab as reported by `chrome.tabs.query`
#[derive(Debug, Clone, Deserialize)]
struct TabRef {
    #[serde(default)]
    id: Option<i32>,
    #[serde(default)]
    url: Option<String>,
}

/// chrome.storage.local, read once at startup and then mirrored in memory.
///
/// Writes update the mirror immediately and reach Chrome in the background.
pub struct ChromeStore {
    mirror: RefCell<StorageData>,
}

impl ChromeStore {
    pub async fn hydrate() -> ChromeStore {
        let data = match load_records().await {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Failed to read chrome.storage, starting empty: {}", e);
                StorageData::new()
            }
        };

        ChromeStore {
            mirror: RefCell::new(data),
        }
    }

    /// Apply a `chrome.storage.onChanged` event to the mirror
    pub fn storage_changed(&self, key: &str, value: JsValue) -> Result<(), StoreError> {
        if key != DOMAINS_KEY {
            return Ok(());
        }

        let domains: Option<Vec<String>> =
            serde_wasm_bindgen::from_value(value).map_err(|e| StoreError::Corrupt {
                key: DOMAINS_KEY,
                details: e.to_string(),
            })?;
        self.mirror.borrow_mut().focus_urls = domains;
        Ok(())
    }

    fn write(&self, key: &'static str, value: JsValue) {
        spawn_local(async move {
            if let Err(e) = setStorage(key, value).await {
                log::warn!("Failed to write {}: {}", key, js_error_text(&e));
            }
        });
    }
}

impl PersistentStore for ChromeStore {
    fn load(&self) -> Result<StorageData, StoreError> {
        Ok(self.mirror.borrow().clone())
    }

    fn save_state(&self, state: &SessionState) -> Result<(), StoreError> {
        let value = serde_wasm_bindgen::to_value(state).map_err(|e| StoreError::Serialize {
            key: STATE_KEY,
            details: e.to_string(),
        })?;
        self.mirror.borrow_mut().state = Some(state.clone());
        self.write(STATE_KEY, value);
        Ok(())
    }

    fn save_domains(&self, domains: &[String]) -> Result<(), StoreError> {
        let value = serde_wasm_bindgen::to_value(domains).map_err(|e| StoreError::Serialize {
            key: DOMAINS_KEY,
            details: e.to_string(),
        })?;
        self.mirror.borrow_mut().focus_urls = Some(domains.to_vec());
        self.write(DOMAINS_KEY, value);
        Ok(())
    }
}

async fn load_records() -> Result<StorageData, StoreError> {
    let keys = serde_wasm_bindgen::to_value(&[STATE_KEY, DOMAINS_KEY])
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    let records = getStorage(keys)
        .await
        .map_err(|e| StoreError::Unavailable(js_error_text(&e)))?;

    if records.is_null() || records.is_undefined() {
        return Ok(StorageData::new());
    }

    serde_wasm_bindgen::from_value(records).map_err(|e| StoreError::Corrupt {
        key: STATE_KEY,
        details: e.to_string(),
    })
}

/// Pushes to content scripts through `chrome.tabs.sendMessage`, and to open popups
/// through their `chrome.runtime.Port`
pub struct ChromeTabsChannel {
    popups: Rc<RefCell<ObserverRegistry>>,
}

impl ChromeTabsChannel {
    pub fn new(popups: Rc<RefCell<ObserverRegistry>>) -> Self {
        ChromeTabsChannel { popups }
    }

    fn with_popups(&self, send: impl FnOnce(&mut ObserverRegistry)) {
        match self.popups.try_borrow_mut() {
            Ok(mut popups) => send(&mut popups),
            Err(_) => log::debug!("Popup registry busy, skipping push"),
        }
    }
}

impl NotificationChannel for ChromeTabsChannel {
    fn broadcast_full(&mut self, view: &StateView) {
        self.with_popups(|popups| popups.broadcast_full(view));

        let view = view.clone();
        spawn_local(async move {
            let tabs = match tabs_from(queryTabs().await) {
                Ok(tabs) => tabs,
                Err(e) => {
                    log::warn!("Failed to list tabs: {}", e);
                    return;
                }
            };

            log::debug!("Broadcasting state to {} tabs", tabs.len());
            for tab in tabs {
                let Some(id) = tab.id else {
                    continue;
                };
                let push = Push::UpdateState {
                    state: view.snapshot_for(tab.url.as_deref()),
                };
                spawn_local(async move {
                    if let Err(e) = deliver(id, &push).await {
                        log::debug!("Tab {} missed state update: {}", id, e);
                    }
                });
            }
        });
    }

    fn broadcast_timer_only(&mut self, update: &TimerUpdate) {
        self.with_popups(|popups| popups.broadcast_timer_only(update));

        let push = Push::UpdateTimer { timer: *update };
        spawn_local(async move {
            let Some(id) = active_tab().await.and_then(|tab| tab.id) else {
                return;
            };
            if let Err(e) = deliver(id, &push).await {
                log::debug!("Tab {} missed timer update: {}", id, e);
            }
        });
    }
}

async fn deliver(tab_id: i32, push: &Push) -> Result<(), DeliveryError> {
    let message =
        serde_wasm_bindgen::to_value(push).map_err(|e| DeliveryError::Rejected(e.to_string()))?;

    sendTabMessage(tab_id, message).await.map_err(|e| {
        let text = js_error_text(&e);
        if text.contains("Receiving end does not exist") {
            DeliveryError::Disconnected
        } else {
            DeliveryError::Rejected(text)
        }
    })
}

fn tabs_from(result: Result<JsValue, JsValue>) -> Result<Vec<TabRef>, String> {
    let tabs_js = result.map_err(|e| js_error_text(&e))?;
    serde_wasm_bindgen::from_value(tabs_js).map_err(|e| format!("Failed to parse tabs: {:?}", e))
}

async fn active_tab() -> Option<TabRef> {
    match queryActiveTab().await {
        Ok(tab) if !tab.is_null() && !tab.is_undefined() => serde_wasm_bindgen::from_value(tab)
            .map_err(|e| log::debug!("Failed to parse active tab: {:?}", e))
            .ok(),
        Ok(_) => None,
        Err(e) => {
            log::debug!("Failed to query active tab: {}", js_error_text(&e));
            None
        }
    }
}

/// An open popup, reached through the port it connected with
struct PortObserver {
    port: JsValue,
}

impl Observer for PortObserver {
    fn url(&self) -> Option<String> {
        None
    }

    fn deliver(&self, push: &Push) -> Result<(), DeliveryError> {
        let message = serde_wasm_bindgen::to_value(push)
            .map_err(|e| DeliveryError::Rejected(e.to_string()))?;

        postToPort(&self.port, message).map_err(|e| {
            let text = js_error_text(&e);
            if text.contains("disconnected port") {
                DeliveryError::Disconnected
            } else {
                DeliveryError::Rejected(text)
            }
        })
    }
}

/// Keeps a popup registered. Free it when the port disconnects.
#[wasm_bindgen]
pub struct PopupSubscription {
    id: ObserverId,
    registry: Weak<RefCell<ObserverRegistry>>,
    _observer: Rc<PortObserver>,
}

impl Drop for PopupSubscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        match registry.try_borrow_mut() {
            Ok(mut registry) => {
                registry.unregister(self.id);
            }
            Err(_) => log::debug!("Popup registry busy, {:?} will be pruned later", self.id),
        }
    }
}

/// Posts the mode code into the status page tab, if one is open
pub struct ChromeStatusLight {
    page_url: String,
}

impl ChromeStatusLight {
    pub fn new(page_url: impl Into<String>) -> Self {
        ChromeStatusLight {
            page_url: page_url.into(),
        }
    }
}

impl StatusLight for ChromeStatusLight {
    fn send_mode(&self, mode: StatusMode) {
        let page_url = self.page_url.clone();
        spawn_local(async move {
            if let Err(e) = postToStatusPage(&page_url, mode.code()).await {
                log::debug!("Status page not updated: {}", js_error_text(&e));
            }
        });
    }
}

/// `chrome.notifications` desktop notices
pub struct ChromeNotifier;

impl Notifier for ChromeNotifier {
    fn notify(&self, notice: &PhaseNotice) {
        log::info!("{}: {}", notice.title, notice.message);
        let notice = notice.clone();
        spawn_local(async move {
            if let Err(e) = showNotification(&notice.title, &notice.message).await {
                log::warn!("Failed to show notification: {}", js_error_text(&e));
            }
        });
    }
}

/// `setInterval` ticker. Holds the machine weakly so the interval never keeps it alive.
pub struct IntervalTicker {
    machine: Weak<RefCell<SessionStateMachine>>,
    running: Option<(i32, Closure<dyn FnMut()>)>,
}

impl IntervalTicker {
    pub fn new(machine: Weak<RefCell<SessionStateMachine>>) -> Self {
        IntervalTicker {
            machine,
            running: None,
        }
    }
}

impl Ticker for IntervalTicker {
    fn start(&mut self) {
        self.cancel();

        let machine = self.machine.clone();
        let callback = Closure::wrap(Box::new(move || {
            let Some(machine) = machine.upgrade() else {
                return;
            };
            match machine.try_borrow_mut() {
                Ok(mut machine) => machine.tick(),
                Err(_) => log::debug!("Session busy, skipping tick"),
            }
        }) as Box<dyn FnMut()>);

        let handle = startInterval(callback.as_ref().unchecked_ref(), TICK_MILLIS);
        self.running = Some((handle, callback));
    }

    fn cancel(&mut self) {
        if let Some((handle, _callback)) = self.running.take() {
            stopInterval(handle);
        }
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Handle owned by the service worker script
#[wasm_bindgen]
pub struct FocusService {
    machine: Rc<RefCell<SessionStateMachine>>,
    store: Rc<ChromeStore>,
    popups: Rc<RefCell<ObserverRegistry>>,
}

/// Load stored state and build the service. `config` may be `undefined`.
#[wasm_bindgen]
pub async fn init_focus_service(config: JsValue) -> Result<FocusService, JsValue> {
    let config: TimerConfig = if config.is_null() || config.is_undefined() {
        TimerConfig::default()
    } else {
        serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("Invalid timer config: {}", e)))?
    };

    let store = Rc::new(ChromeStore::hydrate().await);
    let popups = Rc::new(RefCell::new(ObserverRegistry::new()));
    let status_page_url = config.status_page_url.clone();

    let machine = Rc::new_cyclic(|weak: &Weak<RefCell<SessionStateMachine>>| {
        let ports = Ports {
            store: Box::new(store.clone()),
            channel: Box::new(ChromeTabsChannel::new(popups.clone())),
            status: Box::new(ChromeStatusLight::new(status_page_url)),
            notifier: Box::new(ChromeNotifier),
            ticker: Box::new(IntervalTicker::new(weak.clone())),
        };
        RefCell::new(SessionStateMachine::restore(config, ports))
    });

    Ok(FocusService {
        machine,
        store,
        popups,
    })
}

#[wasm_bindgen]
impl FocusService {
    /// Handle one `chrome.runtime.onMessage` request and return the reply
    pub fn handle_message(&self, message: JsValue) -> Result<JsValue, JsValue> {
        let request: Request = serde_wasm_bindgen::from_value(message)
            .map_err(|e| ProtocolError::Decode(e.to_string()))?;
        log::debug!("Request {:?}", request);

        let response = self
            .machine
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Session is busy"))?
            .handle(request, js_sys::Date::now());

        serde_wasm_bindgen::to_value(&response).map_err(|e| ProtocolError::Encode(e.to_string()).into())
    }

    /// Register a popup's `chrome.runtime.Port` for pushed updates
    pub fn connect_popup(&self, port: JsValue) -> Result<PopupSubscription, JsValue> {
        let observer = Rc::new(PortObserver { port });
        let id = self
            .popups
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Popup registry is busy"))?
            .register(&observer);
        log::debug!("Popup connected as {:?}", id);

        Ok(PopupSubscription {
            id,
            registry: Rc::downgrade(&self.popups),
            _observer: observer,
        })
    }

    /// The active tab changed or finished loading
    pub fn tab_activated(&self, url: &str) -> Result<(), JsValue> {
        self.machine
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Session is busy"))?
            .active_tab_changed(url);
        Ok(())
    }

    /// Forward a `chrome.storage.onChanged` entry
    pub fn storage_changed(&self, key: &str, value: JsValue) -> Result<(), JsValue> {
        self.store
            .storage_changed(key, value)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn is_running(&self) -> bool {
        self.machine
            .try_borrow()
            .map(|machine| machine.state().focus_mode_active)
            .unwrap_or(false)
    }

    /// Stop the countdown and flush state before the worker goes away
    pub fn shutdown(&self) -> Result<(), JsValue> {
        self.machine
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Session is busy"))?
            .shutdown();
        Ok(())
    }
}

fn js_error_text(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value))
}
