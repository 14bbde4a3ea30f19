/// Popup UI for FocusBrowse

use yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use patternfly_yew::prelude::*;
use std::cell::RefCell;
use std::rc::Rc;
use crate::notify::Push;
use crate::protocol::{Request, Response};
use crate::session::Snapshot;
use crate::ui::components::{CycleProgress, TimerReadout};

// Import JS bridge functions
#[wasm_bindgen(module = "/popup.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn sendMessage(message: JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn queryActiveTabUrl() -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn openTab(url: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    fn connectPort(on_message: &js_sys::Function) -> Result<JsValue, JsValue>;

    fn disconnectPort(port: &JsValue);
}

const RESYNC_MILLIS: i32 = 5000;
const STATUS_PAGE_URL: &str = "https://mahirul101.github.io";

#[derive(Clone, PartialEq)]
enum ViewState {
    Loading,
    Idle,
    Error(String),
}

/// Rendered snapshot plus the latest copy pushes are folded into
#[derive(Clone)]
struct SnapshotCell {
    rendered: UseStateHandle<Option<Snapshot>>,
    latest: Rc<RefCell<Option<Snapshot>>>,
}

impl SnapshotCell {
    fn replace(&self, snapshot: Snapshot) {
        *self.latest.borrow_mut() = Some(snapshot.clone());
        self.rendered.set(Some(snapshot));
    }

    fn apply_push(&self, push: Push) {
        let next = {
            let mut latest = self.latest.borrow_mut();
            match push {
                Push::UpdateState { state } => *latest = Some(state),
                Push::UpdateTimer { timer } => {
                    if let Some(snapshot) = latest.as_mut() {
                        snapshot.apply_timer(&timer);
                    }
                }
            }
            latest.clone()
        };
        self.rendered.set(next);
    }
}

#[function_component(App)]
pub fn app() -> Html {
    let view = use_state(|| ViewState::Loading);
    let snapshot = SnapshotCell {
        rendered: use_state(|| None::<Snapshot>),
        latest: use_mut_ref(|| None::<Snapshot>),
    };
    let active_url = use_mut_ref(|| None::<String>);
    let domain_input = use_state(String::new);

    // Pushed updates from the background service
    {
        let snapshot = snapshot.clone();

        use_effect_with((), move |_| {
            let callback = Closure::wrap(Box::new(move |message: JsValue| {
                match serde_wasm_bindgen::from_value::<Push>(message) {
                    Ok(push) => snapshot.apply_push(push),
                    Err(e) => log::debug!("Ignoring unexpected push: {:?}", e),
                }
            }) as Box<dyn FnMut(JsValue)>);

            let port = connectPort(callback.as_ref().unchecked_ref())
                .map_err(|e| log::warn!("Failed to connect to background: {:?}", e))
                .ok();

            move || {
                if let Some(port) = port {
                    disconnectPort(&port);
                }
                drop(callback);
            }
        });
    }

    // Initial load, then a periodic resync while the popup is open
    {
        let view = view.clone();
        let snapshot = snapshot.clone();
        let active_url = active_url.clone();

        use_effect_with((), move |_| {
            {
                let view = view.clone();
                let snapshot = snapshot.clone();
                let active_url = active_url.clone();
                spawn_local(async move {
                    *active_url.borrow_mut() = current_tab_url().await;
                    refresh(view, snapshot, active_url).await;
                });
            }

            let callback = Closure::wrap(Box::new(move || {
                let view = view.clone();
                let snapshot = snapshot.clone();
                let active_url = active_url.clone();
                spawn_local(refresh(view, snapshot, active_url));
            }) as Box<dyn FnMut()>);

            let window = web_sys::window();
            let handle = window.as_ref().and_then(|w| {
                w.set_interval_with_callback_and_timeout_and_arguments_0(
                    callback.as_ref().unchecked_ref(),
                    RESYNC_MILLIS,
                )
                .ok()
            });

            move || {
                if let (Some(window), Some(handle)) = (window, handle) {
                    window.clear_interval_with_handle(handle);
                }
                drop(callback);
            }
        });
    }

    // Send a request, then pull fresh state
    let dispatch = {
        let view = view.clone();
        let snapshot = snapshot.clone();
        let active_url = active_url.clone();

        Callback::from(move |request: Request| {
            let view = view.clone();
            let snapshot = snapshot.clone();
            let active_url = active_url.clone();

            spawn_local(async move {
                match send_request(&request).await {
                    Ok(Response::Ack { success: false }) => {
                        log::debug!("Request {:?} was not applied", request);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        view.set(ViewState::Error(e));
                        return;
                    }
                }
                refresh(view, snapshot, active_url).await;
            });
        })
    };

    let on_start = {
        let dispatch = dispatch.clone();
        let active_url = active_url.clone();
        Callback::from(move |_| {
            let url = active_url.borrow().clone();
            dispatch.emit(Request::StartFocus { url });
        })
    };

    let on_stop = {
        let dispatch = dispatch.clone();
        Callback::from(move |_| dispatch.emit(Request::StopFocus))
    };

    let on_reset = {
        let dispatch = dispatch.clone();
        Callback::from(move |_| {
            let confirmed = web_sys::window()
                .and_then(|w| {
                    w.confirm_with_message(
                        "Reset all progress? This will reset the timer, completed sessions, and cycles.",
                    )
                    .ok()
                })
                .unwrap_or(false);
            if confirmed {
                dispatch.emit(Request::ResetProgress);
            }
        })
    };

    let on_domain_input = {
        let domain_input = domain_input.clone();
        Callback::from(move |e: InputEvent| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                domain_input.set(input.value());
            }
        })
    };

    let add_domain = {
        let dispatch = dispatch.clone();
        let domain_input = domain_input.clone();
        move || {
            let domain = domain_input.trim().to_string();
            if !domain.is_empty() {
                dispatch.emit(Request::AddDomain { domain });
            }
            domain_input.set(String::new());
        }
    };

    let on_add_click = {
        let add_domain = add_domain.clone();
        Callback::from(move |_| add_domain())
    };

    let on_domain_keypress = Callback::from(move |e: KeyboardEvent| {
        if e.key() == "Enter" {
            add_domain();
        }
    });

    let on_remove_domain = {
        let dispatch = dispatch.clone();
        Callback::from(move |domain: String| dispatch.emit(Request::RemoveDomain { domain }))
    };

    let on_long_break_change = {
        let dispatch = dispatch.clone();
        Callback::from(move |e: Event| {
            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                match input.value().trim().parse::<u32>() {
                    Ok(minutes) if minutes > 0 => dispatch.emit(Request::SetLongBreak { minutes }),
                    _ => log::debug!("Ignoring long break value {:?}", input.value()),
                }
            }
        })
    };

    let on_open_status_page = Callback::from(move |_| {
        spawn_local(async move {
            if let Err(e) = openTab(STATUS_PAGE_URL).await {
                log::warn!("Failed to open status page: {:?}", e);
            }
        });
    });

    html! {
        <div class="padding-20">
            <h1 class="popup-title">{"FocusBrowse"}</h1>

            // Status display
            {match &*view {
                ViewState::Loading => html! {
                    <div class="loading-text-center">
                        <Spinner />
                        <p class="loading-text">{"Loading session..."}</p>
                    </div>
                },
                ViewState::Error(err) => html! {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                            {err.clone()}
                        </Alert>
                    </div>
                },
                ViewState::Idle => html! {}
            }}

            if let Some(snap) = (*snapshot.rendered).clone() {
                <>
                <TimerReadout
                    phase={snap.phase}
                    seconds_remaining={snap.seconds_remaining}
                    total_seconds={snap.total_seconds_for_phase}
                    running={snap.focus_mode_active}
                />
                <CycleProgress
                    completed={snap.completed_focus_sessions}
                    per_cycle={snap.sessions_per_long_break}
                />

                <div class="flex-column-gap">
                    if snap.focus_mode_active {
                        <Button onclick={on_stop} variant={ButtonVariant::Secondary} block={true}>
                            {"Stop Focus"}
                        </Button>
                    } else {
                        <Button onclick={on_start} variant={ButtonVariant::Primary} block={true}>
                            {"Start Focus"}
                        </Button>
                    }
                    <Button onclick={on_reset} variant={ButtonVariant::Danger} block={true}>
                        {"Reset Progress"}
                    </Button>
                </div>

                <div class="stats-container">
                    <h2 class="stats-title">{"Focus Sites"}</h2>
                    <div class="domain-input-row">
                        <input
                            type="text"
                            placeholder="e.g. docs.rs"
                            value={(*domain_input).clone()}
                            oninput={on_domain_input}
                            onkeypress={on_domain_keypress}
                            class="search-input"
                        />
                        <Button onclick={on_add_click} variant={ButtonVariant::Secondary}>
                            {"Add"}
                        </Button>
                    </div>
                    if snap.focus_domains.is_empty() {
                        <p class="empty-state-hint">{"Every site counts as a distraction until you add one."}</p>
                    } else {
                        <div class="stats-box">
                            {for snap.focus_domains.iter().map(|domain| html! {
                                <DomainRow
                                    domain={domain.clone()}
                                    on_remove={on_remove_domain.clone()}
                                />
                            })}
                        </div>
                    }
                </div>

                <label class="long-break-setting">
                    {"Long break (minutes)"}
                    <input
                        type="number"
                        min="1"
                        value={snap.long_break_minutes.to_string()}
                        onchange={on_long_break_change}
                    />
                </label>
                </>
            }

            <p class="footer-popup">
                <Button onclick={on_open_status_page} variant={ButtonVariant::Link}>
                    {"Open status light page"}
                </Button>
            </p>
        </div>
    }
}

// Focus domain row component
#[derive(Properties, PartialEq)]
struct DomainRowProps {
    domain: String,
    on_remove: Callback<String>,
}

#[function_component(DomainRow)]
fn domain_row(props: &DomainRowProps) -> Html {
    let on_click = {
        let domain = props.domain.clone();
        let on_remove = props.on_remove.clone();
        Callback::from(move |_| on_remove.emit(domain.clone()))
    };

    html! {
        <div class="stat-item">
            <span class="stat-domain" title={props.domain.clone()}>{&props.domain}</span>
            <Button onclick={on_click} variant={ButtonVariant::Plain}>
                {"Remove"}
            </Button>
        </div>
    }
}

// Helper functions

async fn refresh(
    view: UseStateHandle<ViewState>,
    snapshot: SnapshotCell,
    active_url: Rc<RefCell<Option<String>>>,
) {
    let url = active_url.borrow().clone();
    match load_state(url).await {
        Ok(state) => {
            snapshot.replace(state);
            if *view != ViewState::Idle {
                view.set(ViewState::Idle);
            }
        }
        Err(e) => view.set(ViewState::Error(e)),
    }
}

async fn send_request(request: &Request) -> Result<Response, String> {
    let message = serde_wasm_bindgen::to_value(request)
        .map_err(|e| format!("Failed to serialize: {:?}", e))?;

    let reply = sendMessage(message)
        .await
        .map_err(|e| format!("Background service unavailable: {:?}", e))?;

    serde_wasm_bindgen::from_value(reply).map_err(|e| format!("Failed to parse reply: {:?}", e))
}

async fn load_state(url: Option<String>) -> Result<Snapshot, String> {
    match send_request(&Request::GetState { url }).await? {
        Response::State(snapshot) => Ok(snapshot),
        other => Err(format!("Unexpected reply to getState: {:?}", other)),
    }
}

async fn current_tab_url() -> Option<String> {
    match queryActiveTabUrl().await {
        Ok(url) => url.as_string(),
        Err(e) => {
            log::debug!("Failed to query active tab: {:?}", e);
            None
        }
    }
}
