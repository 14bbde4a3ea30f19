/// Messages exchanged between the popup, content scripts and the background service
use crate::session::{CheckUrlResponse, Snapshot};
use serde::{Deserialize, Serialize};

/// Requests accepted by the background service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    StartFocus {
        /// URL of the active tab, if the sender knows it
        #[serde(default)]
        url: Option<String>,
    },
    StopFocus,
    ResetProgress,
    GetState {
        #[serde(default)]
        url: Option<String>,
    },
    CheckUrl {
        url: String,
    },
    #[serde(alias = "reloadUrls")]
    ReloadDomains,
    AddDomain {
        domain: String,
    },
    RemoveDomain {
        domain: String,
    },
    SetLongBreak {
        minutes: u32,
    },
}

/// Replies sent back to the requester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Ack { success: bool },
    State(Snapshot),
    Check(CheckUrlResponse),
}

impl Response {
    pub fn ack(success: bool) -> Response {
        Response::Ack { success }
    }
}
