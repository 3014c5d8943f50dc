//! Management command types for the sitewardend protocol
//!
//! The options/popup UI speaks these over the same bridge channel as the
//! browser events.

use serde::{Deserialize, Serialize};

use crate::{Domain, LimitView, StatsEntry, TrackerSnapshot, API_VERSION};

/// Request wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request ID for correlation
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// The command
    pub command: Command,
}

impl Request {
    pub fn new(request_id: u64, command: Command) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            command,
        }
    }
}

/// Response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Corresponding request ID
    pub request_id: u64,
    /// API version
    pub api_version: u32,
    /// Response payload or error
    pub result: ResponseResult,
}

impl Response {
    pub fn success(request_id: u64, payload: ResponsePayload) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Ok(payload),
        }
    }

    pub fn error(request_id: u64, error: ErrorInfo) -> Self {
        Self {
            request_id,
            api_version: API_VERSION,
            result: ResponseResult::Err(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseResult {
    Ok(ResponsePayload),
    Err(ErrorInfo),
}

/// Error information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Error codes for the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidRequest,
    InvalidSite,
    InvalidLimit,
    RuleNotFound,
    StoreError,
    InternalError,
}

/// All possible commands from management UIs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Get the current tracker state
    GetState,

    /// List all block and time-limit rules
    ListRules,

    /// Get today's usage report
    GetStats,

    /// Add a site to the permanent block list.
    /// The site string is normalized before use.
    AddBlockedSite { site: String },

    /// Remove a site from the permanent block list
    RemoveBlockedSite { site: String },

    /// Set (or replace) a daily time limit for a site, in minutes
    SetTimeLimit { site: String, minutes: u32 },

    /// Remove a site's time limit
    RemoveTimeLimit { site: String },

    /// Clear today's usage counters
    ResetStats,

    /// Ask the browser to open the extension's options page
    OpenManagementPage,

    /// Ping for keepalive
    Ping,
}

/// Response payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePayload {
    /// Command applied, nothing to report
    Ack,
    State(TrackerSnapshot),
    Rules {
        blocked: Vec<Domain>,
        limits: Vec<LimitView>,
    },
    Stats {
        entries: Vec<StatsEntry>,
    },
    Pong,
}
