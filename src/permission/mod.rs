//! Camera permission collaborator
//!
//! The controller only ever reads the permission status or asks for it to be
//! requested; it never sets it.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Camera authorization as reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Authorized,
    Denied,
    #[default]
    NotDetermined,
}

impl PermissionStatus {
    fn to_u8(self) -> u8 {
        match self {
            PermissionStatus::Authorized => 0,
            PermissionStatus::Denied => 1,
            PermissionStatus::NotDetermined => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => PermissionStatus::Authorized,
            1 => PermissionStatus::Denied,
            _ => PermissionStatus::NotDetermined,
        }
    }
}

/// Permission collaborator trait
#[async_trait::async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current status, without prompting
    fn check_status(&self) -> PermissionStatus;

    /// Prompt for access and wait for the answer
    async fn request_access(&self) -> PermissionStatus;
}

/// Configuration for [`StaticPermissions`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Status before any prompt has been answered
    pub initial: PermissionStatus,
    /// What a prompt resolves to
    pub prompt_answer: PermissionStatus,
    /// Simulated time the user takes to answer
    pub prompt_delay_ms: u64,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            initial: PermissionStatus::NotDetermined,
            prompt_answer: PermissionStatus::Authorized,
            prompt_delay_ms: 0,
        }
    }
}

/// Permission provider with a fixed prompt answer
///
/// Once a prompt has been answered the answer sticks, like a platform
/// permission store.
pub struct StaticPermissions {
    status: AtomicU8,
    prompt_answer: PermissionStatus,
    prompt_delay: Duration,
    requests: AtomicUsize,
}

impl StaticPermissions {
    pub fn new(config: &PermissionConfig) -> Self {
        Self {
            status: AtomicU8::new(config.initial.to_u8()),
            prompt_answer: config.prompt_answer,
            prompt_delay: Duration::from_millis(config.prompt_delay_ms),
            requests: AtomicUsize::new(0),
        }
    }

    /// Provider that is already authorized
    pub fn authorized() -> Self {
        Self::new(&PermissionConfig {
            initial: PermissionStatus::Authorized,
            ..PermissionConfig::default()
        })
    }

    /// Provider that has already been refused
    pub fn denied() -> Self {
        Self::new(&PermissionConfig {
            initial: PermissionStatus::Denied,
            prompt_answer: PermissionStatus::Denied,
            ..PermissionConfig::default()
        })
    }

    /// Provider whose prompt resolves to `answer`
    pub fn prompting(answer: PermissionStatus) -> Self {
        Self::new(&PermissionConfig {
            initial: PermissionStatus::NotDetermined,
            prompt_answer: answer,
            ..PermissionConfig::default()
        })
    }

    /// Change the stored status, e.g. when the user edits system settings
    pub fn set_status(&self, status: PermissionStatus) {
        self.status.store(status.to_u8(), Ordering::SeqCst);
    }

    /// Number of prompts issued so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PermissionProvider for StaticPermissions {
    fn check_status(&self) -> PermissionStatus {
        PermissionStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    async fn request_access(&self) -> PermissionStatus {
        self.requests.fetch_add(1, Ordering::SeqCst);
        info!("Requesting camera access");

        if !self.prompt_delay.is_zero() {
            tokio::time::sleep(self.prompt_delay).await;
        }

        // An unanswered prompt leaves the status undetermined
        if self.prompt_answer != PermissionStatus::NotDetermined {
            self.set_status(self.prompt_answer);
        }

        info!("Camera access answered: {:?}", self.prompt_answer);
        self.prompt_answer
    }
}
