// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Protective-session state.
//
// Navigation is only gated while a protective (VPN) session is connected.
// The tunnel itself lives elsewhere; this module just tracks its status.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

// ---------------------------------------------------------------------------
// ProtectionState trait
// ---------------------------------------------------------------------------

/// Answers whether the protective session is currently active.
pub trait ProtectionState: Send + Sync {
    fn is_active(&self) -> bool;
}

// ---------------------------------------------------------------------------
// VpnSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnStatus {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

impl VpnStatus {
    fn to_u8(self) -> u8 {
        match self {
            VpnStatus::Disconnected => 0,
            VpnStatus::Connecting => 1,
            VpnStatus::Connected => 2,
            VpnStatus::Disconnecting => 3,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => VpnStatus::Connecting,
            2 => VpnStatus::Connected,
            3 => VpnStatus::Disconnecting,
            _ => VpnStatus::Disconnected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VpnStatus::Disconnected => "disconnected",
            VpnStatus::Connecting => "connecting",
            VpnStatus::Connected => "connected",
            VpnStatus::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for VpnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status tracker for the VPN tunnel. Starts `Disconnected`.
#[derive(Debug)]
pub struct VpnSession {
    status: AtomicU8,
}

impl VpnSession {
    pub fn new() -> Self {
        Self::with_status(VpnStatus::Disconnected)
    }

    pub fn with_status(status: VpnStatus) -> Self {
        Self {
            status: AtomicU8::new(status.to_u8()),
        }
    }

    pub fn status(&self) -> VpnStatus {
        VpnStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: VpnStatus) {
        let previous = VpnStatus::from_u8(self.status.swap(status.to_u8(), Ordering::AcqRel));
        if previous != status {
            tracing::info!(from = %previous, to = %status, "protective session status changed");
        }
    }

    pub fn connect_start(&self) {
        self.set_status(VpnStatus::Connecting);
    }

    pub fn connect_success(&self) {
        self.set_status(VpnStatus::Connected);
    }

    pub fn connect_failure(&self) {
        self.set_status(VpnStatus::Disconnected);
    }

    pub fn disconnect_start(&self) {
        self.set_status(VpnStatus::Disconnecting);
    }

    pub fn disconnect_success(&self) {
        self.set_status(VpnStatus::Disconnected);
    }
}

impl Default for VpnSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtectionState for VpnSession {
    fn is_active(&self) -> bool {
        self.status() == VpnStatus::Connected
    }
}
