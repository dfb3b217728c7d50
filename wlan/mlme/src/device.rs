// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::error::Error;
use wlan_common::{
    ie::{EdcaParamSet, HtCapabilities, SupportedRate, VhtCapabilities},
    mac::{Aid, AuthAlgorithm, CapabilityInfo, MacAddr, ReasonCode, StatusCode, WlanChannel},
};

#[cfg(test)]
pub use test_utils::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    PostAssoc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanId(pub u64);

/// BSS configuration pushed to the firmware after a successful (re)association
/// or prepared ahead of an FT reassociation.
#[derive(Debug, Clone, PartialEq)]
pub struct AddBssRequest {
    pub bssid: MacAddr,
    pub channel: WlanChannel,
    pub beacon_period: u16,
    pub cap: CapabilityInfo,
    pub rates: Vec<SupportedRate>,
    pub edca: EdcaParamSet,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub short_preamble: bool,
    pub protection_on: bool,
}

/// In-place reconfiguration of the already-added BSS. Used for same-BSS
/// reassociation so admitted TSPECs survive.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateBssRequest {
    pub bssid: MacAddr,
    pub cap: CapabilityInfo,
    pub edca: EdcaParamSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddStaRequest {
    pub peer: MacAddr,
    pub aid: Aid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuthFrameTx {
    pub peer: MacAddr,
    pub algorithm: AuthAlgorithm,
    pub transaction_seq: u16,
    pub status: StatusCode,
    pub ft_ies: Option<Vec<u8>>,
}

/// The firmware/hardware bridge this engine drives. Calls are issued from the
/// single MLME dispatch thread; completions that matter re-enter as events.
pub trait DeviceOps {
    /// Returns the currently tuned channel.
    fn channel(&self) -> WlanChannel;
    /// Whether the radio is in a multi-channel concurrency state.
    fn mcc_active(&self) -> bool;
    /// Looks up this interface's own capability info from device config.
    fn self_capabilities(&self) -> Result<CapabilityInfo, Error>;
    /// Configures the BSS on the device after association.
    fn add_bss(&mut self, req: AddBssRequest) -> Result<(), Error>;
    /// Reconfigures the current BSS in place, preserving admitted flows.
    fn update_bss(&mut self, req: UpdateBssRequest) -> Result<(), Error>;
    /// Tears down the current BSS configuration.
    fn delete_bss(&mut self) -> Result<(), Error>;
    /// Re-adds the self STA entry under a new association ID.
    fn add_self_sta(&mut self, req: AddStaRequest) -> Result<(), Error>;
    /// Pushes EDCA parameters to the device queues.
    fn apply_edca_params(&mut self, edca: &EdcaParamSet) -> Result<(), Error>;
    fn set_link_state(&mut self, state: LinkState);
    /// Resets the power-management module's state for this interface.
    fn reset_power_save(&mut self);
    fn send_auth_frame(&mut self, frame: AuthFrameTx) -> Result<(), Error>;
    /// Best-effort advisory Disassociation to a peer; failures are ignored.
    fn send_disassoc_frame(&mut self, peer: MacAddr, reason: ReasonCode);
    /// Requests an off-channel dwell scoped to exactly one candidate.
    fn start_preauth_scan(&mut self, bssid: MacAddr, channel: WlanChannel)
        -> Result<ScanId, Error>;
    /// Terminates a scan and returns the radio to the operating channel.
    fn end_scan(&mut self, scan_id: ScanId);
    /// Tells the data path to drop any frames buffered for a peer.
    fn flush_peer_frames(&mut self, peer: MacAddr);
    /// Drops any cached pre-authentication node for a peer.
    fn delete_preauth_node(&mut self, peer: MacAddr);
}
