// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Client (non-AP STA) MLME: association/reassociation response processing
//! and the FT pre-authentication controller.
//!
//! All processing for one interface is funneled through one ordered event
//! queue; nothing here is re-entered concurrently. The embedder calls
//! [`Session::on_assoc_rsp_frame`], [`Session::on_preauth_auth_rsp`],
//! [`Session::handle_scan_event`] and [`Session::handle_timeout`] from that
//! queue and drains [`SmeNotification`]s from the sink.

mod assoc;
mod frame;
pub mod ft;
mod peer;
#[cfg(test)]
mod test_utils;

pub use frame::{AssocRspFrame, AssocRspRecord, FrameParser, RspSubtype, TransferTarget};
pub use peer::{PeerDescriptor, PeerTable, StaType};

use crate::device::{DeviceOps, LinkState};
use ft::FtContext;
use log::info;
use std::time::Duration;
use wlan_common::{
    bss::BssDescription,
    ie::{EdcaParamSet, SupportedRate},
    mac::{Aid, AuthAlgorithm, CapabilityInfo, Cbw, MacAddr, StatusCode, WlanChannel},
    sink::UnboundedSink,
    timer::{EventId, Timer},
};

pub const ASSOC_FAILURE_TIMEOUT_MILLIS: u64 = 2000;
pub const REASSOC_FAILURE_TIMEOUT_MILLIS: u64 = 2000;
pub const PREAUTH_RESPONSE_TIMEOUT_MILLIS: u64 = 40;

/// Upper bound on FT IE bytes saved from an authentication response and
/// forwarded to SME. Larger payloads are treated as absent FT IEs.
pub const MAX_FT_IES_LEN: usize = 384;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Ap,
}

/// MLME state of one session, reduced to the subset this engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MlmeState {
    Idle,
    WtAssocRsp,
    WtReassocRsp,
    WtFtReassocRsp,
    WtAddBssRspFtReassoc,
    LinkEstablished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhyMode {
    Dot11A,
    Dot11B,
    Dot11G,
    Dot11N,
    Dot11Ac,
    Dot11Ax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Akm {
    Open,
    Psk,
    Eap,
    FtPsk,
    FtEap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimedEvent {
    AssociationFailure,
    ReassociationFailure,
    FtPreauthResponse,
}

/// Static per-interface knobs, fixed at construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub ht_supported: bool,
    pub vht_supported: bool,
    /// Disables VHT on 2.4 GHz even when the peer advertises it.
    pub vht_2g_disabled: bool,
    /// Fallback dot11 mode per band when the candidate advertises none of
    /// HE/VHT/HT.
    pub default_mode_2g: PhyMode,
    pub default_mode_5g: PhyMode,
    /// Interop accommodation: treat HT-capable peers as QoS-capable even
    /// without a WMM IE. See `peer::update_peer_from_rsp`.
    pub ht_implies_qos: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            ht_supported: true,
            vht_supported: true,
            vht_2g_disabled: true,
            default_mode_2g: PhyMode::Dot11G,
            default_mode_5g: PhyMode::Dot11A,
            ht_implies_qos: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocResultCode {
    Success,
    AssocRefused,
    InvalidAssocRspRxed,
    ResourcesUnavailable,
    TransferSta { bssid: MacAddr, channel: u8 },
    FtReassocFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreAuthStatus {
    Success,
    Failure,
}

/// Outcomes posted to the SME layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SmeNotification {
    AssocConf { result: AssocResultCode, status: StatusCode },
    ReassocConf { result: AssocResultCode, status: StatusCode },
    FtPreAuthRsp { status: PreAuthStatus, bssid: MacAddr, ft_ies: Vec<u8> },
}

pub type SmeSink = UnboundedSink<SmeNotification>;

/// Everything a session needs to act on the outside world. Owned by the
/// embedder's event loop and lent to each entry point.
pub struct Context<D> {
    pub config: ClientConfig,
    pub device: D,
    pub timer: Timer<TimedEvent>,
    pub parser: Box<dyn FrameParser>,
    pub peers: PeerTable,
    pub sme_sink: SmeSink,
}

/// One active or in-progress BSS association on a virtual interface.
pub struct Session {
    pub role: Role,
    pub state: MlmeState,
    /// BSSID this station is associated with (or joining).
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    /// Operating channel of this BSS.
    pub channel: WlanChannel,
    /// Transmit power for this BSS, dBm.
    pub tx_power: i8,
    /// Reassociation target; only meaningful in the WT_*REASSOC_RSP states.
    pub reassoc_bssid: Option<MacAddr>,
    pub aid: Option<Aid>,
    pub phy_mode: PhyMode,
    /// Rate set currently known for this BSS; backfills responses that omit
    /// the supported-rates IE.
    pub rates: Vec<SupportedRate>,
    pub edca: EdcaParamSet,
    pub default_edca: EdcaParamSet,
    /// Session is QoS (11e) capable.
    pub qos_enabled: bool,
    /// Session negotiated a WME association.
    pub wme_enabled: bool,
    pub wsm_enabled: bool,
    pub dot11h_enabled: bool,
    pub osen_connection: bool,
    /// ERP protection decision, derived on association success.
    pub erp_enabled: bool,
    pub akm: Akm,
    pub auth_type: AuthAlgorithm,
    pub is_11r: bool,
    pub ese_enabled: bool,
    pub fast_roam_enabled: bool,
    /// FT IEs of the existing connection, required to pre-authenticate with
    /// the FT algorithm.
    pub ft_ies: Option<Vec<u8>>,
    /// Firmware already performed the roam; host must not reassert FT state.
    pub roam_sync_in_progress: bool,
    pub sme_session_id: u64,
    pub local_power_constraint: i8,
    /// Capability info from the beacon cached at join time.
    pub join_beacon_cap: Option<CapabilityInfo>,
    /// Join request held while the exchange is in flight.
    pub pending_join_req: Option<Box<BssDescription>>,
    /// Last association response, stored on FT reassociation success; owned
    /// exclusively by this session.
    pub stored_assoc_rsp: Option<Box<AssocRspRecord>>,
    pub ric_data: Option<Vec<u8>>,
    pub assoc_failure_timeout: Option<EventId>,
    pub reassoc_failure_timeout: Option<EventId>,
    pub ft: FtContext,
}

impl Session {
    pub fn new(bssid: MacAddr) -> Self {
        Self {
            role: Role::Client,
            state: MlmeState::Idle,
            bssid,
            ssid: vec![],
            channel: WlanChannel::new(1, Cbw::Cbw20),
            tx_power: 0,
            reassoc_bssid: None,
            aid: None,
            phy_mode: PhyMode::Dot11G,
            rates: vec![],
            edca: EdcaParamSet::session_default(),
            default_edca: EdcaParamSet::session_default(),
            qos_enabled: false,
            wme_enabled: false,
            wsm_enabled: false,
            dot11h_enabled: false,
            osen_connection: false,
            erp_enabled: false,
            akm: Akm::Open,
            auth_type: AuthAlgorithm::OpenSystem,
            is_11r: false,
            ese_enabled: false,
            fast_roam_enabled: false,
            ft_ies: None,
            roam_sync_in_progress: false,
            sme_session_id: 0,
            local_power_constraint: 0,
            join_beacon_cap: None,
            pending_join_req: None,
            stored_assoc_rsp: None,
            ric_data: None,
            assoc_failure_timeout: None,
            reassoc_failure_timeout: None,
            ft: FtContext::default(),
        }
    }

    /// Whether any of the FT/CCX/LFR roaming features is active, which
    /// widens the set of acceptable reassociation wait states.
    pub fn roaming_features_active(&self) -> bool {
        self.is_11r || self.ese_enabled || self.fast_roam_enabled
    }

    pub fn arm_assoc_failure_timer<D: DeviceOps>(&mut self, ctx: &mut Context<D>) {
        let id = ctx.timer.schedule_after(
            Duration::from_millis(ASSOC_FAILURE_TIMEOUT_MILLIS),
            TimedEvent::AssociationFailure,
        );
        self.assoc_failure_timeout = Some(id);
    }

    pub fn arm_reassoc_failure_timer<D: DeviceOps>(&mut self, ctx: &mut Context<D>) {
        let id = ctx.timer.schedule_after(
            Duration::from_millis(REASSOC_FAILURE_TIMEOUT_MILLIS),
            TimedEvent::ReassociationFailure,
        );
        self.reassoc_failure_timeout = Some(id);
    }

    /// Stops the subtype-appropriate failure timer. Runs exactly once per
    /// processed frame, before any outcome branching, so a late duplicate
    /// cannot re-arm logic that depends on timer state.
    pub(crate) fn stop_failure_timer<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        subtype: RspSubtype,
    ) {
        let timeout = match subtype {
            RspSubtype::Assoc => self.assoc_failure_timeout.take(),
            RspSubtype::Reassoc => self.reassoc_failure_timeout.take(),
        };
        if let Some(id) = timeout {
            ctx.timer.cancel_event(id);
        }
    }

    pub fn handle_timeout<D: DeviceOps>(&mut self, ctx: &mut Context<D>, event_id: EventId) {
        match ctx.timer.triggered(&event_id) {
            Some(TimedEvent::FtPreauthResponse) => self.handle_preauth_timeout(ctx),
            Some(TimedEvent::AssociationFailure) => {
                self.assoc_failure_timeout = None;
                if self.state == MlmeState::WtAssocRsp {
                    info!("association response timed out");
                    self.state = MlmeState::Idle;
                    self.pending_join_req = None;
                    ctx.device.set_link_state(LinkState::Idle);
                    ctx.sme_sink.send(SmeNotification::AssocConf {
                        result: AssocResultCode::AssocRefused,
                        status: StatusCode::REFUSED,
                    });
                }
            }
            Some(TimedEvent::ReassociationFailure) => {
                self.reassoc_failure_timeout = None;
                match self.state {
                    MlmeState::WtFtReassocRsp => {
                        info!("FT reassociation response timed out");
                        self.state = MlmeState::Idle;
                        self.pending_join_req = None;
                        self.reassoc_bssid = None;
                        self.ft.cleanup();
                        ctx.device.set_link_state(LinkState::Idle);
                        ctx.sme_sink.send(SmeNotification::ReassocConf {
                            result: AssocResultCode::FtReassocFailure,
                            status: StatusCode::REFUSED,
                        });
                    }
                    MlmeState::WtReassocRsp => {
                        info!("reassociation response timed out");
                        self.restore_pre_reassoc_state(ctx);
                        ctx.sme_sink.send(SmeNotification::ReassocConf {
                            result: AssocResultCode::AssocRefused,
                            status: StatusCode::REFUSED,
                        });
                    }
                    _ => {}
                }
            }
            None => {}
        }
    }

    /// Destroys the session. Releases every FT allocation and any half-built
    /// FT target session, and settles any in-flight pre-auth attempt's scan
    /// and response timer so neither outlives the session.
    pub fn teardown<D: DeviceOps>(&mut self, ctx: &mut Context<D>) {
        if let Some(attempt) = self.ft.preauth.as_mut() {
            if let Some(id) = attempt.timeout.take() {
                ctx.timer.cancel_event(id);
            }
            if let Some(id) = attempt.scan_id.take() {
                ctx.device.end_scan(id);
            }
        }
        self.ft.cleanup_on_teardown();
        if let Some(id) = self.assoc_failure_timeout.take() {
            ctx.timer.cancel_event(id);
        }
        if let Some(id) = self.reassoc_failure_timeout.take() {
            ctx.timer.cancel_event(id);
        }
        self.stored_assoc_rsp = None;
        self.pending_join_req = None;
        self.state = MlmeState::Idle;
    }
}
