// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::client::{AssocRspRecord, ClientConfig, PhyMode, Session};
use crate::device::DeviceOps;
use log::{error, warn};
use std::collections::HashMap;
use wlan_common::{
    ie::{is_a_rate, SupportedRate},
    mac::{CapabilityInfo, MacAddr},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaType {
    /// The AP this station is associated with.
    OwnAp,
    Unknown,
}

/// Local record of a peer's negotiated parameters. Created during the
/// pre-association phase; updated on every successful (re)association
/// response; removed on disassociation.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerDescriptor {
    pub addr: MacAddr,
    pub sta_type: StaType,
    pub cap: CapabilityInfo,
    pub short_preamble: bool,

    pub ht_capable: bool,
    pub greenfield: bool,
    pub chan_width_40: bool,
    pub lsig_txop_protect: bool,
    pub mimo_ps: u8,
    pub max_amsdu_len: u8,
    pub ampdu_density: u8,
    pub dsss_cck_40: bool,
    pub sgi_20: bool,
    pub sgi_40: bool,
    /// Dual-use field: the HT max-rx-AMPDU factor, overwritten with the VHT
    /// max-AMPDU-length exponent when VHT caps are present. The firmware
    /// bridge consumes the single field; do not split it.
    pub max_rx_ampdu_factor: u8,
    /// Highest rx MCS index from the advertised HT MCS set.
    pub max_ht_mcs: u8,
    /// Immediate block-ack on all TIDs; delayed BA is never negotiated even
    /// when the peer advertises it.
    pub immediate_ba_all_tids: bool,

    pub vht_capable: bool,
    pub sgi_80: bool,

    pub rates: Vec<SupportedRate>,

    pub qos_mode: bool,
    pub lle_enabled: bool,
    pub wme_enabled: bool,
    pub uapsd_enabled: bool,
    pub rsn_protected: bool,
}

impl PeerDescriptor {
    pub fn new(addr: MacAddr) -> Self {
        Self {
            addr,
            sta_type: StaType::Unknown,
            cap: CapabilityInfo(0),
            short_preamble: false,
            ht_capable: false,
            greenfield: false,
            chan_width_40: false,
            lsig_txop_protect: false,
            mimo_ps: 0,
            max_amsdu_len: 0,
            ampdu_density: 0,
            dsss_cck_40: false,
            sgi_20: false,
            sgi_40: false,
            max_rx_ampdu_factor: 0,
            max_ht_mcs: 0,
            immediate_ba_all_tids: false,
            vht_capable: false,
            sgi_80: false,
            rates: vec![],
            qos_mode: false,
            lle_enabled: false,
            wme_enabled: false,
            uapsd_enabled: false,
            rsn_protected: false,
        }
    }
}

/// Per-interface peer lookup, keyed on MAC address. Entries are only touched
/// within one dispatch window; no reference is held across suspension points.
#[derive(Default)]
pub struct PeerTable {
    peers: HashMap<MacAddr, PeerDescriptor>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self { peers: HashMap::new() }
    }

    pub fn insert(&mut self, peer: PeerDescriptor) {
        self.peers.insert(peer.addr, peer);
    }

    pub fn get_mut(&mut self, addr: &MacAddr) -> Option<&mut PeerDescriptor> {
        self.peers.get_mut(addr)
    }

    pub fn get(&self, addr: &MacAddr) -> Option<&PeerDescriptor> {
        self.peers.get(addr)
    }

    pub fn remove(&mut self, addr: &MacAddr) -> Option<PeerDescriptor> {
        self.peers.remove(addr)
    }
}

/// The full negotiated rate set for the peer. HT/VHT MCS-derived rates are
/// folded in by the rate-selection layer; this engine carries the legacy set.
fn populate_peer_rates(record: &AssocRspRecord) -> Vec<SupportedRate> {
    record.rates.clone()
}

/// STA Context Updater: populates the peer descriptor and session QoS state
/// from a successfully parsed association response.
///
/// Fails closed: there is no way to undo a partially applied association
/// from here, so collaborator errors become log lines, never early returns.
pub fn update_peer_from_rsp<D: DeviceOps>(
    config: &ClientConfig,
    session: &mut Session,
    peer: &mut PeerDescriptor,
    device: &mut D,
    record: &AssocRspRecord,
) {
    peer.sta_type = StaType::OwnAp;
    peer.cap = record.cap;
    peer.short_preamble = record.cap.short_preamble();

    if config.ht_supported {
        if let Some(ht) = &record.ht_cap {
            peer.ht_capable = true;
            peer.greenfield = ht.greenfield;
            peer.chan_width_40 = ht.chan_width_40;
            peer.lsig_txop_protect = ht.lsig_txop_protect;
            peer.mimo_ps = ht.mimo_ps;
            peer.max_amsdu_len = ht.max_amsdu_len;
            peer.ampdu_density = ht.ampdu_density;
            peer.dsss_cck_40 = ht.dsss_cck_40;
            peer.sgi_20 = ht.sgi_20;
            peer.sgi_40 = ht.sgi_40;
            peer.max_rx_ampdu_factor = ht.max_rx_ampdu_factor;
            peer.max_ht_mcs = ht.max_mcs;
            peer.immediate_ba_all_tids = true;
        }
    }

    if config.vht_supported {
        if let Some(vht) = &record.vht_cap {
            peer.vht_capable = true;
            peer.sgi_80 = vht.sgi_80;
            // VHT overload of the AMPDU factor field; see the field doc.
            peer.max_rx_ampdu_factor = vht.max_ampdu_len_exp;
        }
    }

    peer.rates = populate_peer_rates(record);

    if session.phy_mode == PhyMode::Dot11G {
        if let Some(first) = record.rates.first() {
            if is_a_rate(first.rate()) {
                session.erp_enabled = true;
            }
        }
    }

    // The two EDCA branches are independent; a response can satisfy both.
    let mut edca_applied = false;
    if session.qos_enabled {
        if let Some(edca) = &record.edca {
            match device.apply_edca_params(edca) {
                Ok(()) => {
                    session.edca = *edca;
                    peer.qos_mode = true;
                    peer.lle_enabled = true;
                    edca_applied = true;
                }
                Err(e) => error!("failed to apply EDCA parameters: {}", e),
            }
        }
    }
    if session.wme_enabled {
        if let Some(edca) = &record.wmm_edca {
            match device.apply_edca_params(edca) {
                Ok(()) => {
                    session.edca = *edca;
                    peer.qos_mode = true;
                    peer.wme_enabled = true;
                    edca_applied = true;
                }
                Err(e) => error!("failed to apply WMM EDCA parameters: {}", e),
            }
        }
    }
    if !edca_applied {
        // Legacy AP: a later BSS-add still needs valid parameters.
        session.edca = session.default_edca;
    }

    // Interop accommodation: HT-capable peers are treated as implicitly
    // QoS-capable even without a WMM IE.
    if config.ht_implies_qos && session.qos_enabled && peer.ht_capable && !edca_applied {
        warn!("HT peer without WMM IE; forcing QoS on");
        peer.qos_mode = true;
        peer.wme_enabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_utils::*;
    use crate::device::FakeDevice;
    use wlan_common::ie::{EdcaParamSet, HtCapabilities, VhtCapabilities};
    use wlan_common::mac::StatusCode;

    const PEER_ADDR: MacAddr = [6; 6];

    #[test]
    fn basic_fields_copied() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert_eq!(peer.sta_type, StaType::OwnAp);
        assert_eq!(peer.cap, record.cap);
        assert_eq!(peer.rates, record.rates);
        assert!(!peer.ht_capable);
    }

    #[test]
    fn ht_fields_and_immediate_ba() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.ht_cap = Some(HtCapabilities {
            greenfield: true,
            sgi_20: true,
            max_rx_ampdu_factor: 3,
            max_mcs: 15,
            delayed_block_ack: true,
            ..Default::default()
        });

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(peer.ht_capable);
        assert!(peer.greenfield);
        assert!(peer.sgi_20);
        assert_eq!(peer.max_rx_ampdu_factor, 3);
        assert_eq!(peer.max_ht_mcs, 15);
        // Delayed BA is never negotiated, even though the peer advertised it.
        assert!(peer.immediate_ba_all_tids);
    }

    #[test]
    fn vht_overloads_ampdu_factor() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.ht_cap = Some(HtCapabilities { max_rx_ampdu_factor: 3, ..Default::default() });
        record.vht_cap =
            Some(VhtCapabilities { max_ampdu_len_exp: 7, sgi_80: true, ..Default::default() });

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(peer.vht_capable);
        assert_eq!(peer.max_rx_ampdu_factor, 7);
    }

    #[test]
    fn erp_enabled_for_a_rate_in_11g() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        session.phy_mode = PhyMode::Dot11G;
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        // 6 Mbps OFDM with the basic bit set; masking to the low 7 bits must
        // still classify it as an A-rate.
        record.rates = vec![SupportedRate(0x8C)];

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(session.erp_enabled);
    }

    #[test]
    fn no_erp_for_cck_rate() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        session.phy_mode = PhyMode::Dot11G;
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.rates = vec![SupportedRate(2)];

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(!session.erp_enabled);
    }

    #[test]
    fn edca_fallback_to_session_default() {
        // P6: neither EDCA IE present implies session defaults.
        let config = ClientConfig::default();
        let mut session = fake_session();
        session.qos_enabled = true;
        session.wme_enabled = true;
        session.edca.best_effort.aifsn = 9; // stale value to be replaced
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert_eq!(session.edca, session.default_edca);
        assert!(!peer.qos_mode);
    }

    #[test]
    fn both_edca_branches_can_fire() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        session.qos_enabled = true;
        session.wme_enabled = true;
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.edca = Some(EdcaParamSet::session_default());
        record.wmm_edca = Some(EdcaParamSet::session_default());

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(peer.qos_mode);
        assert!(peer.lle_enabled);
        assert!(peer.wme_enabled);
        assert_eq!(device.edca_applied.len(), 2);
    }

    #[test]
    fn ht_peer_without_wmm_forces_qos() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        session.qos_enabled = true;
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.ht_cap = Some(HtCapabilities::default());

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(peer.qos_mode);
        assert!(peer.wme_enabled);
        assert!(!peer.lle_enabled);
    }

    #[test]
    fn ht_implies_qos_can_be_disabled() {
        let config = ClientConfig { ht_implies_qos: false, ..ClientConfig::default() };
        let mut session = fake_session();
        session.qos_enabled = true;
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.ht_cap = Some(HtCapabilities::default());

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(!peer.qos_mode);
        assert!(!peer.wme_enabled);
    }

    #[test]
    fn failed_edca_apply_falls_back() {
        let config = ClientConfig::default();
        let mut session = fake_session();
        session.qos_enabled = true;
        let mut peer = PeerDescriptor::new(PEER_ADDR);
        let mut device = FakeDevice::new();
        device.fail_apply_edca = true;
        let mut record = fake_assoc_rsp_record(StatusCode::SUCCESS, 42);
        record.edca = Some(EdcaParamSet::session_default());

        update_peer_from_rsp(&config, &mut session, &mut peer, &mut device, &record);
        assert!(!peer.lle_enabled);
        assert_eq!(session.edca, session.default_edca);
    }
}
