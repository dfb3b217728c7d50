// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use wlan_common::{
    error::FrameParseError,
    ie::{EdcaParamSet, HtCapabilities, SupportedRate, VhtCapabilities},
    mac::{CapabilityInfo, MacAddr, StatusCode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RspSubtype {
    Assoc,
    Reassoc,
}

/// A received (Re)Association Response management frame, before parsing.
/// `is_retry` mirrors the 802.11 retry bit and only affects log verbosity.
#[derive(Debug, Clone)]
pub struct AssocRspFrame {
    pub subtype: RspSubtype,
    pub src_addr: MacAddr,
    pub is_retry: bool,
    pub body: Vec<u8>,
}

/// Alternate-radio target carried by the proprietary load-balance IE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTarget {
    pub bssid: MacAddr,
    pub channel: u8,
}

/// Parsed association-response record. Owned by the dispatcher for the
/// duration of one frame; either moved into the session (FT reassociation)
/// or dropped at the end of dispatch, never both.
#[derive(Debug, Clone, PartialEq)]
pub struct AssocRspRecord {
    pub status: StatusCode,
    /// Raw AID field as transmitted; the two reserved high bits are still set.
    pub raw_aid: u16,
    pub cap: CapabilityInfo,
    pub rates: Vec<SupportedRate>,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    /// EDCA parameter set element (QoS association).
    pub edca: Option<EdcaParamSet>,
    /// WMM parameter element (vendor WMM association).
    pub wmm_edca: Option<EdcaParamSet>,
    /// FT Resource Information Container, opaque to this engine.
    pub ric_data: Option<Vec<u8>>,
    pub transfer_target: Option<TransferTarget>,
}

/// Byte-level decoding is delegated to the embedder; this engine only ever
/// sees the structured record.
pub trait FrameParser {
    fn parse_assoc_rsp(&self, body: &[u8]) -> Result<AssocRspRecord, FrameParseError>;
}

/// Post-parse fixup owned by this engine: a response without a supported-rate
/// IE inherits the session's previously-known rate set so downstream
/// consumers never see an empty set.
pub fn backfill_rates(record: &mut AssocRspRecord, session_rates: &[SupportedRate]) {
    if record.rates.is_empty() {
        record.rates = session_rates.to_vec();
    }
}
