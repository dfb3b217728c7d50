// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::{
    ie::{HtCapabilities, SecChanOffset, SupportedRate, VhtCapabilities},
    mac::{CapabilityInfo, MacAddr, WlanChannel},
};

/// The view of a candidate AP assembled from its beacon/probe response, as
/// handed to this engine by the scan layer. Byte-level IE extraction is the
/// frame parser's job.
#[derive(Debug, Clone, PartialEq)]
pub struct BssDescription {
    pub bssid: MacAddr,
    pub ssid: Vec<u8>,
    pub channel: WlanChannel,
    pub beacon_period: u16,
    pub cap: CapabilityInfo,
    pub rates: Vec<SupportedRate>,
    pub ht_cap: Option<HtCapabilities>,
    pub vht_cap: Option<VhtCapabilities>,
    pub he_cap_present: bool,
    pub sec_chan_offset: SecChanOffset,
    pub qos_capable: bool,
    /// Regulatory maximum transmit power for the channel, dBm.
    pub reg_max_power: i8,
    /// Power constraint advertised by the AP's Power Constraint IE, dB.
    pub ap_power_constraint: u8,
}
