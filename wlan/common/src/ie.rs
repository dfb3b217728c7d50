// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Parsed information-element records. Byte-level frame layouts are owned by
//! the external frame parser; these are the already-decoded shapes the MLME
//! engine consumes.

/// A supported rate in units of 500 kbit/s, with the MSB marking it basic.
/// IEEE Std 802.11-2016, 9.4.2.3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SupportedRate(pub u8);

impl SupportedRate {
    pub fn rate(&self) -> u8 {
        self.0 & 0x7F
    }

    pub fn basic(&self) -> bool {
        self.0 & 0x80 != 0
    }

    pub fn with_basic(self, basic: bool) -> Self {
        Self(if basic { self.0 | 0x80 } else { self.0 & 0x7F })
    }
}

/// OFDM ("A") rates in units of 500 kbit/s: 6, 9, 12, 18, 24, 36, 48, 54 Mbps.
const A_RATES: [u8; 8] = [12, 18, 24, 36, 48, 72, 96, 108];

/// Whether a legacy rate (low 7 bits) belongs to the ERP/OFDM rate class.
pub fn is_a_rate(rate: u8) -> bool {
    A_RATES.contains(&(rate & 0x7F))
}

/// EDCA parameters for one access category.
/// IEEE Std 802.11-2016, 9.4.2.29.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcParams {
    pub aifsn: u8,
    pub ecw_min: u8,
    pub ecw_max: u8,
    pub txop_limit: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdcaParamSet {
    pub best_effort: AcParams,
    pub background: AcParams,
    pub video: AcParams,
    pub voice: AcParams,
}

impl EdcaParamSet {
    /// 802.11-2016 Table 9-137 defaults for a 20 MHz OFDM PHY.
    pub fn session_default() -> Self {
        Self {
            best_effort: AcParams { aifsn: 3, ecw_min: 4, ecw_max: 10, txop_limit: 0 },
            background: AcParams { aifsn: 7, ecw_min: 4, ecw_max: 10, txop_limit: 0 },
            video: AcParams { aifsn: 2, ecw_min: 3, ecw_max: 4, txop_limit: 94 },
            voice: AcParams { aifsn: 2, ecw_min: 2, ecw_max: 3, txop_limit: 47 },
        }
    }
}

/// HT capabilities, reduced to the fields the STA context updater consumes.
/// IEEE Std 802.11-2016, 9.4.2.56.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HtCapabilities {
    pub greenfield: bool,
    pub chan_width_40: bool,
    pub lsig_txop_protect: bool,
    pub mimo_ps: u8,
    pub max_amsdu_len: u8,
    pub ampdu_density: u8,
    pub dsss_cck_40: bool,
    pub sgi_20: bool,
    pub sgi_40: bool,
    pub max_rx_ampdu_factor: u8,
    pub delayed_block_ack: bool,
    /// Highest rx MCS index advertised in the supported MCS set.
    pub max_mcs: u8,
}

/// VHT capabilities, reduced likewise. IEEE Std 802.11-2016, 9.4.2.158.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VhtCapabilities {
    pub max_ampdu_len_exp: u8,
    pub sgi_80: bool,
    pub max_mcs_map: u16,
}

/// Secondary channel offset from the HT operation element.
/// IEEE Std 802.11-2016, 9.4.2.57.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecChanOffset {
    None,
    Above,
    Below,
    Reserved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_accessors() {
        let r = SupportedRate(0x8C);
        assert_eq!(r.rate(), 12);
        assert!(r.basic());
        assert_eq!(r.with_basic(false), SupportedRate(12));
    }

    #[test]
    fn a_rate_classification() {
        // 6 Mbps OFDM, basic bit set.
        assert!(is_a_rate(0x8C));
        // 1 Mbps DSSS.
        assert!(!is_a_rate(2));
        // 11 Mbps CCK.
        assert!(!is_a_rate(22));
    }
}
