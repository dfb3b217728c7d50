// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

pub type MacAddr = [u8; 6];

pub const BCAST_ADDR: MacAddr = [0xFF; 6];

pub trait MacFmt {
    fn to_mac_str(&self) -> String;
}

impl MacFmt for MacAddr {
    fn to_mac_str(&self) -> String {
        format!(
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self[0], self[1], self[2], self[3], self[4], self[5]
        )
    }
}

/// Association ID assigned by the AP. Only the low 14 bits carry the ID;
/// IEEE Std 802.11-2016, 9.4.1.8 limits valid values to 1-2007.
pub type Aid = u16;

pub const AID_MASK: u16 = 0x3FFF;
pub const MAX_AID: u16 = 2007;

/// Strips the reserved high bits from a raw AID field.
pub fn aid_from_field(raw: u16) -> Aid {
    raw & AID_MASK
}

// IEEE Std 802.11-2016, 9.4.1.4
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityInfo(pub u16);

impl CapabilityInfo {
    const ESS: u16 = 1 << 0;
    const IBSS: u16 = 1 << 1;
    const SHORT_PREAMBLE: u16 = 1 << 5;
    const QOS: u16 = 1 << 9;

    pub fn ess(&self) -> bool {
        self.0 & Self::ESS != 0
    }
    pub fn ibss(&self) -> bool {
        self.0 & Self::IBSS != 0
    }
    pub fn short_preamble(&self) -> bool {
        self.0 & Self::SHORT_PREAMBLE != 0
    }
    pub fn qos(&self) -> bool {
        self.0 & Self::QOS != 0
    }

    pub fn with_ess(self, val: bool) -> Self {
        self.with_bit(Self::ESS, val)
    }
    pub fn with_ibss(self, val: bool) -> Self {
        self.with_bit(Self::IBSS, val)
    }
    pub fn with_short_preamble(self, val: bool) -> Self {
        self.with_bit(Self::SHORT_PREAMBLE, val)
    }
    pub fn with_qos(self, val: bool) -> Self {
        self.with_bit(Self::QOS, val)
    }

    fn with_bit(self, bit: u16, val: bool) -> Self {
        Self(if val { self.0 | bit } else { self.0 & !bit })
    }
}

// IEEE Std 802.11-2016, 9.4.1.9, Table 9-46 (subset used by this engine)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCode(pub u16);

impl StatusCode {
    pub const SUCCESS: Self = Self(0);
    pub const REFUSED: Self = Self(1);
    pub const DENIED_NO_MORE_STAS: Self = Self(17);

    pub fn is_success(&self) -> bool {
        *self == Self::SUCCESS
    }
}

// IEEE Std 802.11-2016, 9.4.1.7, Table 9-45 (subset)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReasonCode(pub u16);

impl ReasonCode {
    pub const UNSPECIFIED: Self = Self(1);
    pub const INVALID_AID: Self = Self(2);
    pub const STA_LEAVING: Self = Self(8);
}

// IEEE Std 802.11-2016, 9.4.1.1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAlgorithm {
    OpenSystem,
    SharedKey,
    FastBssTransition,
    Sae,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cbw {
    Cbw20,
    Cbw40,
    Cbw40Below,
    Cbw80,
    Cbw160,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WlanChannel {
    pub primary: u8,
    pub cbw: Cbw,
}

impl WlanChannel {
    pub fn new(primary: u8, cbw: Cbw) -> Self {
        Self { primary, cbw }
    }

    pub fn is_2ghz(&self) -> bool {
        self.primary <= 14
    }
}
