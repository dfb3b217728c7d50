// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Derives the session for an FT roam candidate from the existing session
//! and the candidate's BSS description, together with the ADD_BSS request
//! that pre-stages the candidate on the device.

use crate::client::{
    AssocResultCode, ClientConfig, Context, MlmeState, PhyMode, Session, SmeNotification,
};
use crate::device::{AddBssRequest, DeviceOps, LinkState};
use crate::error::Error;
use log::{error, warn};
use std::cmp::min;
use wlan_common::{
    bss::BssDescription,
    ie::SecChanOffset,
    mac::{Cbw, StatusCode, WlanChannel},
};

/// Builds the target session and its ADD_BSS request for a pre-authenticated
/// roam candidate. Security, QoS and roaming properties carry over from the
/// current session; PHY properties come from the candidate's description.
pub fn build_ft_session(
    config: &ClientConfig,
    source: &Session,
    bss: &BssDescription,
) -> Result<(Session, AddBssRequest), Error> {
    if bss.rates.is_empty() {
        return Err(Error::Internal(anyhow::anyhow!(
            "candidate advertises no supported rates"
        )));
    }

    let mut target = Session::new(bss.bssid);
    target.role = source.role;
    target.ssid = bss.ssid.clone();
    target.reassoc_bssid = Some(bss.bssid);
    target.rates = bss.rates.clone();
    target.default_edca = source.default_edca;
    target.edca = source.default_edca;

    target.qos_enabled = source.qos_enabled && bss.qos_capable;
    target.wme_enabled = source.wme_enabled;
    target.wsm_enabled = source.wsm_enabled;
    target.dot11h_enabled = source.dot11h_enabled;
    target.osen_connection = source.osen_connection;
    target.akm = source.akm;
    target.auth_type = source.auth_type;
    target.is_11r = source.is_11r;
    target.ese_enabled = source.ese_enabled;
    target.fast_roam_enabled = source.fast_roam_enabled;
    target.sme_session_id = source.sme_session_id;
    target.local_power_constraint = source.local_power_constraint;
    target.join_beacon_cap = Some(bss.cap);

    target.phy_mode = derive_phy_mode(config, bss);
    target.channel = derive_channel(target.phy_mode, bss);
    target.tx_power = derive_tx_power(source, bss);

    // Under roam synch the firmware already moved the link; the host only
    // replays the reassociation response, so ADD_BSS completion is not
    // awaited.
    target.state = if source.roam_sync_in_progress {
        MlmeState::WtFtReassocRsp
    } else {
        MlmeState::WtAddBssRspFtReassoc
    };

    let add_bss = AddBssRequest {
        bssid: bss.bssid,
        channel: target.channel,
        beacon_period: bss.beacon_period,
        cap: bss.cap,
        rates: bss.rates.clone(),
        edca: target.default_edca,
        ht_cap: bss.ht_cap,
        vht_cap: bss.vht_cap,
        short_preamble: bss.cap.short_preamble(),
        // Protection is decided from the response on reassoc success.
        protection_on: false,
    };
    Ok((target, add_bss))
}

/// Highest mode the candidate advertises that this interface supports, with
/// the configured per-band fallback when it advertises none.
fn derive_phy_mode(config: &ClientConfig, bss: &BssDescription) -> PhyMode {
    if bss.he_cap_present {
        PhyMode::Dot11Ax
    } else if bss.vht_cap.is_some()
        && config.vht_supported
        && !(bss.channel.is_2ghz() && config.vht_2g_disabled)
    {
        PhyMode::Dot11Ac
    } else if bss.ht_cap.is_some() && config.ht_supported {
        PhyMode::Dot11N
    } else if bss.channel.is_2ghz() {
        config.default_mode_2g
    } else {
        config.default_mode_5g
    }
}

fn derive_channel(phy_mode: PhyMode, bss: &BssDescription) -> WlanChannel {
    let wide_capable = matches!(phy_mode, PhyMode::Dot11N | PhyMode::Dot11Ac | PhyMode::Dot11Ax)
        && bss.ht_cap.map_or(false, |ht| ht.chan_width_40);
    let cbw = if !wide_capable {
        Cbw::Cbw20
    } else {
        match bss.sec_chan_offset {
            SecChanOffset::Above => Cbw::Cbw40,
            SecChanOffset::Below => Cbw::Cbw40Below,
            SecChanOffset::None => Cbw::Cbw20,
            SecChanOffset::Reserved => {
                warn!(
                    "candidate on channel {} advertises 40 MHz with a reserved \
                     secondary offset; forcing 20 MHz",
                    bss.channel.primary
                );
                Cbw::Cbw20
            }
        }
    };
    WlanChannel::new(bss.channel.primary, cbw)
}

/// Regulatory maximum reduced by the AP's power constraint, further capped
/// by the locally configured constraint.
fn derive_tx_power(source: &Session, bss: &BssDescription) -> i8 {
    let regulatory = bss.reg_max_power as i16 - bss.ap_power_constraint as i16;
    min(regulatory, source.local_power_constraint as i16) as i8
}

impl Session {
    /// ADD_BSS completion for a pre-staged FT candidate. On success the
    /// session starts waiting for the reassociation response; on failure the
    /// roam is reported failed and FT state torn down.
    pub fn on_ft_add_bss_complete<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        success: bool,
    ) {
        if self.state != MlmeState::WtAddBssRspFtReassoc {
            return;
        }
        if success {
            self.state = MlmeState::WtFtReassocRsp;
            self.arm_reassoc_failure_timer(ctx);
        } else {
            error!("ADD_BSS failed for FT candidate {:?}", self.bssid);
            self.state = MlmeState::Idle;
            self.reassoc_bssid = None;
            ctx.device.set_link_state(LinkState::Idle);
            self.ft.cleanup();
            ctx.sme_sink.send(SmeNotification::ReassocConf {
                result: AssocResultCode::FtReassocFailure,
                status: StatusCode::REFUSED,
            });
        }
    }
}
