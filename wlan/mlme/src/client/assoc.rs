// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! (Re)Association response processing: validation, outcome dispatch and the
//! terminal accept/reject transitions.

use crate::client::frame::backfill_rates;
use crate::client::peer::update_peer_from_rsp;
use crate::client::{
    AssocResultCode, AssocRspFrame, AssocRspRecord, Context, MlmeState, Role, RspSubtype, Session,
    SmeNotification,
};
use crate::device::{AddBssRequest, AddStaRequest, DeviceOps, LinkState, UpdateBssRequest};
use crate::error::Error;
use log::{debug, error, info};
use wlan_common::mac::{
    aid_from_field, Aid, MacAddr, MacFmt, ReasonCode, StatusCode, MAX_AID,
};

/// Reasons a response frame is dropped before any processing. Dropped frames
/// produce no SME notification and change no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValidationReject {
    ApRole,
    UnexpectedState,
    SourceMismatch,
}

impl Session {
    fn validate(&self, frame: &AssocRspFrame) -> Result<(), ValidationReject> {
        if self.role == Role::Ap {
            return Err(ValidationReject::ApRole);
        }
        match frame.subtype {
            RspSubtype::Assoc => {
                if self.state != MlmeState::WtAssocRsp {
                    return Err(ValidationReject::UnexpectedState);
                }
                if frame.src_addr != self.bssid {
                    return Err(ValidationReject::SourceMismatch);
                }
            }
            RspSubtype::Reassoc => {
                let state_ok = self.state == MlmeState::WtReassocRsp
                    || (self.roaming_features_active()
                        && self.state == MlmeState::WtFtReassocRsp);
                if !state_ok {
                    return Err(ValidationReject::UnexpectedState);
                }
                let expected = self.reassoc_bssid.unwrap_or(self.bssid);
                if frame.src_addr != expected {
                    return Err(ValidationReject::SourceMismatch);
                }
            }
        }
        Ok(())
    }

    /// Entry point for a received (Re)Association Response frame.
    pub fn on_assoc_rsp_frame<D: DeviceOps>(&mut self, ctx: &mut Context<D>, frame: AssocRspFrame) {
        if let Err(reject) = self.validate(&frame) {
            // Retried duplicates of an already-processed response are
            // routine; only log unexpected originals at a visible level.
            if frame.is_retry {
                debug!(
                    "dropping retried {:?} rsp from {}: {:?}",
                    frame.subtype,
                    frame.src_addr.to_mac_str(),
                    reject
                );
            } else {
                info!(
                    "dropping {:?} rsp from {}: {:?}",
                    frame.subtype,
                    frame.src_addr.to_mac_str(),
                    reject
                );
            }
            return;
        }

        // Exactly once per accepted frame, before any outcome branching.
        self.stop_failure_timer(ctx, frame.subtype);

        let mut record = match ctx.parser.parse_assoc_rsp(&frame.body) {
            Ok(record) => record,
            Err(e) => {
                error!("{:?} response: {}", frame.subtype, Error::ParsingFrame(e));
                self.reject_and_cleanup(
                    ctx,
                    frame.subtype,
                    frame.src_addr,
                    AssocResultCode::InvalidAssocRspRxed,
                    StatusCode::REFUSED,
                );
                return;
            }
        };
        backfill_rates(&mut record, &self.rates);
        self.dispatch(ctx, frame.subtype, frame.src_addr, record);
    }

    /// Takes ownership of the parsed record; it is either moved into the
    /// session (FT reassociation success) or dropped when dispatch returns.
    fn dispatch<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        subtype: RspSubtype,
        src: MacAddr,
        record: AssocRspRecord,
    ) {
        if record.cap.ibss() {
            error!("{:?} response from {} advertises IBSS", subtype, src.to_mac_str());
            return;
        }
        if let Err(e) = ctx.device.self_capabilities() {
            error!("cannot retrieve own capabilities: {}", e);
            return;
        }

        if !record.status.is_success() {
            info!("{:?} rejected by {} with status {:?}", subtype, src.to_mac_str(), record.status);
            let result = match record.transfer_target {
                Some(t) => AssocResultCode::TransferSta { bssid: t.bssid, channel: t.channel },
                None => AssocResultCode::AssocRefused,
            };
            ctx.device.delete_preauth_node(src);
            self.reject_and_cleanup(ctx, subtype, src, result, record.status);
            return;
        }

        let aid = aid_from_field(record.raw_aid);
        if aid > MAX_AID {
            error!("association ID {} out of range", aid);
            ctx.device.send_disassoc_frame(src, ReasonCode::INVALID_AID);
            self.reject_and_cleanup(
                ctx,
                subtype,
                src,
                AssocResultCode::InvalidAssocRspRxed,
                StatusCode::REFUSED,
            );
            return;
        }

        match subtype {
            RspSubtype::Assoc => self.handle_assoc_success(ctx, src, aid, record),
            RspSubtype::Reassoc => self.handle_reassoc_success(ctx, src, aid, record),
        }
    }

    fn handle_assoc_success<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        src: MacAddr,
        aid: Aid,
        record: AssocRspRecord,
    ) {
        ctx.device.reset_power_save();

        if ctx.peers.get(&src).is_none() {
            error!("no peer descriptor for {}", src.to_mac_str());
            self.reject_and_cleanup(
                ctx,
                RspSubtype::Assoc,
                src,
                AssocResultCode::ResourcesUnavailable,
                StatusCode::REFUSED,
            );
            return;
        }

        self.aid = Some(aid);
        // Any cached pre-auth node for this AP is stale now.
        ctx.device.delete_preauth_node(src);

        {
            let Context { config, device, peers, .. } = ctx;
            if let Some(peer) = peers.get_mut(&src) {
                update_peer_from_rsp(config, self, peer, device, &record);
            }
        }

        // Preamble comes from the beacon cached at join; the response's own
        // capability field is the fallback.
        let short_preamble =
            self.join_beacon_cap.map_or(record.cap.short_preamble(), |c| c.short_preamble());
        let add = AddBssRequest {
            bssid: self.bssid,
            channel: self.channel,
            beacon_period: self.pending_join_req.as_ref().map_or(100, |b| b.beacon_period),
            cap: record.cap,
            rates: record.rates.clone(),
            edca: self.edca,
            ht_cap: record.ht_cap,
            vht_cap: record.vht_cap,
            short_preamble,
            protection_on: self.erp_enabled,
        };
        match ctx.device.add_bss(add) {
            Ok(()) => {
                self.state = MlmeState::LinkEstablished;
                self.pending_join_req = None;
                ctx.device.set_link_state(LinkState::PostAssoc);
                ctx.sme_sink.send(SmeNotification::AssocConf {
                    result: AssocResultCode::Success,
                    status: record.status,
                });
            }
            Err(e) => {
                error!("ADD_BSS failed after association: {}", e);
                self.reject_and_cleanup(
                    ctx,
                    RspSubtype::Assoc,
                    src,
                    AssocResultCode::ResourcesUnavailable,
                    StatusCode::REFUSED,
                );
            }
        }
    }

    fn handle_reassoc_success<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        src: MacAddr,
        aid: Aid,
        record: AssocRspRecord,
    ) {
        if ctx.peers.get(&src).is_none() {
            error!("no peer descriptor for {}", src.to_mac_str());
            ctx.device.send_disassoc_frame(src, ReasonCode::UNSPECIFIED);
            self.reject_and_cleanup(
                ctx,
                RspSubtype::Reassoc,
                src,
                AssocResultCode::InvalidAssocRspRxed,
                StatusCode::REFUSED,
            );
            return;
        }

        {
            let Context { config, device, peers, .. } = ctx;
            if let Some(peer) = peers.get_mut(&src) {
                update_peer_from_rsp(config, self, peer, device, &record);
            }
        }

        let status = record.status;
        if self.state == MlmeState::WtFtReassocRsp {
            // FT roam: the BSS was pre-staged before the reassociation
            // request, only the self STA entry needs its new AID.
            ctx.device.reset_power_save();
            self.aid = Some(aid);
            let add_sta = AddStaRequest { peer: src, aid };
            // Staged in the FT context; released by cleanup if the bridge
            // rejects the hand-off.
            self.ft.pending_add_sta = Some(Box::new(add_sta));
            if let Err(e) = ctx.device.add_self_sta(add_sta) {
                error!("ADD_STA failed after FT reassociation: {}", e);
                self.reject_and_cleanup(
                    ctx,
                    RspSubtype::Reassoc,
                    src,
                    AssocResultCode::ResourcesUnavailable,
                    StatusCode::REFUSED,
                );
                return;
            }
            self.bssid = src;
            self.reassoc_bssid = None;
            self.ric_data = record.ric_data.clone();
            // The response lives on for post-roam queries; the session now
            // owns it.
            self.stored_assoc_rsp = Some(Box::new(record));
            self.ft.cleanup();
            self.state = MlmeState::LinkEstablished;
            ctx.device.set_link_state(LinkState::PostAssoc);
            ctx.sme_sink.send(SmeNotification::ReassocConf {
                result: AssocResultCode::Success,
                status,
            });
            // No frame flush on this path; traffic continues across the roam.
            return;
        }

        if src == self.bssid {
            // Same-BSS reassociation: reconfigure in place so admitted
            // TSPECs survive.
            if let Err(e) = ctx.device.update_bss(UpdateBssRequest {
                bssid: src,
                cap: record.cap,
                edca: self.edca,
            }) {
                error!("UPDATE_BSS failed after reassociation: {}", e);
                self.reject_and_cleanup(
                    ctx,
                    RspSubtype::Reassoc,
                    src,
                    AssocResultCode::ResourcesUnavailable,
                    StatusCode::REFUSED,
                );
                return;
            }
        } else {
            if let Err(e) = ctx.device.delete_bss() {
                error!("DELETE_BSS failed before re-add: {}", e);
            }
            let add = AddBssRequest {
                bssid: src,
                channel: self.channel,
                beacon_period: self.pending_join_req.as_ref().map_or(100, |b| b.beacon_period),
                cap: record.cap,
                rates: record.rates.clone(),
                edca: self.edca,
                ht_cap: record.ht_cap,
                vht_cap: record.vht_cap,
                short_preamble: record.cap.short_preamble(),
                protection_on: self.erp_enabled,
            };
            if let Err(e) = ctx.device.add_bss(add) {
                error!("ADD_BSS failed after reassociation: {}", e);
                self.reject_and_cleanup(
                    ctx,
                    RspSubtype::Reassoc,
                    src,
                    AssocResultCode::ResourcesUnavailable,
                    StatusCode::REFUSED,
                );
                return;
            }
            self.bssid = src;
        }

        self.aid = Some(aid);
        self.reassoc_bssid = None;
        self.state = MlmeState::LinkEstablished;
        ctx.device.set_link_state(LinkState::PostAssoc);
        ctx.sme_sink
            .send(SmeNotification::ReassocConf { result: AssocResultCode::Success, status });
    }

    /// Terminal reject: posts the confirmation and settles the state machine.
    /// An association or FT reassociation failure idles the link; an ordinary
    /// reassociation failure falls back to the still-working current BSS.
    fn terminal_reject<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        subtype: RspSubtype,
        result: AssocResultCode,
        status: StatusCode,
    ) {
        let ft_wait = matches!(
            self.state,
            MlmeState::WtFtReassocRsp | MlmeState::WtAddBssRspFtReassoc
        );
        match subtype {
            RspSubtype::Assoc => {
                self.state = MlmeState::Idle;
                self.pending_join_req = None;
                ctx.device.set_link_state(LinkState::Idle);
                ctx.sme_sink.send(SmeNotification::AssocConf { result, status });
            }
            RspSubtype::Reassoc if ft_wait => {
                self.state = MlmeState::Idle;
                self.pending_join_req = None;
                self.reassoc_bssid = None;
                self.ft.cleanup();
                ctx.device.set_link_state(LinkState::Idle);
                ctx.sme_sink.send(SmeNotification::ReassocConf { result, status });
            }
            RspSubtype::Reassoc => {
                self.restore_pre_reassoc_state(ctx);
                ctx.sme_sink.send(SmeNotification::ReassocConf { result, status });
            }
        }
    }

    fn reject_and_cleanup<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        subtype: RspSubtype,
        peer: MacAddr,
        result: AssocResultCode,
        status: StatusCode,
    ) {
        self.terminal_reject(ctx, subtype, result, status);
        // Buffered frames for the peer are dead weight once the exchange
        // failed terminally.
        ctx.device.flush_peer_frames(peer);
    }

    /// A failed ordinary reassociation leaves the existing association with
    /// the current AP intact.
    pub(crate) fn restore_pre_reassoc_state<D: DeviceOps>(&mut self, ctx: &mut Context<D>) {
        self.state = MlmeState::LinkEstablished;
        self.reassoc_bssid = None;
        ctx.device.set_link_state(LinkState::PostAssoc);
    }
}
