// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! FT pre-authentication: optionally moves the radio to the candidate's
//! channel, sends the FT authentication frame and arms a short response
//! timer. Exactly one result is posted per attempt, whichever of the auth
//! response and the timer arrives first.

use crate::client::ft::{build_ft_session, PreAuthAttempt};
use crate::client::{
    Context, PreAuthStatus, Session, SmeNotification, TimedEvent, MAX_FT_IES_LEN,
    PREAUTH_RESPONSE_TIMEOUT_MILLIS,
};
use crate::device::{AuthFrameTx, DeviceOps, ScanId};
use crate::error::Error;
use log::{debug, error, info, warn};
use std::time::Duration;
use wlan_common::{
    bss::BssDescription,
    mac::{AuthAlgorithm, MacAddr, MacFmt, StatusCode, WlanChannel},
};

/// SME request to pre-authenticate with a roam candidate.
#[derive(Debug)]
pub struct PreAuthRequest {
    pub bssid: MacAddr,
    pub channel: WlanChannel,
    pub bss: Box<BssDescription>,
}

/// Authentication response frame relevant to a pre-auth attempt, already
/// reduced to the fields this controller consumes.
#[derive(Debug, Clone)]
pub struct AuthRspFrame {
    pub src_addr: MacAddr,
    pub status: StatusCode,
    pub ft_ies: Vec<u8>,
}

/// Progress reports from the off-channel dwell started for pre-auth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent {
    /// The driver could not start the dwell at all.
    StartFailed,
    /// The radio is parked on the candidate's channel.
    ForeignChannel,
    /// The dwell ended and the radio is back on the operating channel.
    Completed,
}

impl Session {
    /// Starts a pre-authentication attempt toward `req.bssid`. If the
    /// candidate lives on another channel, or the radio is juggling multiple
    /// channels, the auth frame is deferred until the dwell reports
    /// [`ScanEvent::ForeignChannel`]; otherwise it is sent immediately.
    pub fn request_preauth<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        req: PreAuthRequest,
    ) -> Result<(), Error> {
        if self.ft.preauth.is_some() {
            return Err(Error::PreauthInProgress);
        }

        info!("FT pre-auth requested for {}", req.bssid.to_mac_str());
        let needs_scan =
            req.channel.primary != ctx.device.channel().primary || ctx.device.mcc_active();
        self.ft.preauth = Some(Box::new(PreAuthAttempt {
            bssid: req.bssid,
            channel: req.channel,
            bss: req.bss,
            scan_id: None,
            timeout: None,
            response_processed: false,
        }));

        if needs_scan {
            match ctx.device.start_preauth_scan(req.bssid, req.channel) {
                Ok(scan_id) => {
                    if let Some(attempt) = self.ft.preauth.as_mut() {
                        attempt.scan_id = Some(scan_id);
                    }
                }
                Err(e) => {
                    error!("pre-auth dwell failed to start: {}", e);
                    self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
                }
            }
        } else {
            self.send_preauth_auth_frame(ctx);
        }
        Ok(())
    }

    /// Sends the pre-auth authentication frame and arms the response timer.
    /// An FT association without saved FT IEs cannot form a valid frame, so
    /// that case fails the attempt up front.
    fn send_preauth_auth_frame<D: DeviceOps>(&mut self, ctx: &mut Context<D>) {
        let peer = match self.ft.preauth.as_ref() {
            Some(attempt) => attempt.bssid,
            None => return,
        };

        let ft_auth = self.is_11r && self.auth_type != AuthAlgorithm::OpenSystem;
        let ft_ies = if ft_auth {
            match self.ft_ies.clone() {
                Some(ies) => Some(ies),
                None => {
                    error!("pre-auth with {}: {}", peer.to_mac_str(), Error::MissingFtIes);
                    self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
                    return;
                }
            }
        } else {
            None
        };

        let algorithm =
            if ft_auth { AuthAlgorithm::FastBssTransition } else { AuthAlgorithm::OpenSystem };
        let frame = AuthFrameTx {
            peer,
            algorithm,
            transaction_seq: 1,
            status: StatusCode::SUCCESS,
            ft_ies,
        };
        if let Err(e) = ctx.device.send_auth_frame(frame) {
            error!("failed to send pre-auth frame: {}", e);
            self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
            return;
        }
        debug!("pre-auth frame sent to {}", peer.to_mac_str());

        let id = ctx.timer.schedule_after(
            Duration::from_millis(PREAUTH_RESPONSE_TIMEOUT_MILLIS),
            TimedEvent::FtPreauthResponse,
        );
        if let Some(attempt) = self.ft.preauth.as_mut() {
            attempt.timeout = Some(id);
        }
    }

    /// Drives the attempt from dwell progress. Events for an unknown or
    /// stale scan id are ignored.
    pub fn handle_scan_event<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        scan_id: ScanId,
        event: ScanEvent,
    ) {
        let known = self.ft.preauth.as_ref().map_or(false, |a| a.scan_id == Some(scan_id));
        if !known {
            debug!("scan event {:?} for unknown scan {:?}", event, scan_id);
            return;
        }
        match event {
            ScanEvent::StartFailed => {
                error!("pre-auth dwell aborted by driver");
                if let Some(attempt) = self.ft.preauth.as_mut() {
                    attempt.scan_id = None;
                }
                self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
            }
            ScanEvent::ForeignChannel => self.send_preauth_auth_frame(ctx),
            // The dwell ending is pure bookkeeping; the response timer alone
            // decides whether the attempt failed.
            ScanEvent::Completed => {
                if let Some(attempt) = self.ft.preauth.as_mut() {
                    attempt.scan_id = None;
                }
            }
        }
    }

    /// Consumes the authentication response for the pending attempt.
    pub fn on_preauth_auth_rsp<D: DeviceOps>(&mut self, ctx: &mut Context<D>, frame: AuthRspFrame) {
        let (timeout, bss) = match self.ft.preauth.as_mut() {
            Some(attempt)
                if !attempt.response_processed && attempt.bssid == frame.src_addr =>
            {
                (attempt.timeout.take(), attempt.bss.clone())
            }
            _ => {
                debug!("dropping auth rsp from {}", frame.src_addr.to_mac_str());
                return;
            }
        };

        if let Some(id) = timeout {
            ctx.timer.cancel_event(id);
        }

        if frame.ft_ies.len() > MAX_FT_IES_LEN {
            warn!("oversized FT IEs ({} bytes) dropped", frame.ft_ies.len());
        } else if !frame.ft_ies.is_empty() {
            self.ft.saved_auth_ies = Some(frame.ft_ies);
        }

        if frame.status.is_success() {
            match build_ft_session(&ctx.config, self, &bss) {
                Ok((session, add_bss)) => {
                    self.ft.target_session = Some(Box::new(session));
                    self.ft.pending_add_bss = Some(Box::new(add_bss));
                    self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Success);
                }
                Err(e) => {
                    error!("failed to derive FT target session: {}", e);
                    self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
                }
            }
        } else {
            info!("pre-auth rejected with status {:?}", frame.status);
            self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
        }
    }

    /// The response timer fired. If a response already settled the attempt
    /// this is a no-op; otherwise the attempt fails.
    pub(crate) fn handle_preauth_timeout<D: DeviceOps>(&mut self, ctx: &mut Context<D>) {
        let pending = match self.ft.preauth.as_mut() {
            Some(attempt) if !attempt.response_processed => {
                attempt.timeout = None;
                Some(attempt.bssid)
            }
            _ => None,
        };
        if let Some(bssid) = pending {
            info!("pre-auth response timed out for {}", bssid.to_mac_str());
            self.post_ft_pre_auth_rsp(ctx, PreAuthStatus::Failure);
        }
    }

    /// Posts the single result for the pending attempt. The
    /// `response_processed` flag makes this a no-op when the auth response
    /// and the timer race; whoever gets here first wins.
    pub(crate) fn post_ft_pre_auth_rsp<D: DeviceOps>(
        &mut self,
        ctx: &mut Context<D>,
        status: PreAuthStatus,
    ) {
        let (bssid, timeout, scan_id) = match self.ft.preauth.as_mut() {
            Some(attempt) if !attempt.response_processed => {
                attempt.response_processed = true;
                (attempt.bssid, attempt.timeout.take(), attempt.scan_id.take())
            }
            _ => return,
        };

        if let Some(id) = timeout {
            ctx.timer.cancel_event(id);
        }
        if let Some(id) = scan_id {
            ctx.device.end_scan(id);
        }

        let ft_ies = self.ft.saved_auth_ies.clone().unwrap_or_default();
        ctx.sme_sink.send(SmeNotification::FtPreAuthRsp { status, bssid, ft_ies });

        match status {
            // Keep the derived target session around for the reassociation
            // that SME will trigger next.
            PreAuthStatus::Success => self.ft.clear_attempt(),
            PreAuthStatus::Failure => self.ft.cleanup(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_utils::*;
    use crate::client::MlmeState;
    use wlan_common::assert_variant;
    use wlan_common::mac::Cbw;

    fn preauth_request(channel: u8) -> PreAuthRequest {
        PreAuthRequest {
            bssid: TARGET_BSSID,
            channel: WlanChannel::new(channel, Cbw::Cbw20),
            bss: Box::new(fake_bss_description(TARGET_BSSID, channel)),
        }
    }

    fn ft_session() -> Session {
        let mut session = fake_session();
        session.state = MlmeState::LinkEstablished;
        session.is_11r = true;
        session.auth_type = AuthAlgorithm::FastBssTransition;
        session.ft_ies = Some(vec![0x36, 0x02, 0xaa, 0xbb]);
        session
    }

    #[test]
    fn same_channel_skips_scan_and_sends_auth() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        ctx.device.wlan_channel = WlanChannel::new(1, Cbw::Cbw20);
        let mut session = ft_session();

        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        assert!(ctx.device.scans_started.is_empty());
        assert_eq!(ctx.device.auth_frames.len(), 1);
        let frame = &ctx.device.auth_frames[0];
        assert_eq!(frame.peer, TARGET_BSSID);
        assert_eq!(frame.algorithm, AuthAlgorithm::FastBssTransition);
        assert_eq!(frame.transaction_seq, 1);
        assert!(frame.ft_ies.is_some());
        // Response timer is armed.
        assert!(session.ft.preauth.as_ref().unwrap().timeout.is_some());
        assert_eq!(ctx.timer.scheduled_count(), 1);
    }

    #[test]
    fn cross_channel_defers_auth_until_foreign_channel() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        ctx.device.wlan_channel = WlanChannel::new(1, Cbw::Cbw20);
        let mut session = ft_session();

        session.request_preauth(&mut ctx, preauth_request(36)).unwrap();

        assert_eq!(ctx.device.scans_started.len(), 1);
        assert!(ctx.device.auth_frames.is_empty());
        let scan_id = ctx.device.scans_started[0].0;

        session.handle_scan_event(&mut ctx, scan_id, ScanEvent::ForeignChannel);
        assert_eq!(ctx.device.auth_frames.len(), 1);

        // Dwell end is bookkeeping only; no result has been posted.
        session.handle_scan_event(&mut ctx, scan_id, ScanEvent::Completed);
        assert!(m.drain_sme().is_empty());
        assert!(session.ft.preauth.as_ref().unwrap().scan_id.is_none());
    }

    #[test]
    fn mcc_forces_scan_even_on_same_channel() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        ctx.device.wlan_channel = WlanChannel::new(1, Cbw::Cbw20);
        ctx.device.mcc = true;
        let mut session = ft_session();

        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();
        assert_eq!(ctx.device.scans_started.len(), 1);
        assert!(ctx.device.auth_frames.is_empty());
    }

    #[test]
    fn second_request_rejected_while_one_outstanding() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();

        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();
        assert_variant!(
            session.request_preauth(&mut ctx, preauth_request(1)),
            Err(crate::error::Error::PreauthInProgress)
        );
    }

    #[test]
    fn scan_start_failure_posts_failure() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        ctx.device.fail_start_scan = true;
        let mut session = ft_session();

        session.request_preauth(&mut ctx, preauth_request(36)).unwrap();

        let msgs = m.drain_sme();
        assert_eq!(msgs.len(), 1);
        assert_variant!(
            &msgs[0],
            SmeNotification::FtPreAuthRsp { status: PreAuthStatus::Failure, bssid, .. } => {
                assert_eq!(*bssid, TARGET_BSSID);
            }
        );
        assert!(session.ft.preauth.is_none());
    }

    #[test]
    fn missing_ft_ies_fails_fast() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.ft_ies = None;

        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        assert!(ctx.device.auth_frames.is_empty());
        let msgs = m.drain_sme();
        assert_variant!(
            &msgs[0],
            SmeNotification::FtPreAuthRsp { status: PreAuthStatus::Failure, .. }
        );
    }

    #[test]
    fn non_ft_session_uses_open_auth_without_ies() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.is_11r = false;
        session.auth_type = AuthAlgorithm::OpenSystem;
        session.ft_ies = None;

        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        assert_eq!(ctx.device.auth_frames.len(), 1);
        assert_eq!(ctx.device.auth_frames[0].algorithm, AuthAlgorithm::OpenSystem);
        assert!(ctx.device.auth_frames[0].ft_ies.is_none());
    }

    #[test]
    fn success_response_posts_success_and_keeps_target_session() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        session.on_preauth_auth_rsp(
            &mut ctx,
            AuthRspFrame {
                src_addr: TARGET_BSSID,
                status: StatusCode::SUCCESS,
                ft_ies: vec![0x36, 0x01, 0xcc],
            },
        );

        let msgs = m.drain_sme();
        assert_eq!(msgs.len(), 1);
        assert_variant!(
            &msgs[0],
            SmeNotification::FtPreAuthRsp { status: PreAuthStatus::Success, bssid, ft_ies } => {
                assert_eq!(*bssid, TARGET_BSSID);
                assert_eq!(ft_ies, &vec![0x36, 0x01, 0xcc]);
            }
        );
        assert!(session.ft.preauth.is_none());
        assert!(session.ft.target_session.is_some());
        assert!(session.ft.pending_add_bss.is_some());
        // Timer was canceled.
        assert_eq!(ctx.timer.scheduled_count(), 0);
    }

    #[test]
    fn reject_response_posts_failure_and_destroys_state() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        session.on_preauth_auth_rsp(
            &mut ctx,
            AuthRspFrame { src_addr: TARGET_BSSID, status: StatusCode::REFUSED, ft_ies: vec![] },
        );

        let msgs = m.drain_sme();
        assert_variant!(
            &msgs[0],
            SmeNotification::FtPreAuthRsp { status: PreAuthStatus::Failure, .. }
        );
        assert!(session.ft.preauth.is_none());
        assert!(session.ft.target_session.is_none());
    }

    #[test]
    fn oversized_ft_ies_treated_as_absent() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        session.on_preauth_auth_rsp(
            &mut ctx,
            AuthRspFrame {
                src_addr: TARGET_BSSID,
                status: StatusCode::SUCCESS,
                ft_ies: vec![0; crate::client::MAX_FT_IES_LEN + 1],
            },
        );

        let msgs = m.drain_sme();
        assert_variant!(
            &msgs[0],
            SmeNotification::FtPreAuthRsp { status: PreAuthStatus::Success, ft_ies, .. } => {
                assert!(ft_ies.is_empty());
            }
        );
    }

    #[test]
    fn response_from_wrong_bssid_ignored() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();

        session.on_preauth_auth_rsp(
            &mut ctx,
            AuthRspFrame { src_addr: [9; 6], status: StatusCode::SUCCESS, ft_ies: vec![] },
        );
        assert!(m.drain_sme().is_empty());
        assert!(session.ft.preauth.is_some());
    }

    #[test]
    fn teardown_ends_scan_and_cancels_timer() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        ctx.device.wlan_channel = WlanChannel::new(1, Cbw::Cbw20);
        let mut session = ft_session();

        session.request_preauth(&mut ctx, preauth_request(36)).unwrap();
        let scan_id = ctx.device.scans_started[0].0;
        session.handle_scan_event(&mut ctx, scan_id, ScanEvent::ForeignChannel);
        assert_eq!(ctx.timer.scheduled_count(), 1);

        session.teardown(&mut ctx);

        // The off-channel dwell is terminated and the response deadline
        // canceled; neither outlives the session.
        assert_eq!(ctx.device.scans_ended, vec![scan_id]);
        assert_eq!(ctx.timer.scheduled_count(), 0);
        assert!(session.ft.preauth.is_none());
    }

    #[test]
    fn timeout_posts_exactly_one_failure() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();
        let timeout_id = session.ft.preauth.as_ref().unwrap().timeout.unwrap();

        session.handle_timeout(&mut ctx, timeout_id);

        let msgs = m.drain_sme();
        assert_eq!(msgs.len(), 1);
        assert_variant!(
            &msgs[0],
            SmeNotification::FtPreAuthRsp { status: PreAuthStatus::Failure, .. }
        );
        assert!(session.ft.preauth.is_none());
        assert!(session.ft.target_session.is_none());
    }

    #[test]
    fn late_response_after_timeout_is_dropped() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();
        let timeout_id = session.ft.preauth.as_ref().unwrap().timeout.unwrap();

        session.handle_timeout(&mut ctx, timeout_id);
        assert_eq!(m.drain_sme().len(), 1);

        // Attempt is gone; the straggler response posts nothing.
        session.on_preauth_auth_rsp(
            &mut ctx,
            AuthRspFrame { src_addr: TARGET_BSSID, status: StatusCode::SUCCESS, ft_ies: vec![] },
        );
        assert!(m.drain_sme().is_empty());
    }

    #[test]
    fn timeout_after_response_is_noop() {
        let mut m = MockObjects::new();
        let mut ctx = m.make_ctx();
        let mut session = ft_session();
        session.request_preauth(&mut ctx, preauth_request(1)).unwrap();
        let timeout_id = session.ft.preauth.as_ref().unwrap().timeout.unwrap();

        session.on_preauth_auth_rsp(
            &mut ctx,
            AuthRspFrame { src_addr: TARGET_BSSID, status: StatusCode::SUCCESS, ft_ies: vec![] },
        );
        assert_eq!(m.drain_sme().len(), 1);

        // A stale timer firing afterwards must not post a second result.
        session.handle_timeout(&mut ctx, timeout_id);
        assert!(m.drain_sme().is_empty());
    }
}
