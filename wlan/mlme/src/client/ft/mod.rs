// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Fast-transition (802.11r) roaming support: the pre-authentication
//! controller, the FT-target session builder and the FT context cleanup.

mod preauth;
mod session;

pub use preauth::{AuthRspFrame, PreAuthRequest, ScanEvent};
pub use session::build_ft_session;

use crate::client::Session;
use crate::device::{AddBssRequest, AddStaRequest, ScanId};
use wlan_common::{bss::BssDescription, mac::MacAddr, mac::WlanChannel, timer::EventId};

/// One in-flight pre-authentication attempt. At most one exists per session.
#[derive(Debug)]
pub struct PreAuthAttempt {
    pub bssid: MacAddr,
    pub channel: WlanChannel,
    /// Candidate description, consumed by the session builder on success.
    pub bss: Box<BssDescription>,
    pub scan_id: Option<ScanId>,
    pub timeout: Option<EventId>,
    /// Guards against the auth response racing the response timer: once set,
    /// no further result may be posted for this attempt.
    pub response_processed: bool,
}

/// FT roaming state embedded in a session.
#[derive(Default)]
pub struct FtContext {
    pub preauth: Option<Box<PreAuthAttempt>>,
    /// FT IEs saved from the authentication response, bounded by
    /// [`crate::client::MAX_FT_IES_LEN`].
    pub saved_auth_ies: Option<Vec<u8>>,
    /// ADD_BSS prepared for the candidate AP, held until the reassociation
    /// request is sent.
    pub pending_add_bss: Option<Box<AddBssRequest>>,
    pub pending_add_sta: Option<Box<AddStaRequest>>,
    /// Session derived for the candidate AP by the session builder; promoted
    /// when reassociation completes, destroyed by cleanup otherwise.
    pub target_session: Option<Box<Session>>,
}

impl FtContext {
    /// Releases the pre-auth attempt and its saved response IEs, keeping any
    /// built target session for the upcoming reassociation.
    pub fn clear_attempt(&mut self) {
        self.preauth = None;
        self.saved_auth_ies = None;
    }

    /// Releases every FT allocation, including a target session that never
    /// completed reassociation. Callable any number of times; after the
    /// first call the context reads as consistently empty.
    pub fn cleanup(&mut self) {
        self.clear_attempt();
        self.pending_add_bss = None;
        self.pending_add_sta = None;
        self.target_session = None;
    }

    /// Session-teardown variant; today identical to [`Self::cleanup`], kept
    /// separate so teardown-only releases have a place to live.
    pub fn cleanup_on_teardown(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wlan_common::mac::Cbw;

    #[test]
    fn cleanup_is_idempotent() {
        let mut ft = FtContext::default();
        ft.saved_auth_ies = Some(vec![1, 2, 3]);
        ft.target_session = Some(Box::new(Session::new([1; 6])));
        ft.preauth = Some(Box::new(PreAuthAttempt {
            bssid: [1; 6],
            channel: WlanChannel::new(36, Cbw::Cbw20),
            bss: Box::new(crate::client::test_utils::fake_bss_description([1; 6], 36)),
            scan_id: None,
            timeout: None,
            response_processed: false,
        }));

        ft.cleanup();
        assert!(ft.preauth.is_none());
        assert!(ft.saved_auth_ies.is_none());
        assert!(ft.target_session.is_none());

        // A second call sees a consistent empty state.
        ft.cleanup();
        assert!(ft.preauth.is_none());
    }
}
