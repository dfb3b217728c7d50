// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use crate::client::{
    AssocRspRecord, ClientConfig, Context, FrameParser, PeerTable, Session, SmeNotification,
    TimedEvent,
};
use crate::device::FakeDevice;
use futures::channel::mpsc;
use std::cell::RefCell;
use std::rc::Rc;
use wlan_common::{
    bss::BssDescription,
    error::FrameParseError,
    ie::{SecChanOffset, SupportedRate},
    mac::{CapabilityInfo, Cbw, MacAddr, StatusCode, WlanChannel},
    sink::UnboundedSink,
    timer::{FakeScheduler, Timer},
};

pub const BSSID: MacAddr = [0x62, 0x73, 0x73, 0x62, 0x73, 0x73];
pub const TARGET_BSSID: MacAddr = [0x72, 0x6f, 0x61, 0x6d, 0x61, 0x70];

/// Parser double: hands back whatever record the test staged, or a parse
/// error when nothing is staged.
pub struct FakeParser {
    next: Rc<RefCell<Option<AssocRspRecord>>>,
}

impl FrameParser for FakeParser {
    fn parse_assoc_rsp(&self, _body: &[u8]) -> Result<AssocRspRecord, FrameParseError> {
        self.next.borrow().clone().ok_or(FrameParseError::Truncated)
    }
}

pub struct MockObjects {
    pub fake_scheduler: FakeScheduler,
    sme_stream: mpsc::UnboundedReceiver<SmeNotification>,
    sme_sink: UnboundedSink<SmeNotification>,
    parse_result: Rc<RefCell<Option<AssocRspRecord>>>,
}

impl MockObjects {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded();
        Self {
            fake_scheduler: FakeScheduler::new(),
            sme_stream: receiver,
            sme_sink: UnboundedSink::new(sender),
            parse_result: Rc::new(RefCell::new(None)),
        }
    }

    pub fn make_ctx(&mut self) -> Context<FakeDevice> {
        Context {
            config: ClientConfig::default(),
            device: FakeDevice::new(),
            timer: Timer::<TimedEvent>::new(Box::new(self.fake_scheduler.clone())),
            parser: Box::new(FakeParser { next: self.parse_result.clone() }),
            peers: PeerTable::new(),
            sme_sink: self.sme_sink.clone(),
        }
    }

    /// Stages the record the fake parser returns for the next frames.
    pub fn stage_parse_result(&mut self, record: AssocRspRecord) {
        *self.parse_result.borrow_mut() = Some(record);
    }

    pub fn drain_sme(&mut self) -> Vec<SmeNotification> {
        let mut msgs = vec![];
        while let Ok(Some(msg)) = self.sme_stream.try_next() {
            msgs.push(msg);
        }
        msgs
    }
}

pub fn fake_session() -> Session {
    let mut session = Session::new(BSSID);
    session.ssid = b"fakenet".to_vec();
    session.channel = WlanChannel::new(1, Cbw::Cbw20);
    session.rates = vec![SupportedRate(2), SupportedRate(4), SupportedRate(11)];
    session
}

pub fn fake_bss_description(bssid: MacAddr, channel: u8) -> BssDescription {
    BssDescription {
        bssid,
        ssid: b"fakenet".to_vec(),
        channel: WlanChannel::new(channel, Cbw::Cbw20),
        beacon_period: 100,
        cap: CapabilityInfo(0).with_ess(true),
        rates: vec![SupportedRate(0x8C), SupportedRate(0x12), SupportedRate(0x18)],
        ht_cap: None,
        vht_cap: None,
        he_cap_present: false,
        sec_chan_offset: SecChanOffset::None,
        qos_capable: true,
        reg_max_power: 23,
        ap_power_constraint: 0,
    }
}

pub fn fake_assoc_rsp_record(status: StatusCode, raw_aid: u16) -> AssocRspRecord {
    AssocRspRecord {
        status,
        raw_aid,
        cap: CapabilityInfo(0).with_ess(true),
        rates: vec![SupportedRate(2), SupportedRate(4), SupportedRate(11)],
        ht_cap: None,
        vht_cap: None,
        edca: None,
        wmm_edca: None,
        ric_data: None,
        transfer_target: None,
    }
}
