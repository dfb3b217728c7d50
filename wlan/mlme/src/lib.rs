// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Client-side IEEE Std 802.11 MLME association-response processing and
//! 802.11r fast-transition (FT) pre-authentication, as a library for SoftMAC
//! hardware. The engine is driven by a single serialized event queue owned by
//! the embedder: management frames, scan lifecycle events and timer expiries
//! all re-enter through the methods on [`client::Session`], and outcomes are
//! reported to the SME layer through an unbounded sink.
//!
//! Byte-level frame layouts are owned by an external parser (the
//! [`client::FrameParser`] trait); firmware and radio operations go through
//! the [`device::DeviceOps`] bridge.

pub mod client;
pub mod device;
pub mod error;

pub use wlan_common as common;
