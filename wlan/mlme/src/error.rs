// Copyright 2022 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;
use wlan_common::error::FrameParseError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("error parsing frame: {0}")]
    ParsingFrame(#[from] FrameParseError),
    #[error("firmware bridge rejected {0}")]
    Bridge(&'static str),
    #[error("local capability lookup failed")]
    CapabilityLookup,
    #[error("pre-authentication already in progress")]
    PreauthInProgress,
    #[error("11r connection is missing FT IEs")]
    MissingFtIes,
    #[error("scan could not be started")]
    ScanStart,
    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}
