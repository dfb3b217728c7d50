// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use thiserror::Error;

/// Error raised by the external frame parser when a management frame body
/// cannot be decoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FrameParseError {
    #[error("frame body truncated")]
    Truncated,
    #[error("malformed information element")]
    MalformedIe,
    #[error("unsupported frame subtype")]
    UnsupportedSubtype,
}
