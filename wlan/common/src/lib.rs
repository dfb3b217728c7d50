// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Domain types shared by the client MLME engine: MAC-level identifiers and
//! codes, information-element records, BSS descriptions, the event timer and
//! the unbounded message sink.

pub mod bss;
pub mod error;
pub mod ie;
pub mod mac;
pub mod sink;
pub mod test_utils;
pub mod timer;
