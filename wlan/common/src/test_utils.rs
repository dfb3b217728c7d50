// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

/// Asserts that an expression matches a pattern, optionally evaluating an
/// expression with the pattern's bindings.
#[macro_export]
macro_rules! assert_variant {
    ($expression:expr, $pattern:pat => $out:expr) => {
        match $expression {
            $pattern => $out,
            other => panic!("unexpected variant: {:?}", other),
        }
    };
    ($expression:expr, $pattern:pat) => {
        match $expression {
            $pattern => {}
            other => panic!("unexpected variant: {:?}", other),
        }
    };
}
