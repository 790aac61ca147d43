// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between the `tb` CLI and the daemon.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod query;
mod request;
mod response;
mod wire;

pub use query::Query;
pub use request::{Request, ResourceInput};
pub use response::{DaemonStatus, Response};
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request, write_response,
    ProtocolError, MAX_MESSAGE_BYTES,
};
