// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! shine-proto: framed event protocol between invocations.
//!
//! A distant invocation running in remote mode reports progress as framed
//! messages on stdout, one per line:
//!
//! ```text
//! SHINE:<version>:<base64(json mapping)>
//! ```
//!
//! Version 3 is current. Version 2 messages, emitted by older peers, are
//! still decoded; everything else is rejected with a typed error so the
//! caller can bucket undecodable lines per node.

mod codec;
mod message;

pub use codec::{pack, unpack, UnpackError, MSG_MAGIC, MSG_VERSION};
pub use message::EventMessage;
