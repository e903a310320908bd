//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

#![cfg_attr(
    feature = "testing",
    allow(dead_code, unused_variables, unused_imports)
)]

pub mod adjacency;
pub mod collections;
pub mod config;
pub mod database;
pub mod debug;
pub mod error;
pub mod instance;
pub mod nhlfe;
pub mod node;
pub mod packet;
pub mod prefix;
pub mod southbound;
pub mod spf;
pub mod tasks;
