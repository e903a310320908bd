//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::time::Duration;

use holo_isis_sr::config::SrDbCfg;
use holo_isis_sr::spf::SpfResult;
use holo_isis_sr::tasks::messages::input::{ProtocolMsg, UpdateTimerMsg};

use super::*;

#[tokio::test(start_paused = true)]
async fn test_update_coalescing() {
    let mut test = TestInstance::new(SrDbCfg::default());
    assert!(!test.db_ref().update_pending());

    test.db().spf_complete(SpfResult::default());
    test.db().spf_complete(SpfResult::default());
    test.db().msd_update(8);
    assert!(test.db_ref().update_pending());

    assert_eq!(test.run_timers().await, 1);
    assert!(!test.db_ref().update_pending());
    assert_eq!(test.db_ref().stats.update_pass_count, 1);

    // New events after the pass schedule another one.
    test.db().spf_complete(SpfResult::default());
    assert_eq!(test.run_timers().await, 1);
    assert_eq!(test.db_ref().stats.update_pass_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_update_window_not_extended() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().spf_complete(SpfResult::default());
    tokio::time::sleep(Duration::from_millis(60)).await;
    test.db().spf_complete(SpfResult::default());

    // The pass runs when the first window closes.
    tokio::time::sleep(Duration::from_millis(41)).await;
    assert_eq!(test.process_timers(), 1);
    assert_eq!(test.db_ref().stats.update_pass_count, 1);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(test.process_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_delay_config() {
    let mut config = SrDbCfg::default();
    config.update_delay = 500;
    let mut test = TestInstance::new(config);

    test.db().spf_complete(SpfResult::default());
    assert_eq!(test.run_timers().await, 0);
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(test.process_timers(), 1);
    assert_eq!(test.db_ref().stats.update_pass_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_update_timer_not_pending() {
    let mut test = TestInstance::new(SrDbCfg::default());

    // Spurious expiry.
    test.instance
        .process_msg(ProtocolMsg::UpdateTimer(UpdateTimerMsg {
            area: AREA.to_owned(),
        }));
    assert_eq!(test.db_ref().stats.update_pass_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_cancelled() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().spf_complete(SpfResult::default());
    test.instance.area_delete(AREA).unwrap();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(test.protocol_input_rx.update_timer.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn test_protocol_input_recv() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().spf_complete(SpfResult::default());
    let msg = test.protocol_input_rx.recv().await.unwrap();
    assert!(matches!(
        &msg,
        ProtocolMsg::UpdateTimer(msg) if msg.area == AREA
    ));
    test.instance.process_msg(msg);
    assert_eq!(test.db_ref().stats.update_pass_count, 1);
}
