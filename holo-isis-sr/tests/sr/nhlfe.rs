//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::net::IpAddr;
use std::time::Duration;

use const_addrs::{ip4, ip6};
use holo_isis_sr::config::SrDbCfg;
use holo_isis_sr::error::{Error, InconsistentError};
use holo_isis_sr::nhlfe::{Nhlfe, NhlfeEvent, NhlfeState, stack_depth};
use holo_isis_sr::packet::{NodeLsp, PrefixSidFlags, SrCapabilitiesFlags};
use holo_isis_sr::prefix::SidStatus;
use holo_utils::mpls::{Label, LabelRange};
use maplit::btreemap;

use super::*;

const NH2: IpAddr = IpAddr::V4(ip4!("10.0.1.2"));
const NH3: IpAddr = IpAddr::V4(ip4!("10.0.2.3"));

// Topology used by most tests: the local router (system 1) reaches system 3
// either directly or through system 2. System 3 originates the prefix.
fn topology(test: &mut TestInstance, p: IpNetwork, flags: PrefixSidFlags) {
    test.db().spf_complete(spf_result(btreemap! {
        p => spf_route(3, &[(NH2, 1, 2), (NH3, 2, 3)]),
    }));
    test.db().lsp_update(node_lsp(2, SRGB, btreemap! {})).unwrap();
    test.db()
        .lsp_update(node_lsp(3, SRGB, btreemap! { p => prefix_sid(flags, 10) }))
        .unwrap();
}

// Single path towards system 2, which originates the prefix.
fn direct_route(p: IpNetwork) -> SpfResult {
    spf_result(btreemap! { p => spf_route(2, &[(NH2, 1, 2)]) })
}

fn direct_topology(test: &mut TestInstance, p: IpNetwork) {
    test.db().spf_complete(direct_route(p));
    test.db()
        .lsp_update(node_lsp(
            2,
            SRGB,
            btreemap! { p => prefix_sid(PrefixSidFlags::N, 10) },
        ))
        .unwrap();
}

#[test]
fn test_fsm() {
    let mut nhlfe = Nhlfe::new(NH2, 1, Some(system_id(2)));
    assert_eq!(nhlfe.state, NhlfeState::Idle);

    assert!(matches!(
        nhlfe.fsm(NhlfeEvent::Installed),
        Err(Error::Inconsistent(InconsistentError::NhlfeUnexpectedEvent(
            NhlfeState::Idle,
            NhlfeEvent::Installed
        )))
    ));
    assert!(nhlfe.fsm(NhlfeEvent::PathLost).is_err());
    assert_eq!(nhlfe.state, NhlfeState::Idle);

    nhlfe.fsm(NhlfeEvent::Computed).unwrap();
    assert_eq!(nhlfe.state, NhlfeState::New);
    assert!(nhlfe.fsm(NhlfeEvent::Computed).is_err());
    assert!(nhlfe.fsm(NhlfeEvent::PathLost).is_err());

    nhlfe.fsm(NhlfeEvent::Installed).unwrap();
    assert!(nhlfe.is_active());
    assert!(nhlfe.fsm(NhlfeEvent::Installed).is_err());

    nhlfe.fsm(NhlfeEvent::PathLost).unwrap();
    assert_eq!(nhlfe.state, NhlfeState::Unactive);
    assert!(nhlfe.unactive_since.is_some());
    assert!(nhlfe.fsm(NhlfeEvent::Computed).is_err());

    nhlfe.fsm(NhlfeEvent::Installed).unwrap();
    assert_eq!(nhlfe.state, NhlfeState::Active);
    assert!(nhlfe.unactive_since.is_none());

    nhlfe.fsm(NhlfeEvent::Withdrawn).unwrap();
    assert_eq!(nhlfe.state, NhlfeState::Idle);
    nhlfe.fsm(NhlfeEvent::Withdrawn).unwrap();
    assert_eq!(nhlfe.state, NhlfeState::Idle);
}

#[test]
fn test_stack_depth() {
    assert_eq!(stack_depth(Label::new(Label::IMPLICIT_NULL)), 0);
    assert_eq!(stack_depth(Label::new(Label::IPV4_EXPLICIT_NULL)), 1);
    assert_eq!(stack_depth(Label::new(16010)), 1);
}

#[tokio::test(start_paused = true)]
async fn test_penultimate_and_transit_hops() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.3/32");

    topology(&mut test, p, PrefixSidFlags::N);

    let srp = test.srp(&p);
    assert_eq!(srp.status, SidStatus::Unchanged);
    assert_eq!(srp.sr_label, Some(Label::new(16010)));
    assert_eq!(srp.nhlfes.len(), 2);
    assert!(srp.nhlfes.iter().all(|nhlfe| nhlfe.is_active()));
    // Transit hop.
    assert_eq!(srp.nhlfes[0].nexthop, NH2);
    assert_eq!(srp.nhlfes[0].nh_system_id, Some(system_id(2)));
    assert_eq!(srp.nhlfes[0].label_in, Some(Label::new(16010)));
    assert_eq!(srp.nhlfes[0].label_out, Some(Label::new(16010)));
    // Penultimate hop.
    assert_eq!(srp.nhlfes[1].nexthop, NH3);
    assert_eq!(srp.nhlfes[1].label_in, Some(Label::new(16010)));
    assert_eq!(
        srp.nhlfes[1].label_out,
        Some(Label::new(Label::IMPLICIT_NULL))
    );

    assert_eq!(
        test.ibus_msgs(),
        vec![
            install_msg(16010, NH2, 1, 16010, Some(p), false),
            install_msg(16010, NH3, 2, Label::IMPLICIT_NULL, Some(p), false),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_nexthop_srgb() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.3/32");

    test.db().spf_complete(spf_result(btreemap! {
        p => spf_route(3, &[(NH2, 1, 2)]),
    }));
    test.db()
        .lsp_update(node_lsp(2, LabelRange::new(20000, 27999), btreemap! {}))
        .unwrap();
    test.db()
        .lsp_update(node_lsp(
            3,
            SRGB,
            btreemap! { p => prefix_sid(PrefixSidFlags::N, 10) },
        ))
        .unwrap();
    assert_eq!(test.srp(&p).nhlfes[0].label_out, Some(Label::new(20010)));
    test.run_timers().await;
    test.ibus_msgs();

    // Only the output label changes, so the entry is replaced in place.
    test.db()
        .lsp_update(node_lsp(2, LabelRange::new(30000, 37999), btreemap! {}))
        .unwrap();
    assert_eq!(test.run_timers().await, 1);
    assert_eq!(test.srp(&p).nhlfes[0].label_out, Some(Label::new(30010)));
    assert_eq!(
        test.ibus_msgs(),
        vec![install_msg(16010, NH2, 1, 30010, Some(p), true)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_null() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p4 = prefix("10.0.0.3/32");
    let p6 = prefix("2001:db8::3/128");
    let nh6 = IpAddr::from(ip6!("fe80::3"));

    test.db().spf_complete(spf_result(btreemap! {
        p4 => spf_route(3, &[(NH3, 2, 3)]),
        p6 => spf_route(3, &[(nh6, 2, 3)]),
    }));
    let flags = PrefixSidFlags::N | PrefixSidFlags::P | PrefixSidFlags::E;
    test.db()
        .lsp_update(node_lsp(
            3,
            SRGB,
            btreemap! {
                p4 => prefix_sid(flags, 10),
                p6 => prefix_sid(flags, 20),
            },
        ))
        .unwrap();

    assert_eq!(
        test.srp(&p4).nhlfes[0].label_out,
        Some(Label::new(Label::IPV4_EXPLICIT_NULL))
    );
    assert_eq!(
        test.srp(&p6).nhlfes[0].label_out,
        Some(Label::new(Label::IPV6_EXPLICIT_NULL))
    );
}

#[tokio::test(start_paused = true)]
async fn test_no_php() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.3/32");

    topology(&mut test, p, PrefixSidFlags::N | PrefixSidFlags::P);

    let srp = test.srp(&p);
    assert_eq!(srp.nhlfes[1].nexthop, NH3);
    assert_eq!(srp.nhlfes[1].label_out, Some(Label::new(16010)));
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_af() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.3/32");

    test.db().spf_complete(spf_result(btreemap! {
        p => spf_route(3, &[(NH2, 1, 2)]),
    }));
    // System 2 only forwards MPLS-encapsulated IPv6 traffic.
    let mut cap = router_cap(SRGB);
    cap.flags = SrCapabilitiesFlags::V;
    test.db()
        .lsp_update(NodeLsp::new(system_id(2), Some(cap)))
        .unwrap();
    test.db()
        .lsp_update(node_lsp(
            3,
            SRGB,
            btreemap! { p => prefix_sid(PrefixSidFlags::N, 10) },
        ))
        .unwrap();

    let srp = test.srp(&p);
    assert_eq!(srp.sr_label, Some(Label::new(16010)));
    assert_eq!(srp.nhlfes[0].state, NhlfeState::Idle);
    assert!(test.ibus_msgs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stack_depth_exceeded() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.3/32");

    test.db().msd_update(0);
    assert_eq!(test.db_ref().self_node().unwrap().cap.msd, Some(0));
    topology(&mut test, p, PrefixSidFlags::N);

    // Popping the label at the penultimate hop doesn't push anything.
    let srp = test.srp(&p);
    assert_eq!(srp.nhlfes[0].state, NhlfeState::Idle);
    assert_eq!(srp.nhlfes[0].label_out, None);
    assert_eq!(srp.nhlfes[1].state, NhlfeState::Active);
    assert_eq!(
        test.ibus_msgs(),
        vec![install_msg(16010, NH3, 2, Label::IMPLICIT_NULL, Some(p), false)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_remote_index_out_of_range() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.2/32");

    test.db().spf_complete(direct_route(p));
    test.db()
        .lsp_update(node_lsp(
            2,
            SRGB,
            btreemap! { p => prefix_sid(PrefixSidFlags::N, 8000) },
        ))
        .unwrap();

    let srp = test.srp(&p);
    assert_eq!(srp.status, SidStatus::Idle);
    assert_eq!(srp.sr_label, None);
    assert_eq!(srp.nhlfes.len(), 1);
    assert_eq!(srp.nhlfes[0].state, NhlfeState::Idle);
    assert!(test.ibus_msgs().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_label_stability() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.3/32");

    topology(&mut test, p, PrefixSidFlags::N);
    assert_eq!(test.run_timers().await, 1);
    test.ibus_msgs();

    // Recomputing an unchanged topology doesn't touch the dataplane.
    test.db().spf_complete(spf_result(btreemap! {
        p => spf_route(3, &[(NH2, 1, 2), (NH3, 2, 3)]),
    }));
    assert_eq!(test.run_timers().await, 1);
    assert!(test.ibus_msgs().is_empty());

    let srp = test.srp(&p);
    assert!(srp.nhlfes.iter().all(|nhlfe| nhlfe.is_active()));
    assert!(
        srp.nhlfes
            .iter()
            .all(|nhlfe| nhlfe.label_in == Some(Label::new(16010)))
    );
}

#[tokio::test(start_paused = true)]
async fn test_unactive_hold_time() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.2/32");

    direct_topology(&mut test, p);
    assert_eq!(test.srp(&p).nhlfes[0].state, NhlfeState::Active);
    test.ibus_msgs();

    // Path lost.
    test.db().spf_complete(SpfResult::default());
    assert_eq!(test.run_timers().await, 1);
    let nhlfe = &test.srp(&p).nhlfes[0];
    assert_eq!(nhlfe.state, NhlfeState::Unactive);
    assert_eq!(nhlfe.label_in, Some(Label::new(16010)));
    assert_eq!(test.ibus_msgs(), vec![uninstall_msg(16010, NH2, 1, Some(p))]);

    // Path restored within the hold time.
    test.db().spf_complete(direct_route(p));
    assert_eq!(test.run_timers().await, 1);
    assert_eq!(test.srp(&p).nhlfes[0].state, NhlfeState::Active);
    assert_eq!(
        test.ibus_msgs(),
        vec![install_msg(
            16010,
            NH2,
            1,
            Label::IMPLICIT_NULL,
            Some(p),
            false
        )]
    );

    // Path lost for longer than the hold time.
    test.db().spf_complete(SpfResult::default());
    assert_eq!(test.run_timers().await, 1);
    test.ibus_msgs();
    let hold_time = u64::from(SrDbCfg::DFLT_NHLFE_HOLD_TIME);
    tokio::time::sleep(Duration::from_secs(hold_time)).await;
    assert!(test.srp(&p).nhlfes[0].is_hold_expired(Duration::from_secs(hold_time)));

    test.db().spf_complete(SpfResult::default());
    assert_eq!(test.run_timers().await, 1);
    assert!(test.srp(&p).nhlfes.is_empty());
    assert!(test.ibus_msgs().is_empty());
    // The prefix keeps its input label.
    assert_eq!(test.srp(&p).sr_label, Some(Label::new(16010)));
}

#[tokio::test(start_paused = true)]
async fn test_input_label_change() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let p = prefix("10.0.0.2/32");

    direct_topology(&mut test, p);
    assert_eq!(test.run_timers().await, 1);
    test.ibus_msgs();

    test.db().srgb_update(30000, 37999).unwrap();
    assert_eq!(test.run_timers().await, 1);

    let nhlfe = &test.srp(&p).nhlfes[0];
    assert_eq!(nhlfe.state, NhlfeState::Active);
    assert_eq!(nhlfe.label_in, Some(Label::new(30010)));
    assert_eq!(
        test.ibus_msgs(),
        vec![
            uninstall_msg(16010, NH2, 1, Some(p)),
            install_msg(30010, NH2, 1, Label::IMPLICIT_NULL, Some(p), false),
        ]
    );
}
