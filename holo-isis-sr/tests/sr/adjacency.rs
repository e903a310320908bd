//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::net::IpAddr;

use const_addrs::{ip4, ip6};
use holo_isis_sr::adjacency::AdjacencyInfo;
use holo_isis_sr::collections::AdjacencyKey;
use holo_isis_sr::config::{ADJ_SID_RANGE, SrDbCfg};
use holo_isis_sr::error::{Error, NotFoundError};
use holo_isis_sr::nhlfe::NhlfeState;
use holo_isis_sr::packet::{AdjSidFlags, AdjSidStlv, NodeAdjSid};
use holo_utils::ip::AddressFamily;
use holo_utils::mpls::Label;
use holo_utils::sr::Sid;
use maplit::{btreemap, btreeset};

use super::*;

const NBR4: IpAddr = IpAddr::V4(ip4!("10.0.1.2"));
const NBR6: IpAddr = IpAddr::V6(ip6!("fe80::2"));

fn adjacency(adj_id: u32, broadcast: bool, addrs: &[IpAddr]) -> AdjacencyInfo {
    AdjacencyInfo::new(
        adj_id,
        system_id(2),
        10,
        broadcast,
        addrs.iter().copied().collect(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_adj_sid_lifecycle() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().adjacency_up(adjacency(1, false, &[NBR4]));

    let sra = test.db_ref().adjacency(1, AddressFamily::Ipv4).unwrap();
    assert!(sra.is_local());
    assert_eq!(sra.addr, NBR4);
    assert_eq!(sra.nhlfe.state, NhlfeState::Active);
    let label = sra.nhlfe.label_in.unwrap();
    assert!(ADJ_SID_RANGE.contains(label));
    assert_eq!(
        sra.nhlfe.label_out,
        Some(Label::new(Label::IMPLICIT_NULL))
    );
    let adj_sid = sra.adj_sid.unwrap();
    assert_eq!(adj_sid.flags, AdjSidFlags::V | AdjSidFlags::L);
    assert_eq!(adj_sid.sid, Sid::Label(label));
    assert!(!adj_sid.is_lan());
    assert!(
        test.db_ref()
            .self_node()
            .unwrap()
            .adj_sids
            .contains(&AdjacencyKey::Local(1, AddressFamily::Ipv4))
    );
    assert!(test.label_is_allocated(label.get()));
    assert_eq!(
        test.ibus_msgs(),
        vec![install_msg(
            label.get(),
            NBR4,
            10,
            Label::IMPLICIT_NULL,
            None,
            false
        )]
    );

    // The label is returned to the label manager once the adjacency goes
    // down, and can be allocated again.
    test.db().adjacency_down(1).unwrap();
    assert!(test.db_ref().adjacency(1, AddressFamily::Ipv4).is_none());
    assert!(test.db_ref().self_node().unwrap().adj_sids.is_empty());
    assert!(!test.label_is_allocated(label.get()));
    assert_eq!(
        test.ibus_msgs(),
        vec![uninstall_msg(label.get(), NBR4, 10, None)]
    );

    test.db().adjacency_up(adjacency(2, false, &[NBR4]));
    let sra = test.db_ref().adjacency(2, AddressFamily::Ipv4).unwrap();
    assert_eq!(sra.nhlfe.label_in, Some(label));
}

#[tokio::test(start_paused = true)]
async fn test_adj_sid_dual_stack() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().adjacency_up(adjacency(1, false, &[NBR4, NBR6]));

    let sra4 = test.db_ref().adjacency(1, AddressFamily::Ipv4).unwrap();
    let sra6 = test.db_ref().adjacency(1, AddressFamily::Ipv6).unwrap();
    assert_eq!(sra6.addr, NBR6);
    assert!(
        sra6.adj_sid
            .unwrap()
            .flags
            .contains(AdjSidFlags::F | AdjSidFlags::V | AdjSidFlags::L)
    );
    assert!(!sra4.adj_sid.unwrap().flags.contains(AdjSidFlags::F));
    assert_ne!(sra4.nhlfe.label_in, sra6.nhlfe.label_in);
    assert_eq!(test.ibus_msgs().len(), 2);

    test.db().adjacency_down(1).unwrap();
    assert_eq!(test.db_ref().adjacencies().count(), 0);
    assert_eq!(test.ibus_msgs().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_adj_sid_lan() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().adjacency_up(adjacency(1, true, &[NBR4]));

    let sra = test.db_ref().adjacency(1, AddressFamily::Ipv4).unwrap();
    let adj_sid = sra.adj_sid.unwrap();
    assert!(adj_sid.is_lan());
    assert_eq!(adj_sid.nbr_system_id, Some(system_id(2)));
}

#[tokio::test(start_paused = true)]
async fn test_adjacency_refresh() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().adjacency_up(adjacency(1, false, &[NBR4]));
    test.ibus_msgs();

    // The neighbor lost its IPv4 address and gained an IPv6 one.
    test.db().adjacency_up(adjacency(1, false, &[NBR6]));
    assert!(test.db_ref().adjacency(1, AddressFamily::Ipv4).is_none());
    assert!(test.db_ref().adjacency(1, AddressFamily::Ipv6).is_some());
    assert_eq!(test.db_ref().adjacencies().count(), 1);
    let msgs = test.ibus_msgs();
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0], uninstall_msg(5000, NBR4, 10, None));
}

#[tokio::test(start_paused = true)]
async fn test_adjacency_down_unknown() {
    let mut test = TestInstance::new(SrDbCfg::default());

    let result = test.db().adjacency_down(1);
    assert!(matches!(
        result,
        Err(Error::NotFound(NotFoundError::Adjacency(1)))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_adjacency_up_while_disabled() {
    let mut test = TestInstance::new(SrDbCfg::default());

    test.db().disable();
    test.db().adjacency_up(adjacency(1, false, &[NBR4]));
    assert_eq!(test.db_ref().adjacencies().count(), 0);
    assert!(test.ibus_msgs().is_empty());

    // Adjacencies that are up get their Adjacency-SIDs once SR is enabled.
    test.db().enable().unwrap();
    let sra = test.db_ref().adjacency(1, AddressFamily::Ipv4).unwrap();
    assert_eq!(sra.nhlfe.state, NhlfeState::Active);
    assert_eq!(test.ibus_msgs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_adj_sid_range_exhausted() {
    let mut test = TestInstance::new(SrDbCfg::default());

    // Take every label of the Adjacency-SID range.
    {
        let mut label_manager = test.label_manager.lock().unwrap();
        while label_manager.label_request_from(ADJ_SID_RANGE).is_ok() {}
    }

    test.db().adjacency_up(adjacency(1, false, &[NBR4]));
    let sra = test.db_ref().adjacency(1, AddressFamily::Ipv4).unwrap();
    assert_eq!(sra.nhlfe.state, NhlfeState::Idle);
    assert!(sra.adj_sid.is_none());
    assert!(test.ibus_msgs().is_empty());

    // Allocation is retried by the next recomputation pass.
    test.label_manager
        .lock()
        .unwrap()
        .label_release(Label::new(5100));
    test.db().spf_complete(SpfResult::default());
    assert_eq!(test.run_timers().await, 1);
    let sra = test.db_ref().adjacency(1, AddressFamily::Ipv4).unwrap();
    assert_eq!(sra.nhlfe.state, NhlfeState::Active);
    assert_eq!(sra.nhlfe.label_in, Some(Label::new(5100)));
}

#[tokio::test(start_paused = true)]
async fn test_remote_adj_sids() {
    let mut test = TestInstance::new(SrDbCfg::default());
    let addr = IpAddr::from(ip4!("10.0.5.3"));
    let stlv = AdjSidStlv::new(
        AdjSidFlags::V | AdjSidFlags::L,
        0,
        None,
        Sid::Label(Label::new(24000)),
    );

    let mut lsp = node_lsp(2, SRGB, btreemap! {});
    lsp.adj_sids.push(NodeAdjSid::new(addr, stlv));
    test.db().lsp_update(lsp).unwrap();

    let key = AdjacencyKey::Remote(system_id(2), addr, None);
    let node = test.db_ref().node(&system_id(2)).unwrap();
    assert_eq!(node.adj_sids, btreeset![key]);
    let sra = test.db_ref().adjacencies().next().unwrap();
    assert!(!sra.is_local());
    assert_eq!(sra.owner, system_id(2));
    assert_eq!(sra.adj_sid, Some(stlv));
    assert_eq!(sra.nhlfe.state, NhlfeState::Idle);
    assert!(test.ibus_msgs().is_empty());

    // Withdrawn Adjacency-SID.
    test.db()
        .lsp_update(node_lsp(2, SRGB, btreemap! {}))
        .unwrap();
    assert_eq!(test.db_ref().adjacencies().count(), 0);
    assert!(test.db_ref().node(&system_id(2)).unwrap().adj_sids.is_empty());
}
