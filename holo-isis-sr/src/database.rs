//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use holo_utils::ip::{AddressFamily, IpAddrExt};
use holo_utils::mpls::{Label, LabelManager, LabelManagerError, LabelRange};
use holo_utils::sr::{IgpAlgoType, Sid, SrCfgPrefixSid};
use holo_utils::task::TimeoutTask;
use ipnetwork::IpNetwork;
use itertools::Itertools;
use serde::Serialize;

use crate::adjacency::{AdjacencyInfo, SrAdjacency};
use crate::collections::{
    Adjacencies, AdjacencyId, AdjacencyKey, NodeIndex, Nodes, PrefixIndex,
    Prefixes,
};
use crate::config::{ADJ_SID_RANGE, SrDbCfg};
use crate::debug::Debug;
use crate::error::{Error, InconsistentError, NotFoundError};
use crate::instance::{InstanceChannelsTx, InstanceShared};
use crate::nhlfe::{Nhlfe, NhlfeState, stack_depth};
use crate::node::SrNode;
use crate::packet::{
    AdjSidFlags, AdjSidStlv, NodeAdjSid, NodeLsp, PrefixSidStlv, RouterCap,
    SrCapabilitiesFlags, SystemId,
};
use crate::prefix::{
    SidStatus, SrPrefix, prefix_sid_output_label, sid_to_label,
};
use crate::spf::SpfResult;
use crate::tasks;

// Segment Routing database of one IS-IS area.
#[derive(Debug)]
pub struct SrDatabase {
    pub area: String,
    pub config: SrDbCfg,
    pub stats: SrDbStats,
    system_id: SystemId,
    enabled: bool,
    update_pending: bool,
    update_timer: Option<TimeoutTask>,
    srgb_reserved: bool,
    adj_range_reserved: bool,
    nodes: Nodes,
    prefixes: Prefixes,
    adjacencies: Adjacencies,
    // Last SPF result received from the IS-IS core.
    spf: SpfResult,
    // Protocol adjacencies that are up, kept while SR is disabled.
    protocol_adjs: BTreeMap<AdjacencyId, AdjacencyInfo>,
    shared: InstanceShared,
    tx: InstanceChannelsTx,
}

#[derive(Debug, Default)]
#[derive(Serialize)]
pub struct SrDbStats {
    pub update_pass_count: u64,
}

// ===== impl SrDatabase =====

impl SrDatabase {
    pub fn new(
        area: &str,
        system_id: SystemId,
        config: SrDbCfg,
        shared: InstanceShared,
        tx: InstanceChannelsTx,
    ) -> SrDatabase {
        SrDatabase {
            area: area.to_owned(),
            config,
            stats: Default::default(),
            system_id,
            enabled: false,
            update_pending: false,
            update_timer: None,
            srgb_reserved: false,
            adj_range_reserved: false,
            nodes: Default::default(),
            prefixes: Default::default(),
            adjacencies: Default::default(),
            spf: Default::default(),
            protocol_adjs: Default::default(),
            shared,
            tx,
        }
    }

    // Enables Segment Routing.
    //
    // Nothing is retained when the SRGB or the Adjacency-SID range can't be
    // reserved.
    pub fn enable(&mut self) -> Result<(), Error> {
        if self.enabled {
            return Ok(());
        }

        Debug::SrEnable.log();

        // Reserve label ranges.
        let srgb = self.config.srgb();
        {
            let mut label_manager = self.shared.label_manager.lock().unwrap();
            label_manager.range_reserve(srgb)?;
            if let Err(error) = label_manager.range_reserve(ADJ_SID_RANGE) {
                label_manager.range_release(srgb);
                return Err(error.into());
            }
        }
        Debug::LabelRangeReserve(&srgb).log();
        Debug::LabelRangeReserve(&ADJ_SID_RANGE).log();
        self.srgb_reserved = true;
        self.adj_range_reserved = true;
        self.enabled = true;

        // Create self node.
        let node = SrNode::new(self.system_id, self.self_cap(), &self.area);
        self.nodes.insert(node)?;
        Debug::NodeCreate(&self.system_id).log();

        // Add locally configured Prefix-SIDs.
        let prefixes =
            self.config.prefix_sids.keys().copied().collect_vec();
        for prefix in prefixes {
            if let Err(error) = self
                .prefix_add(prefix)
                .and_then(|srp_idx| self.prefix_commit(srp_idx))
            {
                error.log();
            }
        }

        // Add Adjacency-SIDs for the adjacencies that are already up.
        let adjs = self.protocol_adjs.values().cloned().collect_vec();
        for adj in &adjs {
            self.adj_sids_add(adj);
        }

        Ok(())
    }

    // Disables Segment Routing, withdrawing all NHLFEs and releasing all
    // reserved labels.
    pub fn disable(&mut self) {
        if !self.enabled {
            return;
        }

        Debug::SrDisable.log();

        // Cancel pending update.
        self.update_timer = None;
        self.update_pending = false;

        // Withdraw all NHLFEs.
        let ibus_tx = &self.tx.ibus;
        for srp in self.prefixes.iter_mut() {
            let prefix = srp.prefix;
            for nhlfe in &mut srp.nhlfes {
                if let Err(error) = nhlfe.withdraw(Some(&prefix), ibus_tx) {
                    error.log();
                }
            }
        }
        for sra in self.adjacencies.iter_mut().filter(|sra| sra.is_local()) {
            if let Err(error) = sra.nhlfe.withdraw(None, ibus_tx) {
                error.log();
            }
        }

        // Release label ranges, along with all labels allocated from them.
        let srgb = self.config.srgb();
        {
            let mut label_manager = self.shared.label_manager.lock().unwrap();
            if self.adj_range_reserved {
                label_manager.range_release(ADJ_SID_RANGE);
                Debug::LabelRangeRelease(&ADJ_SID_RANGE).log();
                self.adj_range_reserved = false;
            }
            if self.srgb_reserved {
                label_manager.range_release(srgb);
                Debug::LabelRangeRelease(&srgb).log();
                self.srgb_reserved = false;
            }
        }

        self.adjacencies.clear();
        self.prefixes.clear();
        self.nodes.clear();
        self.spf = Default::default();
        self.enabled = false;
    }

    // Changes the local SRGB.
    pub fn srgb_update(&mut self, lower: u32, upper: u32) -> Result<(), Error> {
        let srgb = LabelRange::new(lower, upper);
        if !srgb.is_valid() {
            return Err(InconsistentError::InvalidSrgb(srgb).into());
        }
        let old_srgb = self.config.srgb();
        if srgb == old_srgb {
            return Ok(());
        }

        if self.enabled {
            let mut label_manager = self.shared.label_manager.lock().unwrap();
            if self.srgb_reserved {
                label_manager.range_release(old_srgb);
            }
            if let Err(error) = label_manager.range_reserve(srgb) {
                if !self.srgb_reserved {
                    return Err(error.into());
                }

                // Restore the previous reservation and the labels claimed
                // from it.
                match label_manager.range_reserve(old_srgb) {
                    Ok(()) => {
                        for label in
                            self.prefixes.iter().filter_map(|srp| srp.sr_label)
                        {
                            if let Err(error) =
                                label_manager.label_claim(old_srgb, label)
                            {
                                Error::from(error).log();
                            }
                        }
                    }
                    Err(restore_error) => {
                        Error::from(restore_error).log();
                        Debug::LabelRangeRelease(&old_srgb).log();
                        self.srgb_reserved = false;
                        for srp in self.prefixes.iter_mut() {
                            srp.sr_label = None;
                        }
                    }
                }
                return Err(error.into());
            }
            if self.srgb_reserved {
                Debug::LabelRangeRelease(&old_srgb).log();
            }
            Debug::LabelRangeReserve(&srgb).log();
            self.srgb_reserved = true;

            // Labels from the previous SRGB were released along with it.
            for srp in self.prefixes.iter_mut() {
                srp.sr_label = None;
            }
        }

        self.config.srgb = srgb.into();
        if let Some((_, node)) = self.nodes.get_mut_by_system_id(&self.system_id)
        {
            node.cap.srgb = srgb;
        }
        if self.enabled {
            self.local_prefixes_revalidate();
            self.update_timer_add();
        }

        Ok(())
    }

    // Changes the locally advertised MSD.
    pub fn msd_update(&mut self, msd: u8) {
        self.config.msd = msd;
        if let Some((_, node)) = self.nodes.get_mut_by_system_id(&self.system_id)
        {
            node.cap.msd = Some(msd);
        }
        self.update_timer_add();
    }

    // Processes the SR content of an LSP originated by another node.
    pub fn lsp_update(&mut self, lsp: NodeLsp) -> Result<(), Error> {
        if !self.enabled {
            return Ok(());
        }

        let system_id = lsp.system_id;
        if system_id == self.system_id {
            Debug::LspIgnoreSelf.log();
            return Ok(());
        }

        // A node that stops advertising SR capabilities is removed.
        let Some(cap) = lsp.sr_cap else {
            if let Some((node_idx, _)) = self.nodes.get_by_system_id(&system_id)
            {
                self.node_del(node_idx);
            }
            return Ok(());
        };
        if !cap.is_valid() {
            return Err(InconsistentError::InvalidSrCapability(system_id).into());
        }

        // Create or update node.
        let cap_changed = match self.nodes.get_mut_by_system_id(&system_id) {
            Some((_, node)) => {
                let changed = node.cap != cap;
                if changed {
                    node.cap = cap.clone();
                    Debug::NodeUpdate(&system_id).log();
                }
                changed
            }
            None => {
                let mut node = SrNode::new(system_id, cap.clone(), &self.area);
                if self.is_neighbor(&system_id) {
                    node.neighbor = Some(self.system_id);
                }
                self.nodes.insert(node)?;
                Debug::NodeCreate(&system_id).log();
                true
            }
        };

        // Add or update Prefix-SIDs.
        let mut mutated = vec![];
        let mut advertised = BTreeSet::new();
        for (prefix, sid) in &lsp.prefix_sids {
            if !cap.algos.contains(&sid.algo) {
                Debug::PrefixUnsupportedAlgo(&system_id, prefix, sid.algo).log();
                continue;
            }

            match self.prefix_add_sid(system_id, *prefix, *sid) {
                Ok(srp_idx) => {
                    advertised.insert(*prefix);
                    mutated.push(srp_idx);
                }
                Err(error) => error.log(),
            }
        }

        // Delete Prefix-SIDs that are no longer advertised.
        let withdrawn = self
            .nodes
            .get_by_system_id(&system_id)
            .map(|(_, node)| {
                node.prefix_sids
                    .iter()
                    .filter(|prefix| !advertised.contains(*prefix))
                    .copied()
                    .collect_vec()
            })
            .unwrap_or_default();
        for prefix in withdrawn {
            let srp_idx = self.prefixes.get_by_prefix(&prefix).map(|(idx, _)| idx);
            if let Some(srp_idx) = srp_idx
                && let Err(error) = self.prefix_del(srp_idx)
            {
                error.log();
            }
        }

        // Record advertised Adjacency-SIDs.
        self.remote_adj_sids_update(system_id, &lsp.adj_sids);

        // Recompute the NHLFEs of all mutated prefixes.
        for srp_idx in mutated {
            if let Err(error) = self.prefix_commit(srp_idx) {
                error.log();
            }
        }

        // Output labels towards this node depend on its capabilities.
        if cap_changed {
            self.update_timer_add();
        }

        Ok(())
    }

    // Processes the purge of a node's LSP.
    pub fn lsp_purge(&mut self, system_id: SystemId) -> Result<(), Error> {
        if system_id == self.system_id {
            return Err(InconsistentError::SelfNodePurge.into());
        }
        if !self.enabled {
            return Ok(());
        }

        if let Some((node_idx, _)) = self.nodes.get_by_system_id(&system_id) {
            self.node_del(node_idx);
        }

        Ok(())
    }

    // Processes the completion of an SPF run.
    pub fn spf_complete(&mut self, result: SpfResult) {
        self.spf = result;
        self.update_timer_add();
    }

    // Creates the Adjacency-SIDs of a protocol adjacency that came up.
    pub fn adjacency_up(&mut self, adj: AdjacencyInfo) {
        let adj_id = adj.adj_id;
        let nbr_system_id = adj.nbr_system_id;
        let old_adj = self.protocol_adjs.insert(adj_id, adj.clone());
        if !self.enabled {
            return;
        }

        if let Some(old_adj) = &old_adj {
            self.adj_sids_del(adj_id);
            if old_adj.nbr_system_id != nbr_system_id {
                self.neighbor_update(&old_adj.nbr_system_id);
            }
        }
        self.adj_sids_add(&adj);
        self.neighbor_update(&nbr_system_id);
    }

    // Deletes the Adjacency-SIDs of a protocol adjacency that went down.
    pub fn adjacency_down(&mut self, adj_id: AdjacencyId) -> Result<(), Error> {
        let adj = self
            .protocol_adjs
            .remove(&adj_id)
            .ok_or(NotFoundError::Adjacency(adj_id))?;
        if !self.enabled {
            return Ok(());
        }

        self.adj_sids_del(adj_id);
        self.neighbor_update(&adj.nbr_system_id);

        Ok(())
    }

    // Creates an SR prefix for a locally configured Prefix-SID.
    //
    // Adding a prefix that already exists refreshes it.
    pub fn prefix_add(&mut self, prefix: IpNetwork) -> Result<PrefixIndex, Error> {
        let sid = self.prefix_sid_cfg(&prefix)?;
        self.prefix_add_sid(self.system_id, prefix, sid)
    }

    // Re-reads the configuration of a locally configured Prefix-SID.
    pub fn prefix_update(
        &mut self,
        prefix: IpNetwork,
    ) -> Result<PrefixIndex, Error> {
        let sid = self.prefix_sid_cfg(&prefix)?;
        let system_id = self.system_id;
        let (srp_idx, srp) = self
            .prefixes
            .get_mut_by_prefix(&prefix)
            .ok_or(NotFoundError::Prefix(prefix))?;
        if srp.owner != system_id {
            return Err(InconsistentError::PrefixOwnerConflict(
                prefix, srp.owner, system_id,
            )
            .into());
        }
        srp.update(sid);
        Debug::PrefixUpdate(srp).log();
        Ok(srp_idx)
    }

    // Looks up an SR prefix.
    pub fn prefix_find(
        &self,
        prefix: &IpNetwork,
    ) -> Option<(PrefixIndex, &SrPrefix)> {
        self.prefixes.get_by_prefix(prefix)
    }

    // Deletes an SR prefix, withdrawing its NHLFEs and releasing its input
    // label.
    pub fn prefix_del(&mut self, srp_idx: PrefixIndex) -> Result<(), Error> {
        let mut srp = self.prefixes.delete(srp_idx)?;
        Debug::PrefixDelete(&srp).log();

        let prefix = srp.prefix;
        for nhlfe in &mut srp.nhlfes {
            if let Err(error) = nhlfe.withdraw(Some(&prefix), &self.tx.ibus) {
                error.log();
            }
        }
        prefix_input_label_release(
            &mut srp,
            &self.config.srgb(),
            &self.shared.label_manager,
        );
        if let Some((_, node)) = self.nodes.get_mut_by_system_id(&srp.owner) {
            node.prefix_sids.remove(&prefix);
        }

        // A locally configured Prefix-SID may now take over the prefix.
        if srp.owner != self.system_id {
            self.prefix_cfg_restore(prefix);
        }

        Ok(())
    }

    // Consumes the pending changes of an SR prefix, recomputing its input
    // label and NHLFEs.
    pub fn prefix_commit(&mut self, srp_idx: PrefixIndex) -> Result<(), Error> {
        let srp = self
            .prefixes
            .get(srp_idx)
            .ok_or(NotFoundError::PrefixIndex(srp_idx))?;
        if !srp.is_pending() {
            return Ok(());
        }

        let result = self.prefix_sid_compute(srp_idx);
        if let Some(srp) = self.prefixes.get_mut(srp_idx) {
            srp.status = match srp.sr_label {
                Some(_) => SidStatus::Unchanged,
                None => SidStatus::Idle,
            };
        }
        result
    }

    // Configures a local Prefix-SID.
    pub fn prefix_sid_set(
        &mut self,
        prefix: IpNetwork,
        cfg: SrCfgPrefixSid,
    ) -> Result<(), Error> {
        self.config.prefix_sids.insert(prefix, cfg);
        if !self.enabled {
            return Ok(());
        }

        let exists = self
            .prefixes
            .get_by_prefix(&prefix)
            .is_some_and(|(_, srp)| srp.owner == self.system_id);
        let srp_idx = if exists {
            self.prefix_update(prefix)?
        } else {
            self.prefix_add(prefix)?
        };
        self.prefix_commit(srp_idx)
    }

    // Unconfigures a local Prefix-SID.
    pub fn prefix_sid_unset(&mut self, prefix: IpNetwork) -> Result<(), Error> {
        self.config.prefix_sids.remove(&prefix);

        let srp_idx = match self.prefixes.get_by_prefix(&prefix) {
            Some((srp_idx, srp)) if srp.owner == self.system_id => srp_idx,
            _ => return Ok(()),
        };
        self.prefix_del(srp_idx)
    }

    // Schedules a recomputation pass.
    //
    // Requests received while a pass is pending are coalesced into it.
    pub fn update_timer_add(&mut self) {
        if !self.enabled || self.update_pending {
            return;
        }

        let delay = self.config.update_delay();
        Debug::UpdateTimerStart(delay).log();
        let task = tasks::update_timer(
            &self.area,
            delay,
            &self.tx.protocol_input.update_timer,
        );
        self.update_timer = Some(task);
        self.update_pending = true;
    }

    // Processes the expiry of the update timer.
    pub fn process_update_timer(&mut self) {
        if !self.enabled || !self.update_pending {
            return;
        }

        Debug::UpdateTimerExpiry.log();
        self.update_timer = None;
        self.update_pass();
        self.update_pending = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn update_pending(&self) -> bool {
        self.update_pending
    }

    pub fn srgb(&self) -> LabelRange {
        self.config.srgb()
    }

    pub fn msd(&self) -> u8 {
        self.config.msd
    }

    pub fn algorithms(&self) -> &BTreeSet<IgpAlgoType> {
        &self.config.algorithms
    }

    pub fn self_system_id(&self) -> SystemId {
        self.system_id
    }

    pub fn self_node(&self) -> Option<&SrNode> {
        self.node(&self.system_id)
    }

    // Returns an iterator visiting all nodes, ordered by System ID.
    pub fn nodes(&self) -> impl Iterator<Item = &SrNode> + '_ {
        self.nodes.iter()
    }

    pub fn node(&self, system_id: &SystemId) -> Option<&SrNode> {
        self.nodes.get_by_system_id(system_id).map(|(_, node)| node)
    }

    // Returns an iterator visiting all SR prefixes, ordered by prefix.
    pub fn prefixes(&self) -> impl Iterator<Item = &SrPrefix> + '_ {
        self.prefixes.iter()
    }

    // Returns an iterator visiting all SR adjacencies.
    pub fn adjacencies(&self) -> impl Iterator<Item = &SrAdjacency> + '_ {
        self.adjacencies.iter()
    }

    // Returns the local Adjacency-SID of the given protocol adjacency and
    // address family.
    pub fn adjacency(
        &self,
        adj_id: AdjacencyId,
        af: AddressFamily,
    ) -> Option<&SrAdjacency> {
        self.adjacencies
            .get_by_key(&AdjacencyKey::Local(adj_id, af))
    }

    // ===== helper methods =====

    fn self_cap(&self) -> RouterCap {
        RouterCap::new(
            SrCapabilitiesFlags::I | SrCapabilitiesFlags::V,
            self.config.srgb(),
            self.config.algorithms.clone(),
            Some(self.config.msd),
        )
    }

    fn prefix_sid_cfg(&self, prefix: &IpNetwork) -> Result<PrefixSidStlv, Error> {
        let cfg = self
            .config
            .prefix_sids
            .get(prefix)
            .ok_or(NotFoundError::PrefixCfg(*prefix))?;
        Ok(PrefixSidStlv::from_cfg(prefix, cfg))
    }

    fn prefix_add_sid(
        &mut self,
        owner: SystemId,
        prefix: IpNetwork,
        sid: PrefixSidStlv,
    ) -> Result<PrefixIndex, Error> {
        if let Some((srp_idx, srp)) = self.prefixes.get_mut_by_prefix(&prefix)
            && srp.owner == owner
        {
            srp.update(sid);
            Debug::PrefixUpdate(srp).log();
            return Ok(srp_idx);
        }

        let Some((_, node)) = self.nodes.get_mut_by_system_id(&owner) else {
            if owner == self.system_id {
                return Err(InconsistentError::MissingSelfNode.into());
            }
            return Err(NotFoundError::Node(owner).into());
        };
        let (srp_idx, srp) =
            self.prefixes.insert(SrPrefix::new(prefix, sid, owner))?;
        node.prefix_sids.insert(prefix);
        Debug::PrefixAdd(srp).log();

        Ok(srp_idx)
    }

    // Resolves the input label of an SR prefix and reconciles its NHLFEs
    // with the last SPF result.
    //
    // NHLFE errors are logged and don't prevent other nexthops from being
    // processed.
    fn prefix_sid_compute(&mut self, srp_idx: PrefixIndex) -> Result<(), Error> {
        let srgb = self.config.srgb();
        let srp = self
            .prefixes
            .get_mut(srp_idx)
            .ok_or(NotFoundError::PrefixIndex(srp_idx))?;

        // Resolve input label.
        let result =
            prefix_input_label_update(srp, &srgb, &self.shared.label_manager);

        // Local prefixes don't have transit NHLFEs.
        if srp.owner == self.system_id {
            return result;
        }

        let prefix = srp.prefix;
        let sid = srp.sid;
        let route = self.spf.route(&prefix);
        let hold_time = self.config.nhlfe_hold_time();
        let msd = self.config.msd;
        let ibus_tx = &self.tx.ibus;
        let on_path = |nhlfe: &Nhlfe| {
            route.is_some_and(|route| {
                route.nexthops.iter().any(|nexthop| {
                    nexthop.addr == nhlfe.nexthop
                        && nexthop.ifindex == nhlfe.ifindex
                })
            })
        };

        // Handle NHLFEs whose nexthop is no longer on a shortest path.
        for nhlfe in srp.nhlfes.iter_mut().filter(|nhlfe| !on_path(nhlfe)) {
            let result = match nhlfe.state {
                NhlfeState::Active => nhlfe.deactivate(Some(&prefix), ibus_tx),
                NhlfeState::Unactive if !nhlfe.is_hold_expired(hold_time) => {
                    Ok(())
                }
                _ => nhlfe.withdraw(Some(&prefix), ibus_tx),
            };
            if let Err(error) = result {
                error.log();
            }
        }
        srp.nhlfes.retain(|nhlfe| {
            on_path(nhlfe) || nhlfe.state == NhlfeState::Unactive
        });

        // Create or update the NHLFEs of all shortest-path nexthops.
        if let Some(route) = route {
            for nexthop in &route.nexthops {
                let labels = match srp.sr_label {
                    Some(label_in) => prefix_sid_output_label(
                        &prefix,
                        &sid,
                        route,
                        nexthop,
                        &self.nodes,
                    )
                    .and_then(|label_out| {
                        let depth = stack_depth(label_out);
                        if depth > msd {
                            return Err(Error::StackDepthExceeded {
                                prefix,
                                depth,
                                msd,
                            });
                        }
                        Ok(Some((label_in, label_out)))
                    }),
                    None => Ok(None),
                };

                let nhlfe_idx = match srp.nhlfes.iter().position(|nhlfe| {
                    nhlfe.nexthop == nexthop.addr
                        && nhlfe.ifindex == nexthop.ifindex
                }) {
                    Some(nhlfe_idx) => nhlfe_idx,
                    None => {
                        srp.nhlfes.push(Nhlfe::new(
                            nexthop.addr,
                            nexthop.ifindex,
                            Some(nexthop.system_id),
                        ));
                        srp.nhlfes.len() - 1
                    }
                };
                let nhlfe = &mut srp.nhlfes[nhlfe_idx];
                nhlfe.nh_system_id = Some(nexthop.system_id);

                let result = match labels {
                    Ok(Some((label_in, label_out))) => nhlfe.activate(
                        label_in,
                        label_out,
                        Some(&prefix),
                        ibus_tx,
                    ),
                    Ok(None) => nhlfe.withdraw(Some(&prefix), ibus_tx),
                    Err(error) => {
                        error.log();
                        nhlfe.withdraw(Some(&prefix), ibus_tx)
                    }
                };
                if let Err(error) = result {
                    error.log();
                }
            }
        }

        result
    }

    // Adds the locally configured Prefix-SID of a prefix that isn't
    // registered.
    fn prefix_cfg_restore(&mut self, prefix: IpNetwork) {
        if !self.enabled
            || !self.config.prefix_sids.contains_key(&prefix)
            || self.prefixes.get_by_prefix(&prefix).is_some()
        {
            return;
        }

        if let Err(error) = self
            .prefix_add(prefix)
            .and_then(|srp_idx| self.prefix_commit(srp_idx))
        {
            error.log();
        }
    }

    // Recomputes the input labels of the local prefixes after an SRGB change.
    fn local_prefixes_revalidate(&mut self) {
        let local = self
            .prefixes
            .iter()
            .filter(|srp| srp.owner == self.system_id)
            .map(|srp| srp.prefix)
            .collect_vec();
        for prefix in local {
            let srp_idx = self.prefixes.get_by_prefix(&prefix).map(|(idx, _)| idx);
            if let Some(srp_idx) = srp_idx
                && let Err(error) = self.prefix_sid_compute(srp_idx)
            {
                error.log();
            }
        }
    }

    // Deletes a node along with all its Prefix-SIDs and Adjacency-SIDs.
    fn node_del(&mut self, node_idx: NodeIndex) {
        let Some(node) = self.nodes.delete(node_idx) else {
            return;
        };

        for prefix in &node.prefix_sids {
            let srp_idx = self.prefixes.get_by_prefix(prefix).map(|(idx, _)| idx);
            if let Some(srp_idx) = srp_idx
                && let Err(error) = self.prefix_del(srp_idx)
            {
                error.log();
            }
        }
        for key in &node.adj_sids {
            if let Some(sra) = self.adjacencies.delete(key) {
                Debug::AdjSidDelete(&sra).log();
            }
        }
        Debug::NodeDelete(&node.system_id).log();

        // NHLFEs using this node as nexthop need to be recomputed.
        self.update_timer_add();
    }

    // Replaces the Adjacency-SIDs recorded for a remote node.
    fn remote_adj_sids_update(
        &mut self,
        system_id: SystemId,
        adj_sids: &[NodeAdjSid],
    ) {
        let Some((_, node)) = self.nodes.get_mut_by_system_id(&system_id) else {
            return;
        };

        let advertised = adj_sids
            .iter()
            .map(|adj_sid| {
                SrAdjacency::new_remote(system_id, adj_sid.addr, adj_sid.stlv)
            })
            .collect_vec();
        let keys = advertised.iter().map(|sra| sra.key).collect::<BTreeSet<_>>();

        // Delete Adjacency-SIDs that are no longer advertised.
        let withdrawn = node
            .adj_sids
            .iter()
            .filter(|key| !keys.contains(*key))
            .copied()
            .collect_vec();
        for key in withdrawn {
            node.adj_sids.remove(&key);
            if let Some(sra) = self.adjacencies.delete(&key) {
                Debug::AdjSidDelete(&sra).log();
            }
        }

        // Add or replace advertised Adjacency-SIDs.
        for sra in advertised {
            let new = node.adj_sids.insert(sra.key);
            let (_, sra) = self.adjacencies.insert(sra);
            if new {
                Debug::AdjSidAdd(sra).log();
            }
        }
    }

    fn adj_sids_add(&mut self, adj: &AdjacencyInfo) {
        for (af, addr) in adj.nbr_addrs_by_af() {
            let sra = SrAdjacency::new_local(adj, af, addr, self.system_id);
            let key = sra.key;
            self.adjacencies.insert(sra);
            if let Some((_, node)) =
                self.nodes.get_mut_by_system_id(&self.system_id)
            {
                node.adj_sids.insert(key);
            }
            self.adj_sid_activate(&key);
        }
    }

    // Allocates the label of a local Adjacency-SID and installs its NHLFE.
    //
    // On allocation failure the NHLFE stays idle until the next pass.
    fn adj_sid_activate(&mut self, key: &AdjacencyKey) {
        let Some(sra) = self.adjacencies.get_mut_by_key(key) else {
            return;
        };
        let Some(adj) = sra
            .adj_id
            .and_then(|adj_id| self.protocol_adjs.get(&adj_id))
        else {
            return;
        };

        let label = match self
            .shared
            .label_manager
            .lock()
            .unwrap()
            .label_request_from(ADJ_SID_RANGE)
        {
            Ok(label) => label,
            Err(error) => {
                Error::from(error).log();
                return;
            }
        };

        let mut flags = AdjSidFlags::V | AdjSidFlags::L;
        if sra.addr.address_family() == AddressFamily::Ipv6 {
            flags.insert(AdjSidFlags::F);
        }
        let nbr_system_id = adj.broadcast.then_some(adj.nbr_system_id);
        sra.adj_sid = Some(AdjSidStlv::new(
            flags,
            0,
            nbr_system_id,
            Sid::Label(label),
        ));

        // Adjacency-SIDs pop the label towards the neighbor.
        let label_out = Label::new(Label::IMPLICIT_NULL);
        if let Err(error) =
            sra.nhlfe.activate(label, label_out, None, &self.tx.ibus)
        {
            error.log();
        }
        Debug::AdjSidAdd(sra).log();
    }

    fn adj_sids_del(&mut self, adj_id: AdjacencyId) {
        for key in self.adjacencies.local_keys(adj_id) {
            let Some(mut sra) = self.adjacencies.delete(&key) else {
                continue;
            };
            Debug::AdjSidDelete(&sra).log();

            let label = sra.nhlfe.label_in;
            if let Err(error) = sra.nhlfe.withdraw(None, &self.tx.ibus) {
                error.log();
            }
            if let Some(label) = label {
                self.shared.label_manager.lock().unwrap().label_release(label);
            }
            if let Some((_, node)) =
                self.nodes.get_mut_by_system_id(&self.system_id)
            {
                node.adj_sids.remove(&key);
            }
        }
    }

    fn is_neighbor(&self, system_id: &SystemId) -> bool {
        self.protocol_adjs
            .values()
            .any(|adj| adj.nbr_system_id == *system_id)
    }

    fn neighbor_update(&mut self, system_id: &SystemId) {
        let neighbor = self.is_neighbor(system_id).then_some(self.system_id);
        if let Some((_, node)) = self.nodes.get_mut_by_system_id(system_id) {
            node.neighbor = neighbor;
        }
    }

    // Runs a full NHLFE recomputation pass.
    fn update_pass(&mut self) {
        Debug::UpdatePassStart.log();

        for srp_idx in self.prefixes.indexes() {
            if let Err(error) = self.prefix_sid_compute(srp_idx) {
                error.log();
            }
        }

        // Retry Adjacency-SIDs whose label allocation failed.
        let idle = self
            .adjacencies
            .iter()
            .filter(|sra| sra.is_local() && sra.nhlfe.state == NhlfeState::Idle)
            .map(|sra| sra.key)
            .collect_vec();
        for key in idle {
            self.adj_sid_activate(&key);
        }

        self.stats.update_pass_count += 1;
        Debug::UpdatePassEnd(self.stats.update_pass_count).log();
    }
}

impl Drop for SrDatabase {
    fn drop(&mut self) {
        self.disable();
    }
}

// ===== helper functions =====

// Resolves the input label of an SR prefix using the local SRGB, claiming it
// from the label manager when it falls inside the SRGB.
fn prefix_input_label_update(
    srp: &mut SrPrefix,
    srgb: &LabelRange,
    label_manager: &Mutex<LabelManager>,
) -> Result<(), Error> {
    let label = match sid_to_label(srgb, &srp.sid.sid) {
        Ok(label) => label,
        Err(error) => {
            prefix_input_label_release(srp, srgb, label_manager);
            return Err(error);
        }
    };
    if srp.sr_label == Some(label) {
        return Ok(());
    }

    prefix_input_label_release(srp, srgb, label_manager);
    if srgb.contains(label) {
        let mut label_manager = label_manager.lock().unwrap();
        match label_manager.label_claim(*srgb, label) {
            Ok(()) => (),
            Err(LabelManagerError::LabelInUse(label)) => {
                return Err(
                    InconsistentError::SidConflict(srp.prefix, label).into()
                );
            }
            Err(error) => return Err(error.into()),
        }
    }
    srp.sr_label = Some(label);

    Ok(())
}

fn prefix_input_label_release(
    srp: &mut SrPrefix,
    srgb: &LabelRange,
    label_manager: &Mutex<LabelManager>,
) {
    if let Some(label) = srp.sr_label.take()
        && srgb.contains(label)
    {
        label_manager.lock().unwrap().label_release(label);
    }
}
