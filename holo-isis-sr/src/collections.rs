//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::BTreeMap;
use std::net::IpAddr;

use generational_arena::Index;
use holo_utils::ip::AddressFamily;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

use crate::adjacency::SrAdjacency;
use crate::error::{Error, InconsistentError, NotFoundError};
use crate::node::SrNode;
use crate::packet::SystemId;
use crate::prefix::SrPrefix;

pub type NodeIndex = Index;
pub type PrefixIndex = Index;
pub type AdjacencyIndex = Index;

// Identifier of an IS-IS protocol adjacency, assigned by the IS-IS core.
pub type AdjacencyId = u32;

// Key of an SR adjacency in the Adjacency Registry.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub enum AdjacencyKey {
    // Adjacency-SID allocated locally for a protocol adjacency.
    Local(AdjacencyId, AddressFamily),
    // Adjacency-SID advertised by a remote node, identified by its owner,
    // endpoint address and (for LAN-Adjacency-SIDs) neighbor System ID.
    Remote(SystemId, IpAddr, Option<SystemId>),
}

#[derive(Debug)]
pub struct Arena<T>(generational_arena::Arena<T>);

// Node Registry.
#[derive(Debug, Default)]
pub struct Nodes {
    arena: Arena<SrNode>,
    system_id_tree: BTreeMap<SystemId, NodeIndex>,
}

// Prefix Registry.
#[derive(Debug, Default)]
pub struct Prefixes {
    arena: Arena<SrPrefix>,
    prefix_tree: BTreeMap<IpNetwork, PrefixIndex>,
}

// Adjacency Registry.
#[derive(Debug, Default)]
pub struct Adjacencies {
    arena: Arena<SrAdjacency>,
    key_tree: BTreeMap<AdjacencyKey, AdjacencyIndex>,
}

// ===== impl AdjacencyKey =====

impl AdjacencyKey {
    pub fn adj_id(&self) -> Option<AdjacencyId> {
        match self {
            AdjacencyKey::Local(adj_id, _) => Some(*adj_id),
            AdjacencyKey::Remote(..) => None,
        }
    }
}

// ===== impl Arena =====

impl<T> Default for Arena<T> {
    fn default() -> Arena<T> {
        Arena(Default::default())
    }
}

impl<T> std::ops::Index<Index> for Arena<T> {
    type Output = T;

    fn index(&self, index: Index) -> &Self::Output {
        &self.0[index]
    }
}

impl<T> std::ops::IndexMut<Index> for Arena<T> {
    fn index_mut(&mut self, index: Index) -> &mut Self::Output {
        &mut self.0[index]
    }
}

// ===== impl Nodes =====

impl Nodes {
    pub(crate) fn insert(
        &mut self,
        node: SrNode,
    ) -> Result<(NodeIndex, &mut SrNode), Error> {
        let system_id = node.system_id;
        if self.system_id_tree.contains_key(&system_id) {
            return Err(Error::Inconsistent(
                InconsistentError::DuplicateSystemId(system_id),
            ));
        }

        let node_idx = self.arena.0.insert(node);
        self.system_id_tree.insert(system_id, node_idx);
        Ok((node_idx, &mut self.arena[node_idx]))
    }

    pub(crate) fn delete(&mut self, node_idx: NodeIndex) -> Option<SrNode> {
        let node = self.arena.0.remove(node_idx)?;
        self.system_id_tree.remove(&node.system_id);
        Some(node)
    }

    pub(crate) fn clear(&mut self) {
        self.system_id_tree.clear();
        self.arena.0.clear();
    }

    // Returns a reference to the node corresponding to the given System ID.
    pub fn get_by_system_id(
        &self,
        system_id: &SystemId,
    ) -> Option<(NodeIndex, &SrNode)> {
        self.system_id_tree
            .get(system_id)
            .copied()
            .map(|node_idx| (node_idx, &self.arena[node_idx]))
    }

    // Returns a mutable reference to the node corresponding to the given
    // System ID.
    pub(crate) fn get_mut_by_system_id(
        &mut self,
        system_id: &SystemId,
    ) -> Option<(NodeIndex, &mut SrNode)> {
        self.system_id_tree
            .get(system_id)
            .copied()
            .map(move |node_idx| (node_idx, &mut self.arena[node_idx]))
    }

    // Returns a reference to the node, or a lookup error.
    pub fn try_get(&self, system_id: &SystemId) -> Result<&SrNode, Error> {
        self.get_by_system_id(system_id)
            .map(|(_, node)| node)
            .ok_or(Error::NotFound(NotFoundError::Node(*system_id)))
    }

    // Returns an iterator visiting all nodes, ordered by System ID.
    pub fn iter(&self) -> impl Iterator<Item = &SrNode> + '_ {
        self.system_id_tree
            .values()
            .map(|node_idx| &self.arena[*node_idx])
    }

    pub fn len(&self) -> usize {
        self.system_id_tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.system_id_tree.is_empty()
    }
}

impl std::ops::Index<NodeIndex> for Nodes {
    type Output = SrNode;

    fn index(&self, index: NodeIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<NodeIndex> for Nodes {
    fn index_mut(&mut self, index: NodeIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl Prefixes =====

impl Prefixes {
    pub(crate) fn insert(
        &mut self,
        srp: SrPrefix,
    ) -> Result<(PrefixIndex, &mut SrPrefix), Error> {
        let prefix = srp.prefix;
        if let Some(existing_idx) = self.prefix_tree.get(&prefix) {
            let existing = &self.arena[*existing_idx];
            return Err(Error::Inconsistent(
                InconsistentError::PrefixOwnerConflict(
                    prefix,
                    existing.owner,
                    srp.owner,
                ),
            ));
        }

        let srp_idx = self.arena.0.insert(srp);
        self.prefix_tree.insert(prefix, srp_idx);
        Ok((srp_idx, &mut self.arena[srp_idx]))
    }

    pub(crate) fn delete(
        &mut self,
        srp_idx: PrefixIndex,
    ) -> Result<SrPrefix, Error> {
        let srp = self
            .arena
            .0
            .remove(srp_idx)
            .ok_or(Error::NotFound(NotFoundError::PrefixIndex(srp_idx)))?;
        self.prefix_tree.remove(&srp.prefix);
        Ok(srp)
    }

    pub(crate) fn clear(&mut self) {
        self.prefix_tree.clear();
        self.arena.0.clear();
    }

    // Returns a reference to the SR prefix corresponding to the given prefix.
    pub fn get_by_prefix(
        &self,
        prefix: &IpNetwork,
    ) -> Option<(PrefixIndex, &SrPrefix)> {
        self.prefix_tree
            .get(prefix)
            .copied()
            .map(|srp_idx| (srp_idx, &self.arena[srp_idx]))
    }

    // Returns a mutable reference to the SR prefix corresponding to the given
    // prefix.
    pub(crate) fn get_mut_by_prefix(
        &mut self,
        prefix: &IpNetwork,
    ) -> Option<(PrefixIndex, &mut SrPrefix)> {
        self.prefix_tree
            .get(prefix)
            .copied()
            .map(move |srp_idx| (srp_idx, &mut self.arena[srp_idx]))
    }

    // Returns a reference to the SR prefix corresponding to the given index,
    // unless it has been deleted in the meantime.
    pub fn get(&self, srp_idx: PrefixIndex) -> Option<&SrPrefix> {
        self.arena.0.get(srp_idx)
    }

    pub(crate) fn get_mut(
        &mut self,
        srp_idx: PrefixIndex,
    ) -> Option<&mut SrPrefix> {
        self.arena.0.get_mut(srp_idx)
    }

    // Returns an iterator visiting all SR prefixes, ordered by prefix.
    pub fn iter(&self) -> impl Iterator<Item = &SrPrefix> + '_ {
        self.prefix_tree.values().map(|srp_idx| &self.arena[*srp_idx])
    }

    // Returns the indexes of all SR prefixes, ordered by prefix.
    pub(crate) fn indexes(&self) -> Vec<PrefixIndex> {
        self.prefix_tree.values().copied().collect()
    }

    // Returns an iterator visiting mutable references to all SR prefixes.
    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut SrPrefix> + '_ {
        self.arena.0.iter_mut().map(|(_, srp)| srp)
    }

    pub fn len(&self) -> usize {
        self.prefix_tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix_tree.is_empty()
    }
}

impl std::ops::Index<PrefixIndex> for Prefixes {
    type Output = SrPrefix;

    fn index(&self, index: PrefixIndex) -> &Self::Output {
        &self.arena[index]
    }
}

impl std::ops::IndexMut<PrefixIndex> for Prefixes {
    fn index_mut(&mut self, index: PrefixIndex) -> &mut Self::Output {
        &mut self.arena[index]
    }
}

// ===== impl Adjacencies =====

impl Adjacencies {
    pub(crate) fn insert(
        &mut self,
        sra: SrAdjacency,
    ) -> (AdjacencyIndex, &mut SrAdjacency) {
        let key = sra.key;
        let sra_idx = self.arena.0.insert(sra);
        if let Some(old_idx) = self.key_tree.insert(key, sra_idx) {
            self.arena.0.remove(old_idx);
        }
        (sra_idx, &mut self.arena[sra_idx])
    }

    pub(crate) fn delete(
        &mut self,
        key: &AdjacencyKey,
    ) -> Option<SrAdjacency> {
        let sra_idx = self.key_tree.remove(key)?;
        self.arena.0.remove(sra_idx)
    }

    pub(crate) fn clear(&mut self) {
        self.key_tree.clear();
        self.arena.0.clear();
    }

    // Returns a reference to the SR adjacency corresponding to the given key.
    pub fn get_by_key(&self, key: &AdjacencyKey) -> Option<&SrAdjacency> {
        self.key_tree.get(key).map(|sra_idx| &self.arena[*sra_idx])
    }

    pub(crate) fn get_mut_by_key(
        &mut self,
        key: &AdjacencyKey,
    ) -> Option<&mut SrAdjacency> {
        self.key_tree
            .get(key)
            .copied()
            .map(move |sra_idx| &mut self.arena[sra_idx])
    }

    // Returns an iterator visiting all SR adjacencies, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = &SrAdjacency> + '_ {
        self.key_tree.values().map(|sra_idx| &self.arena[*sra_idx])
    }

    // Returns an iterator visiting mutable references to all SR adjacencies.
    pub(crate) fn iter_mut(
        &mut self,
    ) -> impl Iterator<Item = &mut SrAdjacency> + '_ {
        self.arena.0.iter_mut().map(|(_, sra)| sra)
    }

    // Returns the keys of all locally allocated Adjacency-SIDs of the given
    // protocol adjacency.
    pub(crate) fn local_keys(&self, adj_id: AdjacencyId) -> Vec<AdjacencyKey> {
        self.key_tree
            .keys()
            .filter(|key| key.adj_id() == Some(adj_id))
            .copied()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.key_tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_tree.is_empty()
    }
}
