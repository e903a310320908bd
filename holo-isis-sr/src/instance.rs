//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use holo_utils::ibus::IbusSender;
use holo_utils::mpls::LabelManager;
use holo_utils::{UnboundedReceiver, UnboundedSender};
use tokio::sync::mpsc;
use tracing::debug_span;

use crate::config::SrDbCfg;
use crate::database::SrDatabase;
use crate::error::{Error, NotFoundError};
use crate::packet::SystemId;
use crate::tasks::messages::SrInputMsg;
use crate::tasks::messages::input::{ProtocolMsg, UpdateTimerMsg};

// Segment Routing instance, holding the databases of all IS-IS areas.
#[derive(Debug)]
pub struct SrInstance {
    // Local System ID.
    pub system_id: SystemId,
    // Per-area SR databases.
    pub areas: BTreeMap<String, SrDatabase>,
    // Shared data.
    pub shared: InstanceShared,
    // Instance Tx channels.
    pub tx: InstanceChannelsTx,
}

// Data shared with the rest of the routing process.
#[derive(Clone, Debug, Default)]
pub struct InstanceShared {
    pub label_manager: Arc<Mutex<LabelManager>>,
}

#[derive(Clone, Debug)]
pub struct InstanceChannelsTx {
    pub ibus: IbusSender,
    pub protocol_input: ProtocolInputChannelsTx,
}

#[derive(Clone, Debug)]
pub struct ProtocolInputChannelsTx {
    // Update timer expiry.
    pub update_timer: UnboundedSender<UpdateTimerMsg>,
}

#[derive(Debug)]
pub struct ProtocolInputChannelsRx {
    // Update timer expiry.
    pub update_timer: UnboundedReceiver<UpdateTimerMsg>,
}

// ===== impl SrInstance =====

impl SrInstance {
    pub fn new(
        system_id: SystemId,
        shared: InstanceShared,
        ibus_tx: IbusSender,
    ) -> (SrInstance, ProtocolInputChannelsRx) {
        let (update_timerp, update_timerc) = mpsc::unbounded_channel();
        let tx = InstanceChannelsTx {
            ibus: ibus_tx,
            protocol_input: ProtocolInputChannelsTx {
                update_timer: update_timerp,
            },
        };
        let rx = ProtocolInputChannelsRx {
            update_timer: update_timerc,
        };

        let instance = SrInstance {
            system_id,
            areas: Default::default(),
            shared,
            tx,
        };
        (instance, rx)
    }

    // Creates the SR database of an area and enables it.
    pub fn area_add(
        &mut self,
        area: &str,
        config: SrDbCfg,
    ) -> Result<&mut SrDatabase, Error> {
        let span = debug_span!("sr", %area);
        let _span_guard = span.enter();

        if let Some(mut db) = self.areas.remove(area) {
            db.disable();
        }

        let mut db = SrDatabase::new(
            area,
            self.system_id,
            config,
            self.shared.clone(),
            self.tx.clone(),
        );
        db.enable()?;
        Ok(self.areas.entry(area.to_owned()).or_insert(db))
    }

    // Disables and deletes the SR database of an area.
    pub fn area_delete(&mut self, area: &str) -> Result<(), Error> {
        let span = debug_span!("sr", %area);
        let _span_guard = span.enter();

        let mut db = self
            .areas
            .remove(area)
            .ok_or_else(|| NotFoundError::Area(area.to_owned()))?;
        db.disable();
        Ok(())
    }

    pub fn area_get(&self, area: &str) -> Option<&SrDatabase> {
        self.areas.get(area)
    }

    pub fn area_get_mut(&mut self, area: &str) -> Option<&mut SrDatabase> {
        self.areas.get_mut(area)
    }

    // Disables all areas, returning every reserved label to the label
    // manager.
    pub fn terminate(&mut self) {
        for (area, db) in self.areas.iter_mut() {
            let span = debug_span!("sr", %area);
            let _span_guard = span.enter();
            db.disable();
        }
        self.areas.clear();
    }

    // Processes an input message.
    pub fn process_msg(&mut self, msg: SrInputMsg) {
        let area = match &msg {
            ProtocolMsg::LspUpdate(msg) => msg.area.clone(),
            ProtocolMsg::LspPurge(msg) => msg.area.clone(),
            ProtocolMsg::SpfComplete(msg) => msg.area.clone(),
            ProtocolMsg::AdjacencyUp(msg) => msg.area.clone(),
            ProtocolMsg::AdjacencyDown(msg) => msg.area.clone(),
            ProtocolMsg::UpdateTimer(msg) => msg.area.clone(),
        };
        let span = debug_span!("sr", %area);
        let _span_guard = span.enter();

        if let Err(error) = self.process_area_msg(&area, msg) {
            error.log();
        }
    }

    fn process_area_msg(
        &mut self,
        area: &str,
        msg: SrInputMsg,
    ) -> Result<(), Error> {
        let db = self
            .areas
            .get_mut(area)
            .ok_or_else(|| NotFoundError::Area(area.to_owned()))?;

        match msg {
            ProtocolMsg::LspUpdate(msg) => db.lsp_update(msg.lsp)?,
            ProtocolMsg::LspPurge(msg) => db.lsp_purge(msg.system_id)?,
            ProtocolMsg::SpfComplete(msg) => db.spf_complete(msg.result),
            ProtocolMsg::AdjacencyUp(msg) => db.adjacency_up(msg.adj),
            ProtocolMsg::AdjacencyDown(msg) => db.adjacency_down(msg.adj_id)?,
            ProtocolMsg::UpdateTimer(_) => db.process_update_timer(),
        }

        Ok(())
    }
}

impl Drop for SrInstance {
    fn drop(&mut self) {
        self.terminate();
    }
}

// ===== impl ProtocolInputChannelsRx =====

impl ProtocolInputChannelsRx {
    // Waits for the next message produced by a child task.
    pub async fn recv(&mut self) -> Option<SrInputMsg> {
        self.update_timer
            .recv()
            .await
            .map(ProtocolMsg::UpdateTimer)
    }
}
