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

use holo_utils::ibus::IbusSender;
use holo_utils::mpls::Label;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::debug::Debug;
use crate::error::{Error, InconsistentError};
use crate::packet::SystemId;
use crate::southbound;

// Next-Hop Label Forwarding Entry.
#[derive(Clone, Debug)]
#[derive(Deserialize, Serialize)]
pub struct Nhlfe {
    pub state: NhlfeState,
    pub nexthop: IpAddr,
    pub ifindex: u32,
    // SR node reachable through this nexthop.
    pub nh_system_id: Option<SystemId>,
    pub label_in: Option<Label>,
    pub label_out: Option<Label>,
    // Time at which the entry lost its path.
    #[serde(skip)]
    pub unactive_since: Option<Instant>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum NhlfeState {
    Idle,
    New,
    Active,
    Unactive,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum NhlfeEvent {
    // Input and output labels were resolved.
    Computed,
    // Entry was installed in the dataplane.
    Installed,
    // Nexthop is no longer on a shortest path.
    PathLost,
    // Entry was withdrawn.
    Withdrawn,
}

// ===== impl Nhlfe =====

impl Nhlfe {
    pub fn new(
        nexthop: IpAddr,
        ifindex: u32,
        nh_system_id: Option<SystemId>,
    ) -> Nhlfe {
        Nhlfe {
            state: NhlfeState::Idle,
            nexthop,
            ifindex,
            nh_system_id,
            label_in: None,
            label_out: None,
            unactive_since: None,
        }
    }

    // Runs the NHLFE state machine.
    pub fn fsm(&mut self, event: NhlfeEvent) -> Result<(), Error> {
        let old_state = self.state;
        let new_state = match (old_state, event) {
            (NhlfeState::Idle, NhlfeEvent::Computed) => NhlfeState::New,
            (NhlfeState::New, NhlfeEvent::Installed)
            | (NhlfeState::Unactive, NhlfeEvent::Installed) => {
                NhlfeState::Active
            }
            (NhlfeState::Active, NhlfeEvent::PathLost) => NhlfeState::Unactive,
            (_, NhlfeEvent::Withdrawn) => NhlfeState::Idle,
            _ => {
                return Err(Error::Inconsistent(
                    InconsistentError::NhlfeUnexpectedEvent(old_state, event),
                ));
            }
        };

        self.state = new_state;
        self.unactive_since = match new_state {
            NhlfeState::Unactive => Some(Instant::now()),
            _ => None,
        };
        Debug::NhlfeTransition(self, old_state, event).log();

        Ok(())
    }

    // Returns whether the entry is usable for traffic.
    pub fn is_active(&self) -> bool {
        self.state == NhlfeState::Active
    }

    // Returns whether the entry has been unactive for longer than the given
    // hold time.
    pub fn is_hold_expired(&self, hold_time: Duration) -> bool {
        self.unactive_since
            .is_some_and(|since| since.elapsed() >= hold_time)
    }

    // Moves an idle entry to New using the given labels.
    pub(crate) fn compute(
        &mut self,
        label_in: Label,
        label_out: Label,
    ) -> Result<(), Error> {
        self.fsm(NhlfeEvent::Computed)?;
        self.label_in = Some(label_in);
        self.label_out = Some(label_out);
        Ok(())
    }

    // Installs a new or unactive entry in the dataplane.
    pub(crate) fn install(
        &mut self,
        route: Option<&IpNetwork>,
        ibus_tx: &IbusSender,
    ) -> Result<(), Error> {
        if let (Some(label_in), Some(label_out)) = (self.label_in, self.label_out)
        {
            southbound::tx::nhlfe_install(
                ibus_tx, self, label_in, label_out, route, false,
            );
        }
        self.fsm(NhlfeEvent::Installed)
    }

    // Brings the entry to the Active state with the given labels, sending
    // only the dataplane updates required to do so.
    pub(crate) fn activate(
        &mut self,
        label_in: Label,
        label_out: Label,
        route: Option<&IpNetwork>,
        ibus_tx: &IbusSender,
    ) -> Result<(), Error> {
        match self.state {
            NhlfeState::Idle => {
                self.compute(label_in, label_out)?;
                self.install(route, ibus_tx)
            }
            NhlfeState::New | NhlfeState::Unactive => {
                self.label_in = Some(label_in);
                self.label_out = Some(label_out);
                self.install(route, ibus_tx)
            }
            NhlfeState::Active => {
                if self.label_in == Some(label_in)
                    && self.label_out == Some(label_out)
                {
                    return Ok(());
                }

                // The input label identifies the dataplane entry, so a new
                // one requires the old entry to be withdrawn first.
                let replace = match self.label_in {
                    Some(old_label_in) if old_label_in != label_in => {
                        southbound::tx::nhlfe_uninstall(
                            ibus_tx,
                            self,
                            old_label_in,
                            route,
                        );
                        false
                    }
                    _ => true,
                };
                self.label_in = Some(label_in);
                self.label_out = Some(label_out);
                southbound::tx::nhlfe_install(
                    ibus_tx, self, label_in, label_out, route, replace,
                );
                Ok(())
            }
        }
    }

    // Uninstalls an active entry whose nexthop is no longer reachable,
    // keeping its labels for a later reactivation.
    pub(crate) fn deactivate(
        &mut self,
        route: Option<&IpNetwork>,
        ibus_tx: &IbusSender,
    ) -> Result<(), Error> {
        if let Some(label_in) = self.label_in {
            southbound::tx::nhlfe_uninstall(ibus_tx, self, label_in, route);
        }
        self.fsm(NhlfeEvent::PathLost)
    }

    // Withdraws the entry, uninstalling it first if it's active.
    pub(crate) fn withdraw(
        &mut self,
        route: Option<&IpNetwork>,
        ibus_tx: &IbusSender,
    ) -> Result<(), Error> {
        if self.state == NhlfeState::Idle {
            return Ok(());
        }
        if self.state == NhlfeState::Active {
            if let Some(label_in) = self.label_in {
                southbound::tx::nhlfe_uninstall(ibus_tx, self, label_in, route);
            }
        }
        self.label_in = None;
        self.label_out = None;
        self.fsm(NhlfeEvent::Withdrawn)
    }
}

// ===== global functions =====

// Returns the number of labels pushed when forwarding with the given output
// label.
pub fn stack_depth(label_out: Label) -> u8 {
    if label_out.is_implicit_null() { 0 } else { 1 }
}
