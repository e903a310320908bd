//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//
// Sponsored by NLnet as part of the Next Generation Internet initiative.
// See: https://nlnet.nl/NGI0
//

use std::time::Duration;

use holo_utils::UnboundedSender;
use holo_utils::task::TimeoutTask;

//
// SR tasks diagram:
//                                     +--------------+
//                                     |  IS-IS core  |
//                                     +--------------+
//                                             |
//                                             | (1x) protocol_input
//                                             V
//                                     +--------------+
//                                     |              |
//              update_timer (Nx) ->   |   instance   |
//                                     |              |
//                                     +--------------+
//                                     ibus_tx (1x) |
//                                                  V
//                                     +--------------+
//                                     |     ibus     |
//                                     +--------------+
//

// SR inter-task message types.
pub mod messages {
    use serde::{Deserialize, Serialize};

    // Type aliases.
    pub type SrInputMsg = input::ProtocolMsg;

    // Input messages (IS-IS core or child task -> main task).
    pub mod input {
        use super::*;
        use crate::adjacency::AdjacencyInfo;
        use crate::collections::AdjacencyId;
        use crate::packet::{NodeLsp, SystemId};
        use crate::spf::SpfResult;

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub enum ProtocolMsg {
            LspUpdate(LspUpdateMsg),
            LspPurge(LspPurgeMsg),
            SpfComplete(SpfCompleteMsg),
            AdjacencyUp(AdjacencyUpMsg),
            AdjacencyDown(AdjacencyDownMsg),
            UpdateTimer(UpdateTimerMsg),
        }

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub struct LspUpdateMsg {
            pub area: String,
            pub lsp: NodeLsp,
        }

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub struct LspPurgeMsg {
            pub area: String,
            pub system_id: SystemId,
        }

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub struct SpfCompleteMsg {
            pub area: String,
            pub result: SpfResult,
        }

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub struct AdjacencyUpMsg {
            pub area: String,
            pub adj: AdjacencyInfo,
        }

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub struct AdjacencyDownMsg {
            pub area: String,
            pub adj_id: AdjacencyId,
        }

        #[derive(Debug)]
        #[derive(Deserialize, Serialize)]
        pub struct UpdateTimerMsg {
            pub area: String,
        }
    }
}

// ===== SR tasks =====

// NHLFE update debounce timer.
pub(crate) fn update_timer(
    area: &str,
    delay: Duration,
    update_timerp: &UnboundedSender<messages::input::UpdateTimerMsg>,
) -> TimeoutTask {
    let area = area.to_owned();
    let update_timerp = update_timerp.clone();

    TimeoutTask::new(delay, move || async move {
        let msg = messages::input::UpdateTimerMsg { area };
        let _ = update_timerp.send(msg);
    })
}
