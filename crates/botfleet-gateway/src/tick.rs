use std::time::Instant;

use tracing::{instrument, warn};
use uuid::Uuid;

use botfleet_core::types::{BotStatus, ServerAddress};
use botfleet_queue::AdmissionCandidate;

use crate::app::AppState;

/// Read-only snapshot of a bot's admission-relevant fields, paired with an
/// `admitted` flag the queue flips. Exists so `ConnectionQueue::try_connect`
/// (which needs an owned, stable-order `&mut [C]` slice) can run over the
/// fleet without reaching into `Bot`'s real state-transition methods —
/// admission here only decides *who*; `Bot::connect` still does the actual
/// transport handshake afterward.
struct AdmissionView {
    id: Uuid,
    server: ServerAddress,
    status: BotStatus,
    game_inited: bool,
    past_reconnect_delay: bool,
    admitted: bool,
}

impl AdmissionCandidate for AdmissionView {
    fn server_address(&self) -> ServerAddress {
        self.server.clone()
    }
    fn status(&self) -> BotStatus {
        self.status
    }
    fn game_inited(&self) -> bool {
        self.game_inited
    }
    fn past_reconnect_delay(&self) -> bool {
        self.past_reconnect_delay
    }
    fn begin_connect(&mut self) {
        self.admitted = true;
    }
}

/// One full tick: runs the admission pass over every fleet bot, triggers
/// real transport connects for anything admitted, then drains inbound
/// events and flushes outbound sends for every bot. Grounded on the
/// original single-threaded tick loop — all bot/transport locking happens
/// here, never on the session or querier workers.
#[instrument(skip(state))]
pub async fn run_tick(state: &AppState) {
    let bot_ids: Vec<Uuid> = state.bot_order.lock().unwrap().clone();

    let mut views: Vec<AdmissionView> = Vec::with_capacity(bot_ids.len());
    for id in &bot_ids {
        let Some(bot_lock) = state.bots.get(id) else { continue };
        let bot = bot_lock.lock().unwrap();
        views.push(AdmissionView {
            id: *id,
            server: bot.server.clone(),
            status: bot.status,
            game_inited: bot.game_inited,
            past_reconnect_delay: bot.past_reconnect_delay(),
            admitted: false,
        });
    }

    state.connection_queue.try_connect(&mut views);

    for view in views.iter().filter(|v| v.admitted) {
        let (Some(bot_lock), Some(transport_lock)) = (state.bots.get(&view.id), state.transports.get(&view.id))
        else {
            continue;
        };
        let mut bot = bot_lock.lock().unwrap();
        let mut transport = transport_lock.lock().unwrap();
        bot.connect(transport.as_mut()).await;
    }

    let now = Instant::now();
    for id in &bot_ids {
        let (Some(bot_lock), Some(transport_lock), Some(streamables_lock)) =
            (state.bots.get(id), state.transports.get(id), state.streamables.get(id))
        else {
            continue;
        };
        let mut bot = bot_lock.lock().unwrap();
        let mut transport = transport_lock.lock().unwrap();
        let mut streamables = streamables_lock.lock().unwrap();

        let was_disconnected = bot.status == BotStatus::Disconnected;
        bot.process(now, transport.as_mut(), &state.world, &mut streamables);

        for msg in bot.drain_outbound() {
            if let Err(e) = transport.send(msg.channel, &msg.bytes, msg.reliability, msg.priority).await {
                warn!(bot_id = %id, error = ?e, "outbound send failed");
            }
        }

        // A fresh transition into Disconnected invalidates every streamable
        // this bot was tracking — the next (re)connect starts from a clean
        // pool rather than stale pickup/object/label ids.
        if !was_disconnected && bot.status == BotStatus::Disconnected {
            streamables.clear();
        }
    }
}
