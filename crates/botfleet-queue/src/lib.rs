use std::collections::BTreeMap;

use botfleet_core::types::{BotStatus, ServerAddress};

/// Anything the admission queue can evaluate and admit. Implemented by the
/// fleet's `Bot` type (in `botfleet-bot`) — kept as a trait here so this
/// crate doesn't need to depend back on the bot crate.
pub trait AdmissionCandidate {
    fn server_address(&self) -> ServerAddress;
    fn status(&self) -> BotStatus;
    fn game_inited(&self) -> bool;
    /// True once `RECONNECT_DELAY_MS` has elapsed since the last reset.
    fn past_reconnect_delay(&self) -> bool;
    /// Non-blocking trigger — marks the candidate Connecting and stamps
    /// `reconnectTick`; the actual transport I/O happens on the bot's own
    /// tick loop.
    fn begin_connect(&mut self);
}

/// Admission policy for the connection queue (C5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// At most one non-idle (not gameInited, or status != Disconnected) bot
    /// per destination may be admitted per cycle.
    Queued,
    /// Every eligible bot for a destination is admitted in the same cycle.
    Aggressive,
}

/// Groups fleet bots by `(host, port)` and admits connections according to
/// the configured policy. Grounded on the original `CConnectionQueue`:
/// a first pass pre-marks destinations that already have a non-idle bot,
/// a second pass decides admission per policy, a final pass actually
/// triggers `connect()` for everything admitted.
pub struct ConnectionQueue {
    policy: ConnectionPolicy,
}

impl ConnectionQueue {
    pub fn new(policy: ConnectionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ConnectionPolicy {
        self.policy
    }

    /// Runs one admission cycle over `candidates`, returning how many were
    /// triggered to connect. Candidates are visited in the order given —
    /// under `Queued`, the first Disconnected-and-eligible candidate per
    /// destination wins; ties break by insertion order.
    pub fn try_connect<C: AdmissionCandidate>(&self, candidates: &mut [C]) -> usize {
        let mut occupied: BTreeMap<ServerAddress, bool> = BTreeMap::new();

        // First pass: any bot that's mid-connect (not gameInited, or not
        // Disconnected) pre-marks its destination as occupied.
        for c in candidates.iter() {
            if !c.game_inited() || c.status() != BotStatus::Disconnected {
                occupied.insert(c.server_address(), true);
            }
        }

        // Second pass: decide which Disconnected, delay-elapsed bots get
        // admitted this cycle.
        let mut to_admit = vec![false; candidates.len()];
        for (idx, c) in candidates.iter().enumerate() {
            if c.status() != BotStatus::Disconnected || !c.past_reconnect_delay() {
                continue;
            }
            let addr = c.server_address();
            let already_occupied = occupied.get(&addr).copied().unwrap_or(false);

            match self.policy {
                ConnectionPolicy::Queued => {
                    if !already_occupied {
                        to_admit[idx] = true;
                        occupied.insert(addr, true);
                    }
                }
                ConnectionPolicy::Aggressive => {
                    to_admit[idx] = true;
                    occupied.insert(addr, true);
                }
            }
        }

        // Final pass: trigger connect for everything admitted.
        let mut admitted = 0;
        for (idx, c) in candidates.iter_mut().enumerate() {
            if to_admit[idx] {
                c.begin_connect();
                admitted += 1;
            }
        }
        admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeBot {
        addr: ServerAddress,
        status: BotStatus,
        game_inited: bool,
        past_delay: bool,
        connect_calls: usize,
    }

    impl AdmissionCandidate for FakeBot {
        fn server_address(&self) -> ServerAddress {
            self.addr.clone()
        }
        fn status(&self) -> BotStatus {
            self.status
        }
        fn game_inited(&self) -> bool {
            self.game_inited
        }
        fn past_reconnect_delay(&self) -> bool {
            self.past_delay
        }
        fn begin_connect(&mut self) {
            self.status = BotStatus::Connecting;
            self.connect_calls += 1;
        }
    }

    fn fake(addr: &str, port: u16) -> FakeBot {
        FakeBot {
            addr: ServerAddress::new(addr, port),
            status: BotStatus::Disconnected,
            game_inited: false,
            past_delay: true,
            connect_calls: 0,
        }
    }

    #[test]
    fn queued_policy_admits_exactly_one_per_destination() {
        let queue = ConnectionQueue::new(ConnectionPolicy::Queued);
        let mut bots = vec![fake("gta.example", 7777), fake("gta.example", 7777)];

        let admitted = queue.try_connect(&mut bots);
        assert_eq!(admitted, 1);
        assert_eq!(bots[0].connect_calls, 1);
        assert_eq!(bots[1].connect_calls, 0);

        // Once B1 reaches gameInited, the next cycle admits B2.
        bots[0].game_inited = true;
        bots[0].status = BotStatus::Spawned;
        let admitted = queue.try_connect(&mut bots);
        assert_eq!(admitted, 1);
        assert_eq!(bots[1].connect_calls, 1);
    }

    #[test]
    fn aggressive_policy_admits_all_eligible_bots_at_once() {
        let queue = ConnectionQueue::new(ConnectionPolicy::Aggressive);
        let mut bots = vec![fake("gta.example", 7777), fake("gta.example", 7777)];
        let admitted = queue.try_connect(&mut bots);
        assert_eq!(admitted, 2);
    }

    #[test]
    fn bots_not_past_delay_are_skipped() {
        let queue = ConnectionQueue::new(ConnectionPolicy::Queued);
        let mut bot = fake("gta.example", 7777);
        bot.past_delay = false;
        let mut bots = vec![bot];
        assert_eq!(queue.try_connect(&mut bots), 0);
    }
}
