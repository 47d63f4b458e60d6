//! The world: mob repositories, the region index and the per-tick pulse.

use std::collections::BTreeSet;

use observability::PhaseMetrics;
use repository::{MobId, MobRepository};
use space::RegionRepository;

use crate::message::command::{default_commands, CommandChain};
use crate::message::{encode, HandlerContext, MessageDispatcher, ResponseCode};
use crate::model::{Npc, Player};
use crate::registration::Registrations;
use crate::update::snapshot::UpdateSnapshot;
use crate::update::task::{self, UpdateContext};
use crate::update::updater::{SequentialUpdater, Updater};

pub const MAXIMUM_PLAYERS: usize = 2048;
pub const MAXIMUM_NPCS: usize = 32768;
pub const MAXIMUM_REMOVALS_PER_PULSE: usize = 50;

pub const PRE_UPDATE: &str = "pre_update";
pub const UPDATE: &str = "update";
pub const POST_UPDATE: &str = "post_update";

/// Key of a mob in the region index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MobKey {
    Player(usize),
    Npc(usize),
}

pub struct World {
    players: MobRepository<Player>,
    npcs: MobRepository<Npc>,
    regions: RegionRepository<MobKey>,
    removals: BTreeSet<MobId>,
    registrations: Registrations,
    updater: Box<dyn Updater>,
    commands: CommandChain,
    dispatcher: MessageDispatcher,
}

impl World {
    pub fn new(registrations: Registrations, updater: Box<dyn Updater>) -> Self {
        Self {
            players: MobRepository::new(MAXIMUM_PLAYERS),
            npcs: MobRepository::new(MAXIMUM_NPCS),
            regions: RegionRepository::new(),
            removals: BTreeSet::new(),
            registrations,
            updater,
            commands: default_commands(),
            dispatcher: MessageDispatcher::new(),
        }
    }

    /// A world that runs every phase on the calling thread.
    pub fn sequential(registrations: Registrations) -> Self {
        Self::new(registrations, Box::new(SequentialUpdater))
    }

    pub fn players(&self) -> &MobRepository<Player> {
        &self.players
    }

    pub fn npcs(&self) -> &MobRepository<Npc> {
        &self.npcs
    }

    pub fn regions(&self) -> &RegionRepository<MobKey> {
        &self.regions
    }

    pub fn registrations(&self) -> &Registrations {
        &self.registrations
    }

    pub fn commands_mut(&mut self) -> &mut CommandChain {
        &mut self.commands
    }

    pub fn dispatcher_mut(&mut self) -> &mut MessageDispatcher {
        &mut self.dispatcher
    }

    /// # Panics
    ///
    /// Panics if `index` is `0` or beyond [`MAXIMUM_PLAYERS`].
    pub fn player_mut(&mut self, index: usize) -> Option<&mut Player> {
        self.players.get_mut(index)
    }

    /// Gives `player` a slot and a place in the region index.
    ///
    /// The player is handed back when every slot is taken.
    pub fn add_player(&mut self, player: Player) -> Result<MobId, Player> {
        let region = player.position().region();
        let id = self.players.add(player)?;
        self.regions.relocate(MobKey::Player(id.index), region);
        Ok(id)
    }

    pub fn add_npc(&mut self, npc: Npc) -> Result<MobId, Npc> {
        let region = npc.position().region();
        let id = self.npcs.add(npc)?;
        self.regions.relocate(MobKey::Npc(id.index), region);
        Ok(id)
    }

    pub fn remove_npc(&mut self, id: MobId) -> Option<Npc> {
        let npc = self.npcs.remove_id(id)?;
        if let Err(e) = self.regions.remove(MobKey::Npc(id.index)) {
            tracing::warn!(npc = %id, error = %e, "npc was not in the region index");
        }
        Some(npc)
    }

    /// Registers up to `limit` players waiting in the registration queue and logs them in.
    pub fn register_pending(&mut self, limit: usize) -> usize {
        let mut registered = 0;
        for player in self.registrations.take_batch(limit) {
            match self.add_player(player) {
                Ok(id) => {
                    if let Some(player) = self.players.get_mut(id.index) {
                        player.login();
                    }
                    registered += 1;
                }
                Err(player) => {
                    tracing::warn!(player = %player.username(), "no free player slot");
                    self.registrations.mark_offline(player.encoded_username());
                    match encode::login_status(ResponseCode::ServerFull) {
                        Ok(frame) => player.session().send_and_close(frame),
                        Err(_) => player.disconnect(),
                    }
                }
            }
        }
        registered
    }

    /// Queues the player at `index` for removal at the start of the next pulse.
    pub fn queue_removal(&mut self, index: usize) -> bool {
        match self.players.id(index) {
            Some(id) => self.removals.insert(id),
            None => false,
        }
    }

    /// Queues every player whose session has closed.
    pub fn sweep_closed(&mut self) -> usize {
        let closed: Vec<MobId> = self
            .players
            .entries()
            .filter(|(_, player)| player.session().is_closed())
            .map(|(id, _)| id)
            .collect();
        let mut queued = 0;
        for id in closed {
            if self.removals.insert(id) {
                queued += 1;
            }
        }
        queued
    }

    pub fn pending_removals(&self) -> usize {
        self.removals.len()
    }

    /// Removes at most [`MAXIMUM_REMOVALS_PER_PULSE`] queued players, lowest index first.
    pub fn finalize_removals(&mut self) -> usize {
        let mut removed = 0;
        while removed < MAXIMUM_REMOVALS_PER_PULSE {
            let Some(id) = self.removals.pop_first() else {
                break;
            };
            let Some(player) = self.players.remove_id(id) else {
                tracing::debug!(player = %id, "queued removal was already gone");
                continue;
            };
            if let Err(e) = self.regions.remove(MobKey::Player(id.index)) {
                tracing::warn!(player = %player.username(), error = %e, "player was not in the region index");
            }
            self.registrations.mark_offline(player.encoded_username());
            player.disconnect();
            tracing::info!(player = %player.username(), index = id.index, "player logged out");
            removed += 1;
        }
        removed
    }

    /// Decodes and handles every frame waiting in each player's inbox.
    pub fn dispatch_inboxes(&mut self) {
        let Self {
            players,
            commands,
            dispatcher,
            ..
        } = self;
        for player in players.iter_mut() {
            let frames = player.session().inbox().drain();
            for frame in frames {
                if player.session().is_closed() {
                    break;
                }
                let mut context = HandlerContext {
                    player: &mut *player,
                    commands: &*commands,
                };
                dispatcher.dispatch_frame(&mut context, &frame);
            }
        }
    }

    /// Finalises removals, then runs the three update phases over every player.
    ///
    /// Region membership is refreshed and the snapshot is captured on the
    /// calling thread between the first and second phase.
    pub fn pulse(&mut self) -> [PhaseMetrics; 3] {
        self.finalize_removals();

        let Self {
            players,
            regions,
            updater,
            ..
        } = self;

        let pre = updater.run(PRE_UPDATE, players.iter_mut().collect(), &task::pre_update);
        pre.log();

        for (id, player) in players.entries() {
            regions.relocate(MobKey::Player(id.index), player.position().region());
        }
        let snapshot = UpdateSnapshot::capture(players);
        let context = UpdateContext {
            snapshot: &snapshot,
            regions: &*regions,
        };
        let update = updater.run(UPDATE, players.iter_mut().collect(), &|player| {
            task::update_player(player, &context)
        });
        update.log();

        let post = updater.run(POST_UPDATE, players.iter_mut().collect(), &task::post_update);
        post.log();

        [pre, update, post]
    }
}
