use repository::{MobId, MobRepository};
use space::{Direction, Position};

use super::block::{AppearanceBlock, BlockSet};
use crate::model::Player;

/// What observers may read about one player during the update phase.
#[derive(Debug, Clone)]
pub struct MobSnapshot {
    pub id: MobId,
    pub position: Position,
    pub first: Direction,
    pub second: Direction,
    pub teleporting: bool,
    pub blocks: BlockSet,
    pub appearance: AppearanceBlock,
    pub appearance_ticket: u32,
}

impl MobSnapshot {
    fn capture(id: MobId, player: &Player) -> Self {
        let (first, second) = player.directions();
        Self {
            id,
            position: player.position(),
            first,
            second,
            teleporting: player.is_teleporting(),
            blocks: player.blocks().clone(),
            appearance: player.appearance_block(),
            appearance_ticket: player.appearance_ticket(),
        }
    }
}

/// Read-only view of every player taken between the pre-update and update phases.
///
/// Each unit of the update phase mutates only its own player and reads every
/// other player through this snapshot.
#[derive(Debug, Clone)]
pub struct UpdateSnapshot {
    players: Vec<Option<MobSnapshot>>,
}

impl UpdateSnapshot {
    pub fn capture(players: &MobRepository<Player>) -> Self {
        let mut snapshots = vec![None; players.capacity()];
        for (id, player) in players.entries() {
            snapshots[id.index - 1] = Some(MobSnapshot::capture(id, player));
        }
        Self { players: snapshots }
    }

    pub fn get(&self, index: usize) -> Option<&MobSnapshot> {
        index
            .checked_sub(1)
            .and_then(|slot| self.players.get(slot))
            .and_then(Option::as_ref)
    }

    /// The snapshot of `id`, unless its slot has since been freed or reused.
    pub fn resolve(&self, id: MobId) -> Option<&MobSnapshot> {
        self.get(id.index).filter(|snapshot| snapshot.id == id)
    }

    pub fn len(&self) -> usize {
        self.players.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::player::tests::player_at;

    #[test]
    fn resolve_rejects_stale_ids() {
        let mut players = MobRepository::new(4);
        let (alice, _a) = player_at("alice", Position::ground(10, 10));
        let first = players.add(alice).unwrap();
        players.remove(first.index);
        let (bob, _b) = player_at("bob", Position::ground(20, 20));
        let second = players.add(bob).unwrap();
        assert_eq!(first.index, second.index);

        let snapshot = UpdateSnapshot::capture(&players);
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.resolve(first).is_none());
        assert_eq!(snapshot.resolve(second).unwrap().position, Position::ground(20, 20));
        assert!(snapshot.get(0).is_none());
        assert!(snapshot.get(99).is_none());
    }
}
