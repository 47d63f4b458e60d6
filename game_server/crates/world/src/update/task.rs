//! The three per-player phases of a world pulse.

use std::collections::BTreeSet;

use repository::Indexed;
use space::position::MAX_DISTANCE;
use space::region::VIEWPORT_WIDTH;
use space::RegionRepository;

use super::descriptor::{DescriptorKind, PlayerDescriptor};
use super::encoder;
use super::snapshot::{MobSnapshot, UpdateSnapshot};
use crate::error::UpdateError;
use crate::message::encode;
use crate::model::Player;
use crate::world::MobKey;

pub const MAXIMUM_LOCAL_PLAYERS: usize = 255;
pub const MAXIMUM_ADDITIONS_PER_PULSE: usize = 20;

/// Shared, read-only state of the update phase.
pub struct UpdateContext<'a> {
    pub snapshot: &'a UpdateSnapshot,
    pub regions: &'a RegionRepository<MobKey>,
}

/// Moves the player and rebuilds the map when it nears the edge of the loaded area.
pub fn pre_update(player: &mut Player) -> Result<(), UpdateError> {
    player.pulse_movement();
    if player.is_teleporting() {
        player.reset_viewing_distance();
    }

    if region_change_required(player) {
        let position = player.position();
        player.set_last_known_region(position);
        player.write(encode::rebuild_region(&position)?);
    }
    Ok(())
}

fn region_change_required(player: &Player) -> bool {
    let base = player.last_known_region();
    let position = player.position();
    let local_x = position.local_x(&base);
    let local_y = position.local_y(&base);
    let far_edge = VIEWPORT_WIDTH - MAX_DISTANCE - 1;
    local_x <= MAX_DISTANCE || local_x >= far_edge || local_y <= MAX_DISTANCE || local_y >= far_edge
}

/// Synchronises the players around `player` and queues the update frame.
pub fn update_player(player: &mut Player, context: &UpdateContext<'_>) -> Result<(), UpdateError> {
    let position = player.position();
    let distance = player.viewing_distance();

    let mut own_blocks = player.blocks().clone();
    own_blocks.remove_chat();
    let own_kind = if player.is_teleporting() {
        let base = player.last_known_region();
        DescriptorKind::Teleport {
            height: position.height,
            region_changed: player.has_region_changed(),
            local_x: position.local_x(&base),
            local_y: position.local_y(&base),
        }
    } else {
        let (first, second) = player.directions();
        DescriptorKind::from_directions(first, second)?
    };
    let own = PlayerDescriptor::new(own_kind, own_blocks);

    let previous = player.local_players().to_vec();
    let local_count = previous.len();
    let mut locals = Vec::with_capacity(local_count);
    let mut descriptors = Vec::with_capacity(local_count);

    for id in previous {
        let other = context.snapshot.resolve(id).filter(|other| {
            !other.teleporting
                && other.position.longest_delta(&position) <= distance
                && other.position.is_within_distance(&position, distance)
        });
        let Some(other) = other else {
            descriptors.push(PlayerDescriptor::remove());
            continue;
        };
        let kind = DescriptorKind::from_directions(other.first, other.second)?;
        descriptors.push(PlayerDescriptor::new(kind, observed_blocks(player, other)));
        locals.push(id);
    }

    let mut known: BTreeSet<usize> = locals.iter().map(|id| id.index).collect();
    let mut added = 0;
    for key in context.regions.surrounding_occupants(position.region()) {
        if locals.len() >= MAXIMUM_LOCAL_PLAYERS {
            player.flag_excessive_players();
            break;
        }
        if added >= MAXIMUM_ADDITIONS_PER_PULSE {
            break;
        }

        let MobKey::Player(index) = key else {
            continue;
        };
        if index == player.index() || known.contains(&index) {
            continue;
        }
        let Some(other) = context.snapshot.get(index) else {
            continue;
        };
        if !other.position.is_within_distance(&position, distance) {
            continue;
        }

        let kind = DescriptorKind::Add {
            index,
            dx: other.position.x - position.x,
            dy: other.position.y - position.y,
        };
        descriptors.push(PlayerDescriptor::new(kind, observed_blocks(player, other)));
        locals.push(other.id);
        known.insert(index);
        added += 1;
    }

    let frame = encoder::player_update(&own, local_count, &descriptors)?;
    player.write(frame);
    *player.local_players_mut() = locals;
    Ok(())
}

/// Blocks `observer` receives for `other`, adding the appearance when the observer's copy is stale.
fn observed_blocks(observer: &mut Player, other: &MobSnapshot) -> super::block::BlockSet {
    let mut blocks = other.blocks.clone();
    if !observer.has_cached_appearance(other.id.index, other.appearance_ticket) {
        blocks.set_appearance(other.appearance.clone());
    }
    blocks
}

/// Clears the tick's state, adapts the viewing distance and flushes the player's frames.
pub fn post_update(player: &mut Player) -> Result<(), UpdateError> {
    player.reset();
    if player.is_excessive_players_set() {
        player.decrement_viewing_distance();
        player.reset_excessive_players();
    } else {
        player.increment_viewing_distance();
    }
    player.flush();
    Ok(())
}
