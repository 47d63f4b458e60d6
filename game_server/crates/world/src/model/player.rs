use std::sync::atomic::{AtomicU32, Ordering};

use protocol::Frame;
use repository::{Indexed, MobId};
use session::Session;
use space::position::MAX_DISTANCE;
use space::{Direction, Position};

use crate::message::{encode, ResponseCode};
use crate::model::{Appearance, Credentials, MovementQueue};
use crate::update::block::{AppearanceBlock, BlockSet, ChatBlock};
use crate::world::MAXIMUM_PLAYERS;

pub const DEFAULT_VIEWING_DISTANCE: i32 = 1;

const COMBAT_LEVEL: u8 = 3;
const TOTAL_LEVEL: u16 = 0;

static APPEARANCE_TICKETS: AtomicU32 = AtomicU32::new(0);

/// Next appearance version stamp. Never returns 0, which marks an empty cache entry.
fn next_appearance_ticket() -> u32 {
    loop {
        let ticket = APPEARANCE_TICKETS.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        if ticket != 0 {
            return ticket;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum Privilege {
    #[default]
    Player,
    Moderator,
    Administrator,
}

impl Privilege {
    /// Unknown levels fall back to [`Privilege::Player`].
    pub fn from_value(value: u8) -> Self {
        match value {
            1 => Self::Moderator,
            2 => Self::Administrator,
            _ => Self::Player,
        }
    }

    /// Crown id shown next to the player's name.
    pub fn value(self) -> u8 {
        match self {
            Self::Player => 0,
            Self::Moderator => 1,
            Self::Administrator => 2,
        }
    }
}

#[derive(Debug)]
pub struct Player {
    index: usize,
    credentials: Credentials,
    privilege: Privilege,
    member: bool,
    session: Session,

    position: Position,
    last_known_region: Position,
    region_changed: bool,
    movement: MovementQueue,
    first_direction: Direction,
    second_direction: Direction,
    running: bool,
    teleporting: bool,

    appearance: Appearance,
    appearance_ticket: u32,
    appearance_tickets: Vec<u32>,
    blocks: BlockSet,

    local_players: Vec<MobId>,
    viewing_distance: i32,
    excessive_players: bool,
}

impl Player {
    pub fn new(
        credentials: Credentials,
        privilege: Privilege,
        member: bool,
        session: Session,
        position: Position,
    ) -> Self {
        let mut player = Self {
            index: 0,
            credentials,
            privilege,
            member,
            session,
            position,
            last_known_region: position,
            region_changed: false,
            movement: MovementQueue::new(),
            first_direction: Direction::None,
            second_direction: Direction::None,
            running: false,
            teleporting: false,
            appearance: Appearance::default(),
            appearance_ticket: 0,
            appearance_tickets: vec![0; MAXIMUM_PLAYERS],
            blocks: BlockSet::default(),
            local_players: Vec::new(),
            viewing_distance: DEFAULT_VIEWING_DISTANCE,
            excessive_players: false,
        };
        player.update_appearance();
        player
    }

    /// Runs the client-side login sequence once the player holds a slot.
    ///
    /// The login response travels with the upgrade instruction, so it is the
    /// last frame written with the login codec; everything after it is ciphered.
    pub fn login(&mut self) {
        match encode::login_response(ResponseCode::Ok, self.privilege, false) {
            Ok(response) => self.session.write(response),
            Err(e) => {
                tracing::error!(player = %self.username(), error = %e, "failed to build login response");
                self.disconnect();
                return;
            }
        }
        self.session.upgrade(self.credentials.session_seed());

        self.write_result(encode::initialize_player(self.member, self.index));
        self.write_result(encode::rebuild_region(&self.position));

        self.set_last_known_region(self.position);
        self.teleport(self.position);
        self.update_appearance();
        tracing::info!(player = %self.username(), index = self.index, position = %self.position, "player logged in");
    }

    pub fn disconnect(&self) {
        self.session.close();
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn username(&self) -> &str {
        self.credentials.username()
    }

    pub fn encoded_username(&self) -> u64 {
        self.credentials.encoded_username()
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn is_member(&self) -> bool {
        self.member
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Buffers a frame until the end of the current pulse.
    pub fn write(&mut self, frame: Frame) {
        self.session.write(frame);
    }

    pub(crate) fn write_result(&mut self, frame: Result<Frame, protocol::ProtocolError>) {
        match frame {
            Ok(frame) => self.session.write(frame),
            Err(e) => tracing::warn!(player = %self.username(), error = %e, "dropped outbound frame"),
        }
    }

    pub fn flush(&mut self) {
        self.session.flush();
    }

    /// Sends a line to the player's chat box.
    pub fn send_message(&mut self, text: impl AsRef<str>) {
        self.write_result(encode::server_chat(text.as_ref()));
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn teleport(&mut self, position: Position) {
        self.position = position;
        self.movement.clear();
        self.teleporting = true;
    }

    pub fn is_teleporting(&self) -> bool {
        self.teleporting
    }

    pub fn movement(&self) -> &MovementQueue {
        &self.movement
    }

    pub fn movement_mut(&mut self) -> &mut MovementQueue {
        &mut self.movement
    }

    /// Clears the walking path and the client's destination flag.
    pub fn stop_movement(&mut self) {
        self.movement.clear();
        self.write_result(encode::reset_destination());
    }

    /// Advances the movement queue by one tick.
    pub fn pulse_movement(&mut self) {
        let step = self.movement.pulse(self.position);
        self.first_direction = step.first;
        self.second_direction = step.second;
        self.position = step.position;
    }

    pub fn directions(&self) -> (Direction, Direction) {
        (self.first_direction, self.second_direction)
    }

    pub fn set_directions(&mut self, first: Direction, second: Direction) {
        self.first_direction = first;
        self.second_direction = second;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub fn last_known_region(&self) -> Position {
        self.last_known_region
    }

    pub fn set_last_known_region(&mut self, position: Position) {
        self.last_known_region = position;
        self.region_changed = true;
    }

    pub fn has_region_changed(&self) -> bool {
        self.region_changed
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    pub fn set_appearance(&mut self, appearance: Appearance) {
        self.appearance = appearance;
        self.update_appearance();
    }

    /// Issues a new appearance ticket and flags the appearance block.
    pub fn update_appearance(&mut self) {
        self.appearance_ticket = next_appearance_ticket();
        let block = self.appearance_block();
        self.blocks.set_appearance(block);
    }

    pub fn appearance_ticket(&self) -> u32 {
        self.appearance_ticket
    }

    pub fn appearance_block(&self) -> AppearanceBlock {
        AppearanceBlock::new(
            self.appearance.clone(),
            self.encoded_username(),
            COMBAT_LEVEL,
            TOTAL_LEVEL,
        )
    }

    /// Whether this player's client already holds the appearance of the player
    /// at `index` stamped `ticket`. Records the ticket when it does not.
    pub fn has_cached_appearance(&mut self, index: usize, ticket: u32) -> bool {
        let cached = &mut self.appearance_tickets[index - 1];
        if *cached == ticket {
            return true;
        }
        *cached = ticket;
        false
    }

    pub fn blocks(&self) -> &BlockSet {
        &self.blocks
    }

    pub fn flag_chat(&mut self, block: ChatBlock) {
        self.blocks.set_chat(block);
    }

    pub fn local_players(&self) -> &[MobId] {
        &self.local_players
    }

    pub(crate) fn local_players_mut(&mut self) -> &mut Vec<MobId> {
        &mut self.local_players
    }

    pub fn viewing_distance(&self) -> i32 {
        self.viewing_distance
    }

    pub fn reset_viewing_distance(&mut self) {
        self.viewing_distance = DEFAULT_VIEWING_DISTANCE;
    }

    pub fn increment_viewing_distance(&mut self) {
        if self.viewing_distance < MAX_DISTANCE {
            self.viewing_distance += 1;
        }
    }

    pub fn decrement_viewing_distance(&mut self) {
        if self.viewing_distance > DEFAULT_VIEWING_DISTANCE {
            self.viewing_distance -= 1;
        }
    }

    pub fn flag_excessive_players(&mut self) {
        self.excessive_players = true;
    }

    pub fn is_excessive_players_set(&self) -> bool {
        self.excessive_players
    }

    pub fn reset_excessive_players(&mut self) {
        self.excessive_players = false;
    }

    /// Clears the per-tick state: directions, teleport, update blocks and the region-changed flag.
    pub fn reset(&mut self) {
        self.first_direction = Direction::None;
        self.second_direction = Direction::None;
        self.teleporting = false;
        self.region_changed = false;
        self.blocks.clear();
    }
}

impl Indexed for Player {
    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use session::Outbound;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    pub(crate) fn player_at(name: &str, position: Position) -> (Player, UnboundedReceiver<Outbound>) {
        let (session, rx) = Session::new("127.0.0.1:40000".parse().unwrap());
        let credentials = Credentials::new(name, [1, 2, 3, 4], 0).unwrap();
        (Player::new(credentials, Privilege::Player, false, session, position), rx)
    }

    #[test]
    fn new_player_flags_appearance() {
        let (player, _rx) = player_at("alice", Position::ground(3222, 3218));
        assert!(player.blocks().appearance().is_some());
        assert_ne!(player.appearance_ticket(), 0);
        assert_eq!(player.viewing_distance(), DEFAULT_VIEWING_DISTANCE);
    }

    #[test]
    fn appearance_tickets_change_on_update() {
        let (mut player, _rx) = player_at("bob", Position::ground(0, 0));
        let before = player.appearance_ticket();
        player.update_appearance();
        assert_ne!(before, player.appearance_ticket());
    }

    #[test]
    fn appearance_cache_records_tickets() {
        let (mut player, _rx) = player_at("carol", Position::ground(0, 0));
        assert!(!player.has_cached_appearance(7, 42));
        assert!(player.has_cached_appearance(7, 42));
        assert!(!player.has_cached_appearance(7, 43));
    }

    #[test]
    fn viewing_distance_stays_in_range() {
        let (mut player, _rx) = player_at("dave", Position::ground(0, 0));
        player.decrement_viewing_distance();
        assert_eq!(player.viewing_distance(), 1);
        for _ in 0..40 {
            player.increment_viewing_distance();
        }
        assert_eq!(player.viewing_distance(), MAX_DISTANCE);
    }

    #[test]
    fn reset_clears_tick_state() {
        let (mut player, _rx) = player_at("erin", Position::ground(0, 0));
        player.teleport(Position::ground(5, 5));
        player.set_directions(Direction::North, Direction::North);
        player.set_last_known_region(Position::ground(5, 5));
        player.reset();
        assert!(!player.is_teleporting());
        assert_eq!(player.directions(), (Direction::None, Direction::None));
        assert!(!player.has_region_changed());
        assert!(player.blocks().is_empty());
    }

    #[test]
    fn privilege_values() {
        assert_eq!(Privilege::from_value(2), Privilege::Administrator);
        assert_eq!(Privilege::from_value(9), Privilege::Player);
        assert_eq!(Privilege::Moderator.value(), 1);
    }
}
