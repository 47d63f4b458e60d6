//! Game-phase messages: the opcode table, decoders, encoders and handlers.

use std::sync::{Arc, OnceLock};

use protocol::{FrameMetadata, FrameMetadataSet, MessageRegistry};
use space::Position;

pub mod command;
pub mod decode;
pub mod encode;
pub mod handler;
mod response;

pub use command::{CommandArguments, CommandEvent};
pub use handler::{HandlerContext, MessageDispatcher};
pub use response::ResponseCode;

pub const PING: FrameMetadata = FrameMetadata::fixed(0, 0);
pub const FOCUS_UPDATE: FrameMetadata = FrameMetadata::fixed(3, 1);
pub const CHAT: FrameMetadata = FrameMetadata::variable_byte(4);
pub const ARROW_KEY: FrameMetadata = FrameMetadata::fixed(86, 4);
pub const COMMAND_MOVEMENT: FrameMetadata = FrameMetadata::variable_byte(98);
pub const COMMAND: FrameMetadata = FrameMetadata::variable_byte(103);
pub const CLOSE_INTERFACE: FrameMetadata = FrameMetadata::fixed(130, 0);
pub const GAME_MOVEMENT: FrameMetadata = FrameMetadata::variable_byte(164);
pub const MOUSE_CLICKED: FrameMetadata = FrameMetadata::fixed(241, 4);
pub const MINIMAP_MOVEMENT: FrameMetadata = FrameMetadata::variable_byte(248);

/// Client noise that is framed and discarded.
const SPAM: [FrameMetadata; 6] = [
    FrameMetadata::variable_byte(77),
    FrameMetadata::fixed(121, 0),
    FrameMetadata::variable_byte(165),
    FrameMetadata::fixed(189, 1),
    FrameMetadata::fixed(210, 4),
    FrameMetadata::variable_byte(226),
];

pub const REBUILD_REGION: FrameMetadata = FrameMetadata::fixed(73, 4);
pub const RESET_DESTINATION: FrameMetadata = FrameMetadata::fixed(78, 0);
pub const PLAYER_UPDATE: FrameMetadata = FrameMetadata::variable_short(81);
pub const INITIALIZE_PLAYER: FrameMetadata = FrameMetadata::fixed(249, 3);
pub const SERVER_CHAT: FrameMetadata = FrameMetadata::variable_byte(253);

/// Headless response to a login attempt.
pub const LOGIN_RESPONSE: FrameMetadata = FrameMetadata::variable_byte(0).headless();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub effects: u8,
    pub colour: u8,
    /// Sanitised text.
    pub text: String,
    /// `text` recompressed for the chat block.
    pub compressed: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementMessage {
    /// Waypoints on the ground plane; the handler moves them to the player's height.
    pub path: Vec<Position>,
    pub run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseClick {
    pub delay_ms: u64,
    pub right: bool,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameMessage {
    Ping,
    FocusUpdate { focused: bool },
    Chat(ChatMessage),
    ArrowKey { roll: u16, yaw: u16 },
    Movement(MovementMessage),
    Command { text: String },
    CloseInterface,
    MouseClicked(MouseClick),
}

/// Discriminant of [`GameMessage`], used to index the handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Ping,
    FocusUpdate,
    Chat,
    ArrowKey,
    Movement,
    Command,
    CloseInterface,
    MouseClicked,
}

impl MessageKind {
    pub const COUNT: usize = 8;
}

impl GameMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Ping => MessageKind::Ping,
            Self::FocusUpdate { .. } => MessageKind::FocusUpdate,
            Self::Chat(_) => MessageKind::Chat,
            Self::ArrowKey { .. } => MessageKind::ArrowKey,
            Self::Movement(_) => MessageKind::Movement,
            Self::Command { .. } => MessageKind::Command,
            Self::CloseInterface => MessageKind::CloseInterface,
            Self::MouseClicked(_) => MessageKind::MouseClicked,
        }
    }
}

/// The game-phase registry, built once.
pub fn game_registry() -> &'static MessageRegistry<GameMessage> {
    static REGISTRY: OnceLock<MessageRegistry<GameMessage>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut builder = MessageRegistry::builder()
            .inbound(PING, decode::ping)
            .inbound(FOCUS_UPDATE, decode::focus_update)
            .inbound(CHAT, decode::chat)
            .inbound(ARROW_KEY, decode::arrow_key)
            .inbound(COMMAND_MOVEMENT, decode::movement)
            .inbound(GAME_MOVEMENT, decode::movement)
            .inbound(MINIMAP_MOVEMENT, decode::minimap_movement)
            .inbound(COMMAND, decode::command)
            .inbound(CLOSE_INTERFACE, decode::close_interface)
            .inbound(MOUSE_CLICKED, decode::mouse_clicked);
        for metadata in SPAM {
            builder = builder.inbound_ignored(metadata);
        }
        builder
            .outbound(REBUILD_REGION)
            .outbound(RESET_DESTINATION)
            .outbound(PLAYER_UPDATE)
            .outbound(INITIALIZE_PLAYER)
            .outbound(SERVER_CHAT)
            .build()
    })
}

pub fn game_metadata() -> Arc<FrameMetadataSet> {
    game_registry().metadata()
}
